//! Memory-mapped register access for AXI peripheral blocks.
//!
//! Every driver in this workspace talks to its hardware block through the
//! [`AxiIo`] trait: single, blocking, 32-bit-aligned register accesses that
//! are never batched or reordered. On hardware the implementation is
//! [`DirectMmio`]; host-side tests use the scriptable register file in
//! [`mock`] (feature `mock`).
//!
//! The crate also provides [`poll_until`], the one way drivers wait on a
//! hardware bit. The wait is a tight register-read loop with no backoff, but
//! it is bounded: when the retry budget runs out the caller gets a
//! [`PollExpired`] error instead of hanging on a stuck bit.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockIo;

/// Raw 32-bit register access on a memory-mapped peripheral block.
///
/// Each call is one blocking MMIO access. Register blocks are exclusively
/// owned by the calling driver for the duration of an operation; concurrent
/// callers must be serialized externally.
pub trait AxiIo {
    /// Reads the 32-bit register at `base + offset`.
    fn read(&mut self, base: u32, offset: u32) -> u32;

    /// Writes the 32-bit register at `base + offset`.
    fn write(&mut self, base: u32, offset: u32, value: u32);
}

impl<T: AxiIo + ?Sized> AxiIo for &mut T {
    fn read(&mut self, base: u32, offset: u32) -> u32 {
        (**self).read(base, offset)
    }

    fn write(&mut self, base: u32, offset: u32, value: u32) {
        (**self).write(base, offset, value);
    }
}

/// Volatile pointer access for bare-metal targets.
#[derive(Debug, Clone, Copy)]
pub struct DirectMmio;

impl DirectMmio {
    /// Creates a direct MMIO accessor.
    ///
    /// # Safety
    ///
    /// Every `base + offset` the drivers touch through this accessor must be
    /// a valid, mapped device register on the running target.
    pub const unsafe fn new() -> Self {
        Self
    }
}

impl AxiIo for DirectMmio {
    fn read(&mut self, base: u32, offset: u32) -> u32 {
        let addr = (base + offset) as usize as *const u32;
        unsafe { addr.read_volatile() }
    }

    fn write(&mut self, base: u32, offset: u32, value: u32) {
        let addr = (base + offset) as usize as *mut u32;
        unsafe { addr.write_volatile(value) }
    }
}

/// A bounded register poll ran out of retries before the condition held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollExpired {
    /// Offset of the register that was being polled.
    pub offset: u32,
    /// The last value read before giving up.
    pub last: u32,
}

/// Reads `base + offset` until `done` accepts the value, at most `retries`
/// times, and returns the accepted value.
///
/// A stuck hardware bit surfaces as [`PollExpired`] once the budget is
/// spent; the register state is left untouched.
pub fn poll_until<M, F>(
    io: &mut M,
    base: u32,
    offset: u32,
    retries: u32,
    mut done: F,
) -> Result<u32, PollExpired>
where
    M: AxiIo + ?Sized,
    F: FnMut(u32) -> bool,
{
    let mut last = 0;
    for _ in 0..retries {
        last = io.read(base, offset);
        if done(last) {
            return Ok(last);
        }
    }
    log::warn!("register poll expired: base={base:#010x} offset={offset:#x} last={last:#010x}");
    Err(PollExpired { offset, last })
}
