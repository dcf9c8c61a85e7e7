//! Driver for the AXI DMAC scatter/gather transfer controller.
//!
//! One [`AxiDmac`] handle drives one direction of one DMAC register block:
//! device-to-memory channels program the destination side, memory-to-device
//! channels the source side. Every transfer walks the same four phases,
//! tracked in [`TransferState`]:
//!
//! 1. configure: reset the control bit, clear stale interrupts, program
//!    address, strides and lengths;
//! 2. queue: capture the hardware-assigned transfer id, then pulse
//!    `START_TRANSFER`;
//! 3. run: wait for the start bit to read back as 0;
//! 4. done: wait until start-of-transfer **and** end-of-transfer are
//!    pending together, acknowledge them, then wait for the captured id's
//!    bit in `TRANSFER_DONE`.
//!
//! No descriptor persists across transfers; the register state is re-derived
//! on every [`AxiDmac::transfer_start`]. Completion waits are bounded polls,
//! so a wedged core surfaces as [`Error::Expired`] instead of hanging the
//! caller.
//!
//! ```no_run
//! use axi_dmac::{AxiDmac, DmaDirection, DmaTransfer, TransferLength};
//!
//! # fn capture<M: axi_io::AxiIo>(io: &mut M, block: u32) -> Result<(), axi_dmac::Error> {
//! let mut rx = AxiDmac::new(0x7c42_0000, DmaDirection::DeviceToMemory);
//! let Some(length) = TransferLength::new(block) else { return Ok(()) };
//! rx.transfer_start(io, &DmaTransfer { address: 0x8000_0000, length });
//! rx.transfer_wait_completion(io)?;
//! # Ok(()) }
//! ```

#![cfg_attr(not(test), no_std)]

use axi_io::{poll_until, AxiIo, PollExpired};

pub mod regs;

use regs::*;

/// Retry budget for each completion poll.
const POLL_RETRIES: u32 = 1_000_000;

/// Which side of the fabric this channel moves data towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    /// Capture path: the core writes to memory, so the destination side is
    /// programmed.
    DeviceToMemory,
    /// Streaming path: the core reads from memory, so the source side is
    /// programmed.
    MemoryToDevice,
}

/// Phase of the current transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Configured,
    Queued,
    Running,
    Done,
}

/// A transfer element count.
///
/// The hardware length registers store `count - 1`; this wrapper is the one
/// place that conversion happens. A zero-element transfer cannot be
/// represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLength(u32);

impl TransferLength {
    /// Wraps a non-zero element count.
    pub fn new(count: u32) -> Option<Self> {
        if count == 0 {
            None
        } else {
            Some(Self(count))
        }
    }

    /// The element count.
    pub fn count(self) -> u32 {
        self.0
    }

    /// The `count - 1` encoding the length registers expect.
    fn register_value(self) -> u32 {
        self.0 - 1
    }
}

/// One scatter/gather transfer: a flat block at `address`.
#[derive(Debug, Clone, Copy)]
pub struct DmaTransfer {
    /// Destination address (device-to-memory) or source address
    /// (memory-to-device).
    pub address: u32,
    /// Number of elements to move.
    pub length: TransferLength,
}

/// Errors reported by the transfer controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bounded completion poll ran out of retries.
    Expired(PollExpired),
    /// `transfer_wait_completion` was called with no transfer queued.
    NotQueued(TransferState),
}

impl From<PollExpired> for Error {
    fn from(err: PollExpired) -> Self {
        Error::Expired(err)
    }
}

/// One direction of one AXI DMAC register block.
pub struct AxiDmac {
    base: u32,
    direction: DmaDirection,
    state: TransferState,
    transfer_id: u32,
}

impl AxiDmac {
    pub fn new(base: u32, direction: DmaDirection) -> Self {
        Self {
            base,
            direction,
            state: TransferState::Idle,
            transfer_id: 0,
        }
    }

    /// Phase of the transfer currently in flight.
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Configures and queues `transfer`, capturing the id the hardware will
    /// assign to it.
    ///
    /// The control bit is dropped and re-asserted first to force a known
    /// reset state, and any stale interrupt-pending bits are acknowledged
    /// before the descriptor is programmed.
    pub fn transfer_start<M: AxiIo>(&mut self, io: &mut M, transfer: &DmaTransfer) {
        io.write(self.base, REG_CTRL, 0);
        io.write(self.base, REG_CTRL, CTRL_ENABLE);
        io.write(self.base, REG_IRQ_MASK, 0);

        let pending = io.read(self.base, REG_IRQ_PENDING);
        io.write(self.base, REG_IRQ_PENDING, pending);

        match self.direction {
            DmaDirection::DeviceToMemory => {
                io.write(self.base, REG_DEST_ADDRESS, transfer.address);
                io.write(self.base, REG_DEST_STRIDE, 0);
            }
            DmaDirection::MemoryToDevice => {
                io.write(self.base, REG_SRC_ADDRESS, transfer.address);
                io.write(self.base, REG_SRC_STRIDE, 0);
            }
        }
        io.write(self.base, REG_FLAGS, 0);
        io.write(self.base, REG_X_LENGTH, transfer.length.register_value());
        io.write(self.base, REG_Y_LENGTH, 0);
        self.state = TransferState::Configured;

        self.transfer_id = io.read(self.base, REG_TRANSFER_ID);
        io.write(self.base, REG_START_TRANSFER, 1);
        self.state = TransferState::Queued;

        log::trace!(
            "dmac {:#010x}: queued transfer id {} ({} elements at {:#010x})",
            self.base,
            self.transfer_id,
            transfer.length.count(),
            transfer.address
        );
    }

    /// Blocks until the queued transfer has fully completed.
    ///
    /// Completion requires start-of-transfer and end-of-transfer pending
    /// simultaneously; a start-of-transfer alone means the core is still
    /// moving data.
    pub fn transfer_wait_completion<M: AxiIo>(&mut self, io: &mut M) -> Result<(), Error> {
        if self.state != TransferState::Queued {
            return Err(Error::NotQueued(self.state));
        }

        poll_until(io, self.base, REG_START_TRANSFER, POLL_RETRIES, |v| v == 0)?;
        self.state = TransferState::Running;

        let eot = IRQ_SOT | IRQ_EOT;
        let pending = poll_until(io, self.base, REG_IRQ_PENDING, POLL_RETRIES, |v| {
            v & eot == eot
        })?;
        io.write(self.base, REG_IRQ_PENDING, pending);

        let done_bit = 1u32 << (self.transfer_id & 0x1f);
        poll_until(io, self.base, REG_TRANSFER_DONE, POLL_RETRIES, |v| {
            v & done_bit != 0
        })?;
        self.state = TransferState::Done;

        log::trace!("dmac {:#010x}: transfer id {} done", self.base, self.transfer_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axi_io::MockIo;

    const BASE: u32 = 0x7c42_0000;

    fn transfer(address: u32, count: u32) -> DmaTransfer {
        DmaTransfer {
            address,
            length: TransferLength::new(count).unwrap(),
        }
    }

    #[test]
    fn configure_programs_descriptor_for_capture() {
        let mut io = MockIo::new();
        io.set(BASE + REG_IRQ_PENDING, IRQ_SOT);

        let mut dmac = AxiDmac::new(BASE, DmaDirection::DeviceToMemory);
        dmac.transfer_start(&mut io, &transfer(0x8000_0000, 6144));

        // Reset pulse on the control bit, then stale IRQs acknowledged.
        assert_eq!(io.writes_to(BASE + REG_CTRL).collect::<Vec<_>>(), [0, 1]);
        assert_eq!(io.last_write(BASE + REG_IRQ_PENDING), Some(IRQ_SOT));

        assert_eq!(io.last_write(BASE + REG_DEST_ADDRESS), Some(0x8000_0000));
        assert_eq!(io.last_write(BASE + REG_DEST_STRIDE), Some(0));
        assert_eq!(io.last_write(BASE + REG_SRC_ADDRESS), None);
        assert_eq!(io.last_write(BASE + REG_X_LENGTH), Some(6143));
        assert_eq!(io.last_write(BASE + REG_Y_LENGTH), Some(0));
        assert_eq!(io.last_write(BASE + REG_START_TRANSFER), Some(1));
        assert_eq!(dmac.state(), TransferState::Queued);
    }

    #[test]
    fn streaming_direction_programs_source_side() {
        let mut io = MockIo::new();
        let mut dmac = AxiDmac::new(BASE, DmaDirection::MemoryToDevice);
        dmac.transfer_start(&mut io, &transfer(0x9000_0000, 16));

        assert_eq!(io.last_write(BASE + REG_SRC_ADDRESS), Some(0x9000_0000));
        assert_eq!(io.last_write(BASE + REG_SRC_STRIDE), Some(0));
        assert_eq!(io.last_write(BASE + REG_DEST_ADDRESS), None);
        assert_eq!(io.last_write(BASE + REG_X_LENGTH), Some(15));
    }

    #[test]
    fn completion_requires_sot_and_eot_together() {
        let mut io = MockIo::new();
        io.set(BASE + REG_TRANSFER_ID, 2);
        // Start bit stays set for a couple of reads, then clears.
        io.push_read(BASE + REG_START_TRANSFER, 1);
        io.push_read(BASE + REG_START_TRANSFER, 1);
        io.push_read(BASE + REG_START_TRANSFER, 0);
        // SOT alone first; only SOT|EOT together may complete the wait.
        io.push_read(BASE + REG_IRQ_PENDING, IRQ_SOT);
        io.push_read(BASE + REG_IRQ_PENDING, IRQ_SOT);
        io.push_read(BASE + REG_IRQ_PENDING, IRQ_SOT | IRQ_EOT);
        io.push_read(BASE + REG_TRANSFER_DONE, 0);
        io.push_read(BASE + REG_TRANSFER_DONE, 1 << 2);

        let mut dmac = AxiDmac::new(BASE, DmaDirection::DeviceToMemory);
        dmac.transfer_start(&mut io, &transfer(0x8000_0000, 1024));
        dmac.transfer_wait_completion(&mut io).unwrap();

        assert_eq!(dmac.state(), TransferState::Done);
        // Both bits written back to acknowledge.
        assert_eq!(io.last_write(BASE + REG_IRQ_PENDING), Some(IRQ_SOT | IRQ_EOT));
    }

    #[test]
    fn sot_alone_never_completes() {
        let mut io = MockIo::new();
        // Start bit clears at once, but only SOT ever becomes pending.
        io.push_read(BASE + REG_START_TRANSFER, 0);
        io.set(BASE + REG_IRQ_PENDING, IRQ_SOT);

        let mut dmac = AxiDmac::new(BASE, DmaDirection::DeviceToMemory);
        dmac.transfer_start(&mut io, &transfer(0x8000_0000, 4));

        match dmac.transfer_wait_completion(&mut io) {
            Err(Error::Expired(err)) => {
                assert_eq!(err.offset, REG_IRQ_PENDING);
                assert_eq!(err.last, IRQ_SOT);
            }
            other => panic!("expected expired poll, got {other:?}"),
        }
    }

    #[test]
    fn wait_without_queued_transfer_is_rejected() {
        let mut io = MockIo::new();
        let mut dmac = AxiDmac::new(BASE, DmaDirection::DeviceToMemory);

        assert_eq!(
            dmac.transfer_wait_completion(&mut io),
            Err(Error::NotQueued(TransferState::Idle))
        );
        assert!(io.journal().is_empty());
    }

    #[test]
    fn length_register_stores_count_minus_one() {
        assert!(TransferLength::new(0).is_none());
        assert_eq!(TransferLength::new(1).unwrap().register_value(), 0);
        assert_eq!(TransferLength::new(6144).unwrap().register_value(), 6143);
    }
}
