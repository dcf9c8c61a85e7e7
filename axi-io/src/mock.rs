//! Scriptable register file for host-side driver tests.
//!
//! [`MockIo`] keeps a sparse register map keyed by absolute address
//! (`base + offset`), a journal of every write in program order, and
//! per-address queues of scripted read values so tests can model bits that
//! change over time (a busy flag clearing, an interrupt firing).

use heapless::{Deque, FnvIndexMap, Vec};

use crate::AxiIo;

const REG_CAP: usize = 64;
const SCRIPT_CAP: usize = 16;
const SCRIPT_DEPTH: usize = 16;
const JOURNAL_CAP: usize = 256;

/// In-memory register file with a write journal and scripted reads.
#[derive(Default)]
pub struct MockIo {
    regs: FnvIndexMap<u32, u32, REG_CAP>,
    scripted: FnvIndexMap<u32, Deque<u32, SCRIPT_DEPTH>, SCRIPT_CAP>,
    writes: Vec<(u32, u32), JOURNAL_CAP>,
}

impl MockIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stored value of the register at `addr`. Reads return it once
    /// any scripted values for the address are exhausted.
    pub fn set(&mut self, addr: u32, value: u32) {
        self.regs
            .insert(addr, value)
            .map_err(|_| ())
            .expect("mock register file full");
    }

    /// Queues a one-shot read value for the register at `addr`.
    pub fn push_read(&mut self, addr: u32, value: u32) {
        if !self.scripted.contains_key(&addr) {
            self.scripted
                .insert(addr, Deque::new())
                .map_err(|_| ())
                .expect("mock script table full");
        }
        self.scripted
            .get_mut(&addr)
            .and_then(|q| q.push_back(value).ok())
            .expect("mock script queue full");
    }

    /// Current stored value of the register at `addr` (0 if never written).
    pub fn get(&self, addr: u32) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Every write performed so far, as `(address, value)` in program order.
    pub fn journal(&self) -> &[(u32, u32)] {
        &self.writes
    }

    /// The values written to `addr`, in program order.
    pub fn writes_to(&self, addr: u32) -> impl Iterator<Item = u32> + '_ {
        self.writes
            .iter()
            .filter(move |(a, _)| *a == addr)
            .map(|(_, v)| *v)
    }

    /// The most recent value written to `addr`, if any.
    pub fn last_write(&self, addr: u32) -> Option<u32> {
        self.writes_to(addr).last()
    }
}

impl AxiIo for MockIo {
    fn read(&mut self, base: u32, offset: u32) -> u32 {
        let addr = base + offset;
        if let Some(queue) = self.scripted.get_mut(&addr) {
            if let Some(value) = queue.pop_front() {
                return value;
            }
        }
        self.get(addr)
    }

    fn write(&mut self, base: u32, offset: u32, value: u32) {
        let addr = base + offset;
        self.writes
            .push((addr, value))
            .expect("mock write journal full");
        self.regs
            .insert(addr, value)
            .map_err(|_| ())
            .expect("mock register file full");
    }
}
