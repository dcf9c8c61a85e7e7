//! Instruction encoder: abstract bus operations packed into 16-bit engine
//! opcode words.
//!
//! Bits `[15:12]` carry the opcode class, bits `[11:8]` the first operand,
//! bits `[7:0]` the second. Operands are masked to their field width, so
//! out-of-range input silently truncates; callers own range checking where
//! it matters.

/// Opcode classes, bits [15:12].
const INST_TRANSFER: u16 = 0x0;
const INST_ASSERT: u16 = 0x1;
const INST_WRITE: u16 = 0x2;
const INST_MISC: u16 = 0x3;

/// Misc instruction ids.
const MISC_SYNC: u16 = 0x0;
const MISC_SLEEP: u16 = 0x1;

/// Transfer enable flags, bits [9:8].
const TRANSFER_WRITE: u16 = 1 << 0;
const TRANSFER_READ: u16 = 1 << 1;

/// Internal engine registers addressed only through `WriteReg`.
pub(crate) const REG_CLK_DIV: u8 = 0x0;
pub(crate) const REG_CONFIG: u8 = 0x1;

/// One abstract command of a transaction [`Message`](crate::Message).
///
/// Byte counts are converted to transfer word counts against the device's
/// data width when the message is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Assert the device's chip select.
    Assert,
    /// Deassert the device's chip select.
    Deassert,
    /// Keep the bus idle for at least `us` microseconds.
    Sleep { us: u32 },
    /// Clock in `bytes` of read data.
    Read(u32),
    /// Clock out `bytes` of write data.
    Write(u32),
    /// Full-duplex transfer of `bytes`.
    ReadWrite(u32),
}

/// One engine primitive, with an exhaustive mapping to wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Instruction {
    /// Drive the chip-select lines to `mask`.
    ChipSelect { mask: u8 },
    /// Write an internal engine register (preamble only).
    WriteReg { reg: u8, value: u8 },
    /// Idle for `cycles` sleep counts.
    Sleep { cycles: u8 },
    /// Shift `words` words; at least one of `write`/`read` is set.
    Transfer { write: bool, read: bool, words: u16 },
    /// Stream-complete handshake, always the final word.
    Sync,
}

const fn pack(class: u16, arg1: u16, arg2: u16) -> u16 {
    (class & 0xf) << 12 | (arg1 & 0xf) << 8 | (arg2 & 0xff)
}

impl Instruction {
    /// Chip-select mask asserting only `cs`.
    pub(crate) fn assert_cs(cs: u8) -> Self {
        Instruction::ChipSelect {
            mask: 1 << (cs & 0x7),
        }
    }

    /// Chip-select mask with `cs` cleared from all-ones.
    pub(crate) fn deassert_cs(cs: u8) -> Self {
        Instruction::ChipSelect {
            mask: 0xff & !(1 << (cs & 0x7)),
        }
    }

    /// Packs the instruction into its 16-bit wire form.
    pub(crate) fn encode(self) -> u16 {
        match self {
            Instruction::ChipSelect { mask } => pack(INST_ASSERT, 0, mask as u16),
            Instruction::WriteReg { reg, value } => pack(INST_WRITE, reg as u16, value as u16),
            Instruction::Sleep { cycles } => pack(INST_MISC, MISC_SLEEP, cycles as u16),
            Instruction::Transfer { write, read, words } => {
                let mut flags = 0;
                if write {
                    flags |= TRANSFER_WRITE;
                }
                if read {
                    flags |= TRANSFER_READ;
                }
                // The hardware length field stores count - 1.
                pack(INST_TRANSFER, flags, words.saturating_sub(1))
            }
            Instruction::Sync => pack(INST_MISC, MISC_SYNC, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chip_select_masks() {
        assert_eq!(Instruction::assert_cs(0).encode(), 0x1001);
        assert_eq!(Instruction::assert_cs(2).encode(), 0x1004);
        assert_eq!(Instruction::deassert_cs(0).encode(), 0x10fe);
        assert_eq!(Instruction::deassert_cs(2).encode(), 0x10fb);
    }

    #[test]
    fn register_write_packs_id_and_value() {
        let word = Instruction::WriteReg {
            reg: REG_CONFIG,
            value: 0x2f,
        }
        .encode();
        assert_eq!(word, 0x212f);
    }

    #[test]
    fn sleep_and_sync_share_the_misc_class() {
        assert_eq!(Instruction::Sleep { cycles: 0x10 }.encode(), 0x3110);
        assert_eq!(Instruction::Sync.encode(), 0x3000);
    }

    #[test]
    fn transfer_packs_enables_and_count_minus_one() {
        let read = Instruction::Transfer {
            write: false,
            read: true,
            words: 1,
        };
        assert_eq!(read.encode(), 0x0200);

        let full_duplex = Instruction::Transfer {
            write: true,
            read: true,
            words: 4,
        };
        assert_eq!(full_duplex.encode(), 0x0303);
    }

    #[test]
    fn out_of_range_operands_truncate() {
        let word = Instruction::WriteReg {
            reg: 0x1f,
            value: 0xff,
        }
        .encode();
        assert_eq!(word, 0x2fff);

        let long = Instruction::Transfer {
            write: true,
            read: false,
            words: 300,
        };
        assert_eq!(long.encode(), 0x0100 | (299 & 0xff));
    }
}
