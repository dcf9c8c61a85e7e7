//! AXI SPI Engine register map, 32-bit aligned.
//!
//! The internal `CLK_DIV`/`CONFIG` registers are not in this block; they are
//! reached only through `WriteReg` instructions (see [`crate::instr`]).

pub(crate) const REG_CMD_FIFO: u32 = 0xe8;
pub(crate) const REG_SDO_DATA_FIFO: u32 = 0xec;
pub(crate) const REG_SDI_DATA_FIFO: u32 = 0xf0;

pub(crate) const fn reg_offload_ctrl(n: u32) -> u32 {
    0x100 + 0x20 * n
}

pub(crate) const fn reg_offload_reset(n: u32) -> u32 {
    0x108 + 0x20 * n
}

pub(crate) const fn reg_offload_cmd_mem(n: u32) -> u32 {
    0x110 + 0x20 * n
}

pub(crate) const fn reg_offload_sdo_mem(n: u32) -> u32 {
    0x114 + 0x20 * n
}

pub(crate) const OFFLOAD_CTRL_ENABLE: u32 = 1 << 0;
