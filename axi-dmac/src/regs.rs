//! AXI DMAC register map, 32-bit aligned.

pub const REG_IRQ_MASK: u32 = 0x80;
pub const REG_IRQ_PENDING: u32 = 0x84;

pub const REG_CTRL: u32 = 0x400;
pub const REG_TRANSFER_ID: u32 = 0x404;
pub const REG_START_TRANSFER: u32 = 0x408;
pub const REG_FLAGS: u32 = 0x40c;
pub const REG_DEST_ADDRESS: u32 = 0x410;
pub const REG_SRC_ADDRESS: u32 = 0x414;
pub const REG_X_LENGTH: u32 = 0x418;
pub const REG_Y_LENGTH: u32 = 0x41c;
pub const REG_DEST_STRIDE: u32 = 0x420;
pub const REG_SRC_STRIDE: u32 = 0x424;
pub const REG_TRANSFER_DONE: u32 = 0x428;

pub const CTRL_ENABLE: u32 = 1 << 0;

/// Start-of-transfer interrupt-pending bit.
pub const IRQ_SOT: u32 = 1 << 0;
/// End-of-transfer interrupt-pending bit.
pub const IRQ_EOT: u32 = 1 << 1;
