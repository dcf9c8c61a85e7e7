//! Driver for the AXI SPI Engine, an FPGA soft-core that executes a small
//! instruction set to drive a SPI bus without per-byte CPU involvement.
//!
//! A [`Message`] describes one bus transaction as abstract [`Command`]s. The
//! driver compiles it into packed instruction words (a clock/config preamble,
//! the translated commands, a final sync marker) and dispatches the buffer in
//! one of two mutually exclusive modes:
//!
//! - **live**: the words go straight into the command FIFO and read data is
//!   drained synchronously from the SDI FIFO;
//! - **offload**: the words are stored in the engine's pattern memory and
//!   replayed autonomously N times, each iteration's data streamed by a
//!   paired [`axi_dmac`] channel, so large sample blocks land in memory
//!   without per-sample CPU intervention.
//!
//! ```no_run
//! use spi_engine::{Command, Config, Message, OffloadConfig, SpiEngine, SpiMode};
//!
//! let io = unsafe { axi_io::DirectMmio::new() };
//! let mut engine = SpiEngine::new(io, Config {
//!     base: 0x44a0_0000,
//!     chip_select: 0,
//!     mode: SpiMode::Mode3,
//!     three_wire: false,
//!     ref_clk_hz: 100_000_000,
//!     spi_clk_hz: 20_000_000,
//!     data_width: 16,
//!     offload: Some(OffloadConfig {
//!         rx_dma_base: 0x44a3_0000,
//!         tx_dma_base: 0x44a4_0000,
//!         rx_enabled: true,
//!         tx_enabled: false,
//!     }),
//! });
//!
//! // One conversion: assert CS, clock in four bytes, deassert.
//! let message = Message {
//!     commands: &[Command::Assert, Command::Read(4), Command::Deassert],
//!     rx_addr: 0x8000_0000,
//!     ..Default::default()
//! };
//! engine.offload_init(&message)?;
//! engine.offload_transfer(1024)?;
//! # Ok::<(), spi_engine::Error>(())
//! ```

#![cfg_attr(not(test), no_std)]

pub mod instr;
mod regs;
pub mod timing;

pub use instr::Command;

use axi_dmac::{AxiDmac, DmaDirection, DmaTransfer, TransferLength};
use axi_io::AxiIo;
use heapless::Vec;

use instr::Instruction;
use regs::*;

/// Capacity of a compiled instruction buffer: message commands plus the
/// two-word preamble and the sync marker.
pub const MAX_INSTRUCTIONS: usize = 32;

/// A compiled transaction, ready for the command FIFO or pattern memory.
pub type InstructionBuffer = Vec<u16, MAX_INSTRUCTIONS>;

/// Offload pattern slot used by this driver.
const OFFLOAD_INDEX: u32 = 0;

const CONFIG_CPHA: u8 = 1 << 0;
const CONFIG_CPOL: u8 = 1 << 1;
const CONFIG_THREE_WIRE: u8 = 1 << 2;

/// SPI clock phase/polarity, as programmed into the engine CONFIG register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

impl SpiMode {
    pub(crate) fn config_flags(self) -> u8 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => CONFIG_CPHA,
            SpiMode::Mode2 => CONFIG_CPOL,
            SpiMode::Mode3 => CONFIG_CPHA | CONFIG_CPOL,
        }
    }
}

/// DMA wiring for the offload path, one channel per direction.
#[derive(Debug, Clone, Copy)]
pub struct OffloadConfig {
    pub rx_dma_base: u32,
    pub tx_dma_base: u32,
    /// Whether the capture (device-to-memory) direction is serviceable.
    pub rx_enabled: bool,
    /// Whether the streaming (memory-to-device) direction is serviceable.
    pub tx_enabled: bool,
}

/// Initial engine parameters.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Engine register block base address.
    pub base: u32,
    /// Chip-select index on this engine.
    pub chip_select: u8,
    pub mode: SpiMode,
    pub three_wire: bool,
    /// Fabric reference clock feeding the engine.
    pub ref_clk_hz: u32,
    /// Requested SCLK rate; the divisor is derived from it.
    pub spi_clk_hz: u32,
    /// Transfer word width in bits (8, 16, 24 or 32).
    pub data_width: u32,
    /// Offload/DMA wiring, if the design has it.
    pub offload: Option<OffloadConfig>,
}

/// One bus transaction.
///
/// `tx_pattern` holds static SDO words clocked out on every iteration;
/// `rx_addr`/`tx_addr` are the DMA endpoints used by the offload path.
#[derive(Debug, Default, Clone, Copy)]
pub struct Message<'a> {
    pub commands: &'a [Command],
    pub tx_pattern: &'a [u16],
    pub rx_addr: u32,
    pub tx_addr: u32,
}

/// Errors reported by the engine driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The compiled transaction does not fit [`MAX_INSTRUCTIONS`] words.
    /// Nothing was written to the hardware.
    BufferFull,
    /// The caller's read buffer is smaller than the data the message clocks
    /// in. Nothing was written to the hardware.
    RxBufferTooShort,
    /// The design has no offload/DMA wiring.
    OffloadUnavailable,
    /// `offload_transfer` was called before `offload_init`.
    OffloadNotConfigured,
    /// A replay count of zero was requested.
    ZeroRepeats,
    /// The DMA path failed.
    Dma(axi_dmac::Error),
}

impl From<axi_dmac::Error> for Error {
    fn from(err: axi_dmac::Error) -> Self {
        Error::Dma(err)
    }
}

struct OffloadPath {
    rx_dma: AxiDmac,
    tx_dma: AxiDmac,
    rx_enabled: bool,
    tx_enabled: bool,
}

/// Driver handle for one SPI Engine instance.
pub struct SpiEngine<M: AxiIo> {
    io: M,
    base: u32,
    chip_select: u8,
    spi_config: u8,
    ref_clk_hz: u32,
    clk_div: u32,
    data_width: u32,
    rx_length: u32,
    tx_length: u32,
    offload: Option<OffloadPath>,
    offload_configured: bool,
    rx_addr: u32,
    tx_addr: u32,
}

impl<M: AxiIo> SpiEngine<M> {
    /// Creates a driver handle. No hardware is touched until the first
    /// transfer.
    pub fn new(io: M, config: Config) -> Self {
        let mut spi_config = config.mode.config_flags();
        if config.three_wire {
            spi_config |= CONFIG_THREE_WIRE;
        }
        let offload = config.offload.map(|o| OffloadPath {
            rx_dma: AxiDmac::new(o.rx_dma_base, DmaDirection::DeviceToMemory),
            tx_dma: AxiDmac::new(o.tx_dma_base, DmaDirection::MemoryToDevice),
            rx_enabled: o.rx_enabled,
            tx_enabled: o.tx_enabled,
        });
        Self {
            io,
            base: config.base,
            chip_select: config.chip_select,
            spi_config,
            ref_clk_hz: config.ref_clk_hz,
            clk_div: timing::clock_divisor(config.ref_clk_hz, config.spi_clk_hz),
            data_width: config.data_width,
            rx_length: 0,
            tx_length: 0,
            offload,
            offload_configured: false,
            rx_addr: 0,
            tx_addr: 0,
        }
    }

    /// Reconfigures the SCLK rate; the divisor is recomputed immediately.
    pub fn set_clock_rate(&mut self, spi_clk_hz: u32) {
        self.clk_div = timing::clock_divisor(self.ref_clk_hz, spi_clk_hz);
    }

    /// The divisor currently programmed into every compiled preamble.
    pub fn clock_divisor(&self) -> u32 {
        self.clk_div
    }

    /// Read word count recorded by the last compiled message.
    pub fn rx_words(&self) -> u32 {
        self.rx_length
    }

    /// Write word count recorded by the last compiled message.
    pub fn tx_words(&self) -> u32 {
        self.tx_length
    }

    /// Consumes the driver and returns the register accessor.
    pub fn release(self) -> M {
        self.io
    }

    fn word_len_bytes(&self) -> u32 {
        (self.data_width / 8).max(1)
    }

    /// Compiles `message` into an instruction buffer: clock-divisor and
    /// config preamble, one primitive per command, final sync marker.
    ///
    /// Transfer commands record the word counts they program into
    /// `rx_length`/`tx_length`; the offload path consumes them later. Under
    /// offload, a direction that was not enabled in the wiring compiles with
    /// zero recorded length instead of programming an unserviceable DMA
    /// transfer.
    fn compile_message(&mut self, message: &Message, offload: bool) -> Result<InstructionBuffer, Error> {
        fn push(buf: &mut InstructionBuffer, instruction: Instruction) -> Result<(), Error> {
            buf.push(instruction.encode()).map_err(|_| Error::BufferFull)
        }

        let (rx_ok, tx_ok) = match (&self.offload, offload) {
            (Some(path), true) => (path.rx_enabled, path.tx_enabled),
            _ => (true, true),
        };

        let mut buf = InstructionBuffer::new();
        push(&mut buf, Instruction::WriteReg {
            reg: instr::REG_CLK_DIV,
            value: self.clk_div as u8,
        })?;
        push(&mut buf, Instruction::WriteReg {
            reg: instr::REG_CONFIG,
            value: self.spi_config,
        })?;

        self.rx_length = 0;
        self.tx_length = 0;
        for &command in message.commands {
            match command {
                Command::Assert => push(&mut buf, Instruction::assert_cs(self.chip_select))?,
                Command::Deassert => push(&mut buf, Instruction::deassert_cs(self.chip_select))?,
                Command::Sleep { us } => {
                    let cycles = timing::sleep_cycles(self.ref_clk_hz, self.clk_div, us);
                    push(&mut buf, Instruction::Sleep { cycles: cycles as u8 })?;
                }
                Command::Read(bytes) | Command::Write(bytes) | Command::ReadWrite(bytes) => {
                    let words = timing::words_per_transfer(bytes, self.word_len_bytes());
                    let read = !matches!(command, Command::Write(_));
                    let write = !matches!(command, Command::Read(_));
                    if read {
                        self.rx_length = if rx_ok {
                            words
                        } else {
                            log::warn!("offload read requested but capture DMA is not enabled");
                            0
                        };
                    }
                    if write {
                        self.tx_length = if tx_ok {
                            words
                        } else {
                            log::warn!("offload write requested but streaming DMA is not enabled");
                            0
                        };
                    }
                    push(&mut buf, Instruction::Transfer {
                        write,
                        read,
                        words: words as u16,
                    })?;
                }
            }
        }

        push(&mut buf, Instruction::Sync)?;
        Ok(buf)
    }

    /// Runs `message` once in live mode.
    ///
    /// The instruction words are fed one-by-one into the command FIFO, then
    /// the SDI FIFO is drained exactly once per read word, splitting each
    /// 16-bit word into MSB and LSB bytes of `rx`. All fallible work happens
    /// before the first register write.
    pub fn transfer(&mut self, message: &Message, rx: &mut [u8]) -> Result<(), Error> {
        let buf = self.compile_message(message, false)?;
        let words = self.rx_length as usize;
        if rx.len() < words * 2 {
            return Err(Error::RxBufferTooShort);
        }

        for &word in message.tx_pattern {
            self.io.write(self.base, REG_SDO_DATA_FIFO, word as u32);
        }
        for &word in &buf {
            self.io.write(self.base, REG_CMD_FIFO, word as u32);
        }
        for chunk in rx[..words * 2].chunks_exact_mut(2) {
            let word = self.io.read(self.base, REG_SDI_DATA_FIFO);
            chunk[0] = (word >> 8) as u8;
            chunk[1] = word as u8;
        }
        Ok(())
    }

    /// Compiles `message` and stores it in the offload pattern memory for
    /// autonomous replay.
    pub fn offload_init(&mut self, message: &Message) -> Result<(), Error> {
        if self.offload.is_none() {
            return Err(Error::OffloadUnavailable);
        }
        let buf = self.compile_message(message, true)?;

        self.io.write(self.base, reg_offload_reset(OFFLOAD_INDEX), 1);
        self.io.write(self.base, reg_offload_reset(OFFLOAD_INDEX), 0);
        for &word in &buf {
            self.io.write(self.base, reg_offload_cmd_mem(OFFLOAD_INDEX), word as u32);
        }
        for &word in message.tx_pattern {
            self.io.write(self.base, reg_offload_sdo_mem(OFFLOAD_INDEX), word as u32);
        }

        self.rx_addr = message.rx_addr;
        self.tx_addr = message.tx_addr;
        self.offload_configured = true;
        Ok(())
    }

    /// Replays the stored pattern `repeats` times while the DMA channels
    /// stream each iteration's data, and blocks until the full block has
    /// landed.
    ///
    /// The single-pass word counts recorded at [`offload_init`] time are
    /// scaled by `repeats` to size the DMA transfers. On return, memory at
    /// the message's DMA addresses holds the captured block and the offload
    /// core is left free-running.
    ///
    /// [`offload_init`]: Self::offload_init
    pub fn offload_transfer(&mut self, repeats: u32) -> Result<(), Error> {
        if !self.offload_configured {
            return Err(Error::OffloadNotConfigured);
        }
        if repeats == 0 {
            return Err(Error::ZeroRepeats);
        }
        let Some(path) = self.offload.as_mut() else {
            return Err(Error::OffloadUnavailable);
        };

        let rx_total = TransferLength::new(self.rx_length.saturating_mul(repeats));
        let tx_total = TransferLength::new(self.tx_length.saturating_mul(repeats));

        if let Some(length) = rx_total {
            path.rx_dma.transfer_start(&mut self.io, &DmaTransfer {
                address: self.rx_addr,
                length,
            });
        }
        if let Some(length) = tx_total {
            path.tx_dma.transfer_start(&mut self.io, &DmaTransfer {
                address: self.tx_addr,
                length,
            });
        }

        // Kick the replay; the hardware re-executes the stored pattern while
        // the DMA channels stream each chunk.
        self.io.write(self.base, reg_offload_ctrl(OFFLOAD_INDEX), OFFLOAD_CTRL_ENABLE);

        if rx_total.is_some() {
            path.rx_dma.transfer_wait_completion(&mut self.io)?;
        }
        if tx_total.is_some() {
            path.tx_dma.transfer_wait_completion(&mut self.io)?;
        }

        // Hand control back to the free-running core.
        self.io.write(self.base, reg_offload_ctrl(OFFLOAD_INDEX), OFFLOAD_CTRL_ENABLE);
        Ok(())
    }

    /// Halts autonomous replay.
    pub fn offload_disable(&mut self) {
        self.io.write(self.base, reg_offload_ctrl(OFFLOAD_INDEX), 0);
    }
}
