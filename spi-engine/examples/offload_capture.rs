//! Compiles a capture transaction and replays it through the offload path,
//! against the mock register file so it can run on a host.
//!
//! On hardware the only change is the register accessor: swap [`MockIo`]
//! for `axi_io::DirectMmio` and point the bases at the real blocks.

use axi_dmac::regs as dma_regs;
use axi_io::{AxiIo, MockIo};
use spi_engine::{timing, Command, Config, Message, OffloadConfig, SpiEngine, SpiMode};

const ENGINE_BASE: u32 = 0x44a0_0000;
const RX_DMA_BASE: u32 = 0x44a3_0000;
const TX_DMA_BASE: u32 = 0x44a4_0000;
const CAPTURE_ADDR: u32 = 0x8000_0000;

const SAMPLES: u32 = 1024;
const CHANNELS: u32 = 2;
const RESOLUTION_BITS: u32 = 24;

fn main() {
    // Model a DMA channel that completes as soon as it is started.
    let mut io = MockIo::new();
    io.push_read(RX_DMA_BASE + dma_regs::REG_START_TRANSFER, 0);
    io.set(
        RX_DMA_BASE + dma_regs::REG_IRQ_PENDING,
        dma_regs::IRQ_SOT | dma_regs::IRQ_EOT,
    );
    io.set(RX_DMA_BASE + dma_regs::REG_TRANSFER_DONE, 1);

    let mut engine = SpiEngine::new(
        io,
        Config {
            base: ENGINE_BASE,
            chip_select: 0,
            mode: SpiMode::Mode3,
            three_wire: false,
            ref_clk_hz: 100_000_000,
            spi_clk_hz: 20_000_000,
            data_width: 16,
            offload: Some(OffloadConfig {
                rx_dma_base: RX_DMA_BASE,
                tx_dma_base: TX_DMA_BASE,
                rx_enabled: true,
                tx_enabled: false,
            }),
        },
    );

    // One conversion worth of bus activity, replayed once per sample.
    let words_per_sample =
        timing::sample_block_words(1, CHANNELS, RESOLUTION_BITS);
    let message = Message {
        commands: &[
            Command::Assert,
            Command::Read(words_per_sample * 2),
            Command::Deassert,
        ],
        rx_addr: CAPTURE_ADDR,
        ..Default::default()
    };

    engine.offload_init(&message).expect("offload init failed");
    engine
        .offload_transfer(SAMPLES)
        .expect("offload transfer failed");

    let mut io = engine.release();
    println!(
        "captured {SAMPLES} samples x {CHANNELS} channels @ {RESOLUTION_BITS}-bit"
    );
    println!(
        "X_LENGTH programmed: {} (block of {} words at {CAPTURE_ADDR:#010x})",
        io.read(RX_DMA_BASE, dma_regs::REG_X_LENGTH),
        timing::sample_block_words(SAMPLES, CHANNELS, RESOLUTION_BITS),
    );
}
