//! Guest-side smoke sequence, the bare-metal firmware's job done through
//! the bus: enable the device, push a message through TXDATA one byte at
//! a time, then dump the registers.

use colored::Colorize;
use mmio_sockdev::{MmioError, MmioManager};

pub const TXDATA: u64 = 0x00; // Write-only, low 8 bits are the character
pub const STATUS: u64 = 0x04; // Read-only
pub const CTRL: u64 = 0x08; // Read/write

pub const STATUS_TXREADY: u64 = 1 << 0;
pub const CTRL_ENABLE: u64 = 1 << 0;

const MESSAGE: &str = "Hello from MMIO sockdev\n";

pub fn run_demo(mmio: &mut MmioManager, base: u64) -> Result<(), MmioError> {
    mmio.handle_write(base + CTRL, 4, CTRL_ENABLE)?;
    log::info!("device enabled, sending {} bytes", MESSAGE.len());

    for byte in MESSAGE.bytes() {
        // The reference peer always reports TXREADY, so a single blocking
        // STATUS read stands in for the firmware's busy-wait loop.
        let status = mmio.handle_read(base + STATUS, 4)?;
        if status & STATUS_TXREADY == 0 {
            log::warn!("peer reports TX busy (STATUS={status:#x}), sending anyway");
        }
        mmio.handle_write(base + TXDATA, 1, byte as u64)?;
    }

    dump_registers(mmio, base)
}

fn dump_registers(mmio: &mut MmioManager, base: u64) -> Result<(), MmioError> {
    println!(
        "{}",
        "================ mmio-sockdev ================"
            .bright_cyan()
            .bold()
    );

    let status = mmio.handle_read(base + STATUS, 4)?;
    let ctrl = mmio.handle_read(base + CTRL, 4)?;

    let txready = if status & STATUS_TXREADY != 0 {
        "TXREADY".bright_green()
    } else {
        "TX BUSY".bright_red()
    };
    let enable = if ctrl & CTRL_ENABLE != 0 {
        "ENABLED".bright_green()
    } else {
        "DISABLED".bright_yellow()
    };

    println!("STATUS: {status:#010x} [{txready}]");
    println!("CTRL:   {ctrl:#010x} [{enable}]");
    Ok(())
}
