// Licensed under the Apache-2.0 license

use emulator_bus::MapError;
use emulator_periph::PeriphError;
use thiserror::Error;

/// Fatal configuration errors of the subsystem build.
#[derive(Debug, Error)]
pub enum SseError {
    #[error("{0} clock is not connected")]
    ClockNotConnected(&'static str),
    #[error("sram_addr_width {width} out of range, must be 1..={max}")]
    InvalidSramAddrWidth { width: u32, max: u32 },
    #[error("{count} expansion IRQs requested, at most {max} supported")]
    InvalidExpIrqCount { count: u32, max: u32 },
    #[error("device {device}: no internal PPC {ppc}")]
    NoSuchPpc { device: &'static str, ppc: usize },
    #[error("device {device}: IRQ {irq} is not a common interrupt line")]
    InvalidIrq { device: &'static str, irq: u32 },
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Periph(#[from] PeriphError),
}
