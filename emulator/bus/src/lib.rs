/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the SSE emulator bus library.

--*/

mod bus;
mod clock;
mod irq;
mod memory;
mod subword;

pub use bus::{Bus, BusConverter, BusError};
pub use clock::ClockSource;
pub use irq::{Irq, IrqIn, IrqLines};
pub use memory::{AddressMap, FlatRange, MapError, MmioRegion, RegionId};
pub use subword::{extract_subword, merge_subword};
