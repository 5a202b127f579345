// Licensed under the Apache-2.0 license

use caliptra_emu_bus::ReadOnlyRegister;
use caliptra_emu_derive::Bus;
use emulator_bus::{BusConverter, MmioRegion};
use emulator_types::{HwAddr, ID_REGS_LEN};

const CPUID_REGS_SIZE: HwAddr = 0x1000;

const CPUID_ID: [u8; ID_REGS_LEN] = [
    0x04, 0x00, 0x00, 0x00, 0x5a, 0xb8, 0x0b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
];

/// Per-CPU register block reporting the index of the CPU that reads it.
#[derive(Bus)]
pub struct ArmSseCpuId {
    #[register(offset = 0x0)]
    cpuid: ReadOnlyRegister<u32>,
}

impl ArmSseCpuId {
    pub fn new(cpuid: u32) -> Self {
        Self {
            cpuid: ReadOnlyRegister::new(cpuid),
        }
    }

    pub fn into_region(self, name: &str) -> MmioRegion {
        MmioRegion::from_device(
            name,
            CPUID_REGS_SIZE,
            BusConverter::registers(name, Box::new(self), CPUID_ID),
        )
    }
}
