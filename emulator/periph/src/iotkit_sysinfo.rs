/*++

Licensed under the Apache-2.0 license.

File Name:

    iotkit_sysinfo.rs

Abstract:

    File contains the IoTKit system information block.

--*/

use caliptra_emu_bus::ReadOnlyRegister;
use caliptra_emu_derive::Bus;
use emulator_bus::{BusConverter, MmioRegion};
use emulator_types::{HwAddr, ID_REGS_LEN};

const SYSINFO_REGS_SIZE: HwAddr = 0x1000;

const SYSINFO_ID: [u8; ID_REGS_LEN] = [
    0x04, 0x00, 0x00, 0x00, 0x58, 0xb8, 0x0b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
];

/// Read-only SYS_VERSION and SYS_CONFIG registers. The values are supplied
/// by the subsystem that instantiates the block.
#[derive(Bus)]
pub struct IoTKitSysInfo {
    #[register(offset = 0x0)]
    sys_version: ReadOnlyRegister<u32>,

    #[register(offset = 0x4)]
    sys_config: ReadOnlyRegister<u32>,
}

impl IoTKitSysInfo {
    pub fn new(sys_version: u32, sys_config: u32) -> Self {
        Self {
            sys_version: ReadOnlyRegister::new(sys_version),
            sys_config: ReadOnlyRegister::new(sys_config),
        }
    }

    pub fn into_region(self, name: &str) -> MmioRegion {
        MmioRegion::from_device(
            name,
            SYSINFO_REGS_SIZE,
            BusConverter::registers(name, Box::new(self), SYSINFO_ID),
        )
    }
}
