/*++

Licensed under the Apache-2.0 license.

File Name:

    devices.rs

Abstract:

    File contains the device tables of the SSE variants: which peripheral
    sits where, behind which PPC port, and where its interrupt goes.

--*/

use emulator_consts::*;

/// Device models the subsystem knows how to build.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceKind {
    CmsdkApbTimer,
    CmsdkApbWatchdog,
    SysInfo,
    /// Register block that is mapped but not modelled.
    Unimplemented,
}

/// How a device is attached to the address space.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PortBinding {
    /// Mapped straight into the shared container.
    Direct,
    /// Behind port `port` of internal APB PPC `ppc`.
    Port { ppc: usize, port: usize },
}

/// Inputs of the NMI OR gate.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NmiInput {
    S32kWatchdog,
    SecureWatchdog,
}

impl NmiInput {
    pub const COUNT: usize = 2;

    pub fn line(self) -> usize {
        match self {
            NmiInput::S32kWatchdog => 0,
            NmiInput::SecureWatchdog => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IrqTarget {
    None,
    /// One of the 32 internal interrupt lines of every CPU.
    Common(u32),
    Nmi(NmiInput),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceInfo {
    pub name: &'static str,
    pub kind: DeviceKind,
    pub addr: u32,
    pub size: u32,
    pub ppc: PortBinding,
    pub irq: IrqTarget,
    /// Clocked from S32KCLK instead of MAINCLK.
    pub slow_clock: bool,
}

impl DeviceInfo {
    const fn new(name: &'static str, kind: DeviceKind, addr: u32) -> Self {
        Self {
            name,
            kind,
            addr,
            size: PERIPH_BLOCK_SIZE,
            ppc: PortBinding::Direct,
            irq: IrqTarget::None,
            slow_clock: false,
        }
    }

    const fn behind(mut self, ppc: usize, port: usize) -> Self {
        self.ppc = PortBinding::Port { ppc, port };
        self
    }

    const fn irq(mut self, irq: IrqTarget) -> Self {
        self.irq = irq;
        self
    }

    const fn slow(mut self) -> Self {
        self.slow_clock = true;
        self
    }
}

use DeviceKind::*;

pub(crate) const IOTKIT_DEVICES: &[DeviceInfo] = &[
    DeviceInfo::new("timer0", CmsdkApbTimer, TIMER0_BASE)
        .behind(0, 0)
        .irq(IrqTarget::Common(3)),
    DeviceInfo::new("timer1", CmsdkApbTimer, TIMER1_BASE)
        .behind(0, 1)
        .irq(IrqTarget::Common(4)),
    DeviceInfo::new("s32ktimer", CmsdkApbTimer, S32KTIMER_BASE)
        .behind(1, 0)
        .irq(IrqTarget::Common(2))
        .slow(),
    DeviceInfo::new("dualtimer", Unimplemented, DUALTIMER_BASE).behind(0, 2),
    DeviceInfo::new("s32kwatchdog", CmsdkApbWatchdog, S32KWATCHDOG_BASE)
        .irq(IrqTarget::Nmi(NmiInput::S32kWatchdog))
        .slow(),
    DeviceInfo::new("nswatchdog", CmsdkApbWatchdog, NSWATCHDOG_BASE).irq(IrqTarget::Common(1)),
    DeviceInfo::new("swatchdog", CmsdkApbWatchdog, SWATCHDOG_BASE)
        .irq(IrqTarget::Nmi(NmiInput::SecureWatchdog)),
    DeviceInfo::new("armsse-sysinfo", SysInfo, SYSINFO_BASE),
    DeviceInfo::new("armsse-sysctl", Unimplemented, SYSCTL_BASE),
];

pub(crate) const SSE200_DEVICES: &[DeviceInfo] = &[
    DeviceInfo::new("timer0", CmsdkApbTimer, TIMER0_BASE)
        .behind(0, 0)
        .irq(IrqTarget::Common(3)),
    DeviceInfo::new("timer1", CmsdkApbTimer, TIMER1_BASE)
        .behind(0, 1)
        .irq(IrqTarget::Common(4)),
    DeviceInfo::new("s32ktimer", CmsdkApbTimer, S32KTIMER_BASE)
        .behind(1, 0)
        .irq(IrqTarget::Common(2))
        .slow(),
    DeviceInfo::new("dualtimer", Unimplemented, DUALTIMER_BASE).behind(0, 2),
    DeviceInfo::new("mhu0", Unimplemented, MHU0_BASE).behind(0, 3),
    DeviceInfo::new("mhu1", Unimplemented, MHU1_BASE).behind(0, 4),
    DeviceInfo::new("s32kwatchdog", CmsdkApbWatchdog, S32KWATCHDOG_BASE)
        .irq(IrqTarget::Nmi(NmiInput::S32kWatchdog))
        .slow(),
    DeviceInfo::new("nswatchdog", CmsdkApbWatchdog, NSWATCHDOG_BASE).irq(IrqTarget::Common(1)),
    DeviceInfo::new("swatchdog", CmsdkApbWatchdog, SWATCHDOG_BASE)
        .irq(IrqTarget::Nmi(NmiInput::SecureWatchdog)),
    DeviceInfo::new("armsse-sysinfo", SysInfo, SYSINFO_BASE),
    DeviceInfo::new("armsse-sysctl", Unimplemented, SYSCTL_BASE),
    DeviceInfo::new("SYS_PPU", Unimplemented, PPU_BASES[0]),
    DeviceInfo::new("CPU0CORE_PPU", Unimplemented, PPU_BASES[1]),
    DeviceInfo::new("CPU1CORE_PPU", Unimplemented, PPU_BASES[2]),
    DeviceInfo::new("DBG_PPU", Unimplemented, PPU_BASES[3]),
    DeviceInfo::new("RAM0_PPU", Unimplemented, PPU_BASES[4]),
    DeviceInfo::new("RAM1_PPU", Unimplemented, PPU_BASES[5]),
    DeviceInfo::new("RAM2_PPU", Unimplemented, PPU_BASES[6]),
    DeviceInfo::new("RAM3_PPU", Unimplemented, PPU_BASES[7]),
];
