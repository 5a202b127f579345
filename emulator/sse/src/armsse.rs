/*++

Licensed under the Apache-2.0 license.

File Name:

    armsse.rs

Abstract:

    File contains the composition of an Arm SSE subsystem: address spaces,
    SRAM behind MPCs, peripherals behind PPCs, the security controller and
    the interrupt fabric that ties them to the CPUs.

--*/

use crate::devices::{DeviceInfo, DeviceKind, IrqTarget, NmiInput, PortBinding};
use crate::{SseError, SseVariant};
use caliptra_emu_bus::Ram;
use emulator_bus::{
    AddressMap, BusConverter, BusError, ClockSource, FlatRange, Irq, IrqIn, IrqLines, MmioRegion,
    RegionId,
};
use emulator_consts::*;
use emulator_periph::{
    ArmSseCpuId, CmsdkApbTimer, CmsdkApbWatchdog, IoTKitSecCtl, IoTKitSysInfo, MpcConfig, OrIrq,
    Ppc, PpcId, SecCtlPpcPins, SplitIrq, TzMpc, TzPpc, UnimplementedDevice,
    SECCTL_NUM_AHB_EXP_PPC, SECCTL_NUM_APB_EXP_PPC, SECCTL_NUM_APB_PPC, SECCTL_NUM_EXP_MPC,
};
use emulator_types::{HwAddr, RvData, RvSize, TxAttrs};

const NUM_PPC_IRQS: usize = SECCTL_NUM_APB_PPC + SECCTL_NUM_APB_EXP_PPC + SECCTL_NUM_AHB_EXP_PPC;

const EXP_PPCS: [PpcId; SECCTL_NUM_APB_EXP_PPC + SECCTL_NUM_AHB_EXP_PPC] = [
    PpcId::ApbExp(0),
    PpcId::ApbExp(1),
    PpcId::ApbExp(2),
    PpcId::ApbExp(3),
    PpcId::AhbExp(0),
    PpcId::AhbExp(1),
    PpcId::AhbExp(2),
    PpcId::AhbExp(3),
];

/// Line of the PPC interrupt OR gate fed by `id`.
fn ppc_orgate_line(id: PpcId) -> usize {
    match id {
        PpcId::Apb(n) => n,
        PpcId::ApbExp(n) => SECCTL_NUM_APB_PPC + n,
        PpcId::AhbExp(n) => SECCTL_NUM_APB_PPC + SECCTL_NUM_APB_EXP_PPC + n,
    }
}

/// SSE Arguments
pub struct ArmSseArgs {
    pub variant: SseVariant,
    pub main_clock: Option<ClockSource>,
    pub s32k_clock: Option<ClockSource>,
    /// Each SRAM bank is `1 << sram_addr_width` bytes.
    pub sram_addr_width: u32,
    pub num_exp_irq: u32,
    pub mpc_notify_on_reset: bool,
}

impl Default for ArmSseArgs {
    fn default() -> Self {
        Self {
            variant: SseVariant::IotKit,
            main_clock: None,
            s32k_clock: None,
            sram_addr_width: SRAM_ADDR_WIDTH_DEFAULT,
            num_exp_irq: NUM_EXP_IRQ_DEFAULT,
            mpc_notify_on_reset: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub enum BuildStage {
    Unconfigured,
    DevicesInstantiated,
    AddressSpaceWired,
    Realized,
}

impl BuildStage {
    fn next(self) -> Option<Self> {
        match self {
            BuildStage::Unconfigured => Some(BuildStage::DevicesInstantiated),
            BuildStage::DevicesInstantiated => Some(BuildStage::AddressSpaceWired),
            BuildStage::AddressSpaceWired => Some(BuildStage::Realized),
            BuildStage::Realized => None,
        }
    }
}

/// Two-way split of a status line, used wherever an interrupt goes both to
/// the security controller and to an OR gate.
fn status_split(first: IrqIn, second: IrqIn) -> Result<IrqIn, SseError> {
    let split = SplitIrq::new(2)?;
    split.output(0).connect(first);
    split.output(1).connect(second);
    Ok(split.input())
}

/// State accumulated while the subsystem is being built.
struct Build {
    stage: BuildStage,
    variant: SseVariant,
    main_clock: ClockSource,
    s32k_clock: ClockSource,
    sram_addr_width: u32,
    notify_on_reset: bool,
    map: AddressMap,
    container: RegionId,
    cpu_irqs: Vec<IrqLines>,
    nmi_lines: IrqLines,
    irq_inputs: Vec<IrqIn>,
    secctl: IoTKitSecCtl,
    mpc_orgate: OrIrq,
    ppc_orgate: OrIrq,
    nmi_orgate: OrIrq,
    reset_orgate: OrIrq,
    num_watchdogs: usize,
    mpcs: Vec<TzMpc>,
    ppc_builders: Vec<TzPpc>,
    /// Devices mapped straight into the shared container.
    direct: Vec<(u32, MmioRegion)>,
    /// Devices behind a PPC: address, PPC, port.
    gated: Vec<(u32, usize, usize)>,
    cpu_private: Vec<Vec<(u32, MmioRegion)>>,
    cpu_views: Vec<RegionId>,
    devices: Vec<MmioRegion>,
}

impl Build {
    fn new(args: &ArmSseArgs, main_clock: ClockSource, s32k_clock: ClockSource) -> Result<Self, SseError> {
        let variant = args.variant;
        let num_cpus = variant.num_cpus();
        let num_watchdogs = variant
            .devices()
            .iter()
            .filter(|dev| dev.kind == DeviceKind::CmsdkApbWatchdog)
            .count();
        let mut map = AddressMap::new();
        let container = map.add_container("armsse-container", ADDRESS_SPACE_SIZE);
        Ok(Self {
            stage: BuildStage::Unconfigured,
            variant,
            main_clock,
            s32k_clock,
            sram_addr_width: args.sram_addr_width,
            notify_on_reset: args.mpc_notify_on_reset,
            map,
            container,
            cpu_irqs: (0..num_cpus)
                .map(|_| IrqLines::new((NUM_INTERNAL_IRQS + args.num_exp_irq) as usize))
                .collect(),
            nmi_lines: IrqLines::new(num_cpus),
            irq_inputs: Vec::new(),
            secctl: IoTKitSecCtl::new("armsse-secctl"),
            mpc_orgate: OrIrq::new(variant.sram_banks() + SECCTL_NUM_EXP_MPC)?,
            ppc_orgate: OrIrq::new(NUM_PPC_IRQS)?,
            nmi_orgate: OrIrq::new(NmiInput::COUNT)?,
            reset_orgate: OrIrq::new(num_watchdogs.max(1))?,
            num_watchdogs: 0,
            mpcs: Vec::new(),
            ppc_builders: (0..SECCTL_NUM_APB_PPC)
                .map(|n| TzPpc::new(&format!("apb-ppc{n}")))
                .collect(),
            direct: Vec::new(),
            gated: Vec::new(),
            cpu_private: Vec::new(),
            cpu_views: Vec::new(),
            devices: Vec::new(),
        })
    }

    fn enter(&mut self, stage: BuildStage) {
        assert_eq!(self.stage.next(), Some(stage), "build stages run in order");
        self.stage = stage;
        log::debug!("{}: entering {stage:?}", self.variant);
    }

    fn bank_size(&self) -> HwAddr {
        1 << self.sram_addr_width
    }

    /// Interrupt inputs, SRAM with its MPCs and every table device.
    fn instantiate_devices(&mut self) -> Result<(), SseError> {
        self.enter(BuildStage::DevicesInstantiated);
        let num_cpus = self.variant.num_cpus();
        let num_lines = self.cpu_irqs[0].len();

        for line in 0..num_lines {
            let shared = line >= NUM_INTERNAL_IRQS as usize
                || self.variant.irq_is_common(line as u32);
            let input = if num_cpus > 1 && shared {
                let split = SplitIrq::new(num_cpus)?;
                for (cpu, irqs) in self.cpu_irqs.iter().enumerate() {
                    split.output(cpu).connect(irqs.input(line));
                }
                split.input()
            } else {
                self.cpu_irqs[0].input(line)
            };
            self.irq_inputs.push(input);
        }
        self.mpc_orgate
            .output()
            .connect(self.irq_inputs[IRQ_MPC as usize].clone());
        self.ppc_orgate
            .output()
            .connect(self.irq_inputs[IRQ_PPC as usize].clone());
        // Only the primary CPU takes the NMI.
        self.nmi_orgate.output().connect(self.nmi_lines.input(0));

        for bank in 0..self.variant.sram_banks() {
            let size = self.bank_size();
            let ram = MmioRegion::from_device(
                &format!("armsse.sram{bank}"),
                size,
                BusConverter::new(Box::new(Ram::new(vec![0; size as usize]))),
            );
            let mpc = TzMpc::new(
                &format!("armsse-mpc{bank}"),
                ram,
                MpcConfig {
                    notify_on_reset: self.notify_on_reset,
                    ..MpcConfig::default()
                },
            )?;
            mpc.irq().connect(status_split(
                self.secctl.mpc_status_in(bank),
                self.mpc_orgate.input(bank),
            )?);
            self.mpcs.push(mpc);
        }

        for dev in self.variant.devices() {
            let region = self.instantiate(dev)?;
            self.devices.push(region.clone());
            match dev.ppc {
                PortBinding::Direct => self.direct.push((dev.addr, region)),
                PortBinding::Port { ppc, port } => {
                    let builder = self
                        .ppc_builders
                        .get_mut(ppc)
                        .ok_or(SseError::NoSuchPpc {
                            device: dev.name,
                            ppc,
                        })?;
                    builder.bind(port, region)?;
                    self.gated.push((dev.addr, ppc, port));
                }
            }
        }

        for cpu in 0..num_cpus {
            let mut private = Vec::new();
            if self.variant.has_cpu_private_devices() {
                let block = PERIPH_BLOCK_SIZE as HwAddr;
                let cpuid = format!("cpuid{cpu}");
                let cachectrl = format!("cachectrl{cpu}");
                let cpusecctrl = format!("cpusecctrl{cpu}");
                private.push((CPUID_BASE, ArmSseCpuId::new(cpu as u32).into_region(&cpuid)));
                private.push((
                    CACHECTRL_BASE,
                    MmioRegion::from_device(
                        &cachectrl,
                        block,
                        UnimplementedDevice::new(&cachectrl, block),
                    ),
                ));
                private.push((
                    CPUSECCTRL_BASE,
                    MmioRegion::from_device(
                        &cpusecctrl,
                        block,
                        UnimplementedDevice::new(&cpusecctrl, block),
                    ),
                ));
            }
            self.cpu_private.push(private);
        }
        Ok(())
    }

    fn instantiate(&mut self, dev: &DeviceInfo) -> Result<MmioRegion, SseError> {
        let clock = if dev.slow_clock {
            self.s32k_clock.clone()
        } else {
            self.main_clock.clone()
        };
        let irq = Irq::new();
        match dev.irq {
            IrqTarget::None => {}
            IrqTarget::Common(line) => {
                if !self.variant.irq_is_common(line) {
                    return Err(SseError::InvalidIrq {
                        device: dev.name,
                        irq: line,
                    });
                }
                irq.connect(self.irq_inputs[line as usize].clone());
            }
            IrqTarget::Nmi(input) => irq.connect(self.nmi_orgate.input(input.line())),
        }
        let size = dev.size as HwAddr;
        let region = match dev.kind {
            DeviceKind::CmsdkApbTimer => {
                let timer = CmsdkApbTimer::new(dev.name, clock.clock(), irq).into_region();
                clock.attach(timer.clone());
                timer
            }
            DeviceKind::CmsdkApbWatchdog => {
                let wdog = CmsdkApbWatchdog::new(dev.name, clock.clock(), irq);
                wdog.reset_request()
                    .connect(self.reset_orgate.input(self.num_watchdogs));
                self.num_watchdogs += 1;
                let wdog = wdog.into_region();
                clock.attach(wdog.clone());
                wdog
            }
            DeviceKind::SysInfo => IoTKitSysInfo::new(
                self.variant.sys_version(),
                self.variant.sys_config(self.sram_addr_width),
            )
            .into_region(dev.name),
            DeviceKind::Unimplemented => {
                MmioRegion::from_device(dev.name, size, UnimplementedDevice::new(dev.name, size))
            }
        };
        log::debug!("{}: {} at 0x{:08x}", self.variant, dev.name, dev.addr);
        Ok(region)
    }

    fn map_mmio(
        &mut self,
        container: RegionId,
        addr: u32,
        region: MmioRegion,
    ) -> Result<(), SseError> {
        let id = self.map.add_mmio(region);
        self.map.map(container, addr as HwAddr, id, 0)?;
        Ok(())
    }

    /// CPU views, security aliases and everything that is mapped directly.
    fn wire_address_space(&mut self) -> Result<(), SseError> {
        self.enter(BuildStage::AddressSpaceWired);
        let container = self.container;
        let num_cpus = self.variant.num_cpus();

        if num_cpus > 1 {
            for cpu in 0..num_cpus {
                let view = self
                    .map
                    .add_container(&format!("cpu-container{cpu}"), ADDRESS_SPACE_SIZE);
                let shared = self.map.add_alias(
                    &format!("cpu{cpu}-shared"),
                    container,
                    0,
                    ADDRESS_SPACE_SIZE,
                )?;
                self.map.map(view, 0, shared, -1)?;
                self.cpu_views.push(view);
            }
        } else {
            self.cpu_views.push(container);
        }

        for (name, base, target) in [
            ("alias1", ALIAS1_BASE, ALIAS1_TARGET),
            ("alias2", ALIAS2_BASE, ALIAS2_TARGET),
        ] {
            let alias =
                self.map
                    .add_alias(name, container, target as HwAddr, ALIAS_SIZE as HwAddr)?;
            self.map.map(container, base as HwAddr, alias, ALIAS_PRIORITY)?;
        }
        for (cpu, view) in self.cpu_views.clone().into_iter().enumerate() {
            let alias = self.map.add_alias(
                &format!("alias3-cpu{cpu}"),
                view,
                ALIAS3_TARGET as HwAddr,
                ALIAS_SIZE as HwAddr,
            )?;
            self.map.map(view, ALIAS3_BASE as HwAddr, alias, ALIAS_PRIORITY)?;
        }

        self.map_mmio(container, SECCTL_S_BASE, self.secctl.s_regs())?;
        self.map_mmio(container, SECCTL_NS_BASE, self.secctl.ns_regs())?;

        for (bank, mpc) in self.mpcs.clone().into_iter().enumerate() {
            let sram_base = SRAM_BASE as HwAddr + bank as HwAddr * self.bank_size();
            let id = self.map.add_mmio(mpc.upstream());
            self.map.map(container, sram_base, id, 0)?;
            let regs = SRAM_MPC_REGS_BASE + bank as u32 * SRAM_MPC_REGS_STRIDE;
            self.map_mmio(container, regs, mpc.regs())?;
        }

        for (addr, region) in std::mem::take(&mut self.direct) {
            self.map_mmio(container, addr, region)?;
        }
        for (cpu, private) in std::mem::take(&mut self.cpu_private).into_iter().enumerate() {
            let view = self.cpu_views[cpu];
            for (addr, region) in private {
                self.map_mmio(view, addr, region)?;
            }
        }
        Ok(())
    }

    /// Realize the PPCs, map their ports and connect their control lines.
    fn realize(mut self) -> Result<ArmSse, SseError> {
        self.enter(BuildStage::Realized);
        let container = self.container;
        let ppcs = std::mem::take(&mut self.ppc_builders)
            .into_iter()
            .map(TzPpc::realize)
            .collect::<Result<Vec<Ppc>, _>>()?;

        for (addr, ppc, port) in std::mem::take(&mut self.gated) {
            if let Some(upstream) = ppcs[ppc].upstream(port) {
                self.map_mmio(container, addr, upstream.clone())?;
            }
        }

        let sec_resp_split = SplitIrq::new(SECCTL_NUM_APB_PPC + 1)?;
        self.secctl
            .sec_resp_cfg()
            .connect(sec_resp_split.input());
        for (n, ppc) in ppcs.iter().enumerate() {
            let id = PpcId::Apb(n);
            self.secctl.ppc_pins(id).connect(ppc);
            sec_resp_split.output(n).connect(ppc.cfg_sec_resp_in());
            ppc.irq().connect(status_split(
                self.secctl.ppc_status_in(id),
                self.ppc_orgate.input(ppc_orgate_line(id)),
            )?);
        }

        let ppcexp_status = EXP_PPCS
            .iter()
            .map(|&id| {
                status_split(
                    self.secctl.ppc_status_in(id),
                    self.ppc_orgate.input(ppc_orgate_line(id)),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let banks = self.variant.sram_banks();
        let mpcexp_status = (0..SECCTL_NUM_EXP_MPC)
            .map(|n| {
                status_split(
                    self.secctl.mpcexp_status_in(n),
                    self.mpc_orgate.input(banks + n),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ArmSse {
            variant: self.variant,
            stage: self.stage,
            main_clock: self.main_clock,
            s32k_clock: self.s32k_clock,
            map: self.map,
            container,
            cpu_views: self.cpu_views,
            cpu_irqs: self.cpu_irqs,
            nmi_lines: self.nmi_lines,
            irq_inputs: self.irq_inputs,
            secctl: self.secctl,
            ppcs,
            mpcs: self.mpcs,
            sec_resp_split,
            ppcexp_status,
            mpcexp_status,
            reset_orgate: self.reset_orgate,
            devices: self.devices,
        })
    }
}

/// A realized SSE subsystem.
pub struct ArmSse {
    variant: SseVariant,
    stage: BuildStage,
    main_clock: ClockSource,
    s32k_clock: ClockSource,
    map: AddressMap,
    container: RegionId,
    cpu_views: Vec<RegionId>,
    cpu_irqs: Vec<IrqLines>,
    nmi_lines: IrqLines,
    irq_inputs: Vec<IrqIn>,
    secctl: IoTKitSecCtl,
    ppcs: Vec<Ppc>,
    mpcs: Vec<TzMpc>,
    sec_resp_split: SplitIrq,
    ppcexp_status: Vec<IrqIn>,
    mpcexp_status: Vec<IrqIn>,
    reset_orgate: OrIrq,
    devices: Vec<MmioRegion>,
}

impl ArmSse {
    pub fn new(args: ArmSseArgs) -> Result<Self, SseError> {
        let main_clock = args
            .main_clock
            .clone()
            .ok_or(SseError::ClockNotConnected("MAINCLK"))?;
        let s32k_clock = args
            .s32k_clock
            .clone()
            .ok_or(SseError::ClockNotConnected("S32KCLK"))?;
        let max_width = SRAM_ADDR_WIDTH_MAX - args.variant.sram_banks().trailing_zeros();
        if !(1..=max_width).contains(&args.sram_addr_width) {
            return Err(SseError::InvalidSramAddrWidth {
                width: args.sram_addr_width,
                max: max_width,
            });
        }
        if args.num_exp_irq > NUM_EXP_IRQ_MAX {
            return Err(SseError::InvalidExpIrqCount {
                count: args.num_exp_irq,
                max: NUM_EXP_IRQ_MAX,
            });
        }

        let mut build = Build::new(&args, main_clock, s32k_clock)?;
        build.instantiate_devices()?;
        build.wire_address_space()?;
        let sse = build.realize()?;
        sse.reset();
        log::info!(
            "{}: {} CPUs, {} SRAM banks of 0x{:x} bytes",
            sse.variant,
            sse.num_cpus(),
            sse.mpcs.len(),
            1u64 << args.sram_addr_width
        );
        Ok(sse)
    }

    pub fn variant(&self) -> SseVariant {
        self.variant
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn num_cpus(&self) -> usize {
        self.cpu_views.len()
    }

    /// Read through the address space of `cpu`.
    pub fn read(
        &self,
        cpu: usize,
        size: RvSize,
        addr: u32,
        attrs: TxAttrs,
    ) -> Result<RvData, BusError> {
        self.map.read(self.cpu_views[cpu], size, addr as HwAddr, attrs)
    }

    pub fn write(
        &self,
        cpu: usize,
        size: RvSize,
        addr: u32,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        self.map
            .write(self.cpu_views[cpu], size, addr as HwAddr, val, attrs)
    }

    pub fn cpu_view(&self, cpu: usize) -> RegionId {
        self.cpu_views[cpu]
    }

    /// The shared container. Boards map their memories and peripherals here.
    pub fn container(&self) -> RegionId {
        self.container
    }

    pub fn address_map(&self) -> &AddressMap {
        &self.map
    }

    pub fn address_map_mut(&mut self) -> &mut AddressMap {
        &mut self.map
    }

    pub fn flat_view(&self, cpu: usize) -> Vec<FlatRange> {
        self.map.flatten(self.cpu_views[cpu])
    }

    /// Interrupt inputs of `cpu`: 32 internal lines then the expansion lines.
    pub fn cpu_irqs(&self, cpu: usize) -> &IrqLines {
        &self.cpu_irqs[cpu]
    }

    /// NMI input of every CPU, one line per CPU.
    pub fn nmi_lines(&self) -> &IrqLines {
        &self.nmi_lines
    }

    /// Expansion interrupt `n`, delivered to every CPU.
    pub fn exp_irq_in(&self, n: usize) -> IrqIn {
        self.irq_inputs[NUM_INTERNAL_IRQS as usize + n].clone()
    }

    pub fn num_exp_irq(&self) -> usize {
        self.irq_inputs.len() - NUM_INTERNAL_IRQS as usize
    }

    /// Configuration outputs for the board PPC `id`.
    pub fn ppcexp_pins(&self, id: PpcId) -> &SecCtlPpcPins {
        assert!(!matches!(id, PpcId::Apb(_)), "{id:?} is internal");
        self.secctl.ppc_pins(id)
    }

    /// Interrupt status input for the board PPC `id`.
    pub fn ppcexp_status_in(&self, id: PpcId) -> IrqIn {
        let index = EXP_PPCS
            .iter()
            .position(|&exp| exp == id)
            .unwrap_or_else(|| panic!("{id:?} is not an expansion PPC"));
        self.ppcexp_status[index].clone()
    }

    /// Interrupt status input for board MPC `n`.
    pub fn mpcexp_status_in(&self, n: usize) -> IrqIn {
        self.mpcexp_status[n].clone()
    }

    /// SECRESPCFG as seen by the board PPCs.
    pub fn sec_resp_cfg(&self) -> &Irq {
        self.sec_resp_split.output(SECCTL_NUM_APB_PPC)
    }

    /// Asserted when a watchdog requests a system reset.
    pub fn reset_request(&self) -> &Irq {
        self.reset_orgate.output()
    }

    pub fn secctl(&self) -> &IoTKitSecCtl {
        &self.secctl
    }

    pub fn ppc(&self, n: usize) -> &Ppc {
        &self.ppcs[n]
    }

    pub fn mpc(&self, bank: usize) -> &TzMpc {
        &self.mpcs[bank]
    }

    pub fn main_clock(&self) -> &ClockSource {
        &self.main_clock
    }

    pub fn s32k_clock(&self) -> &ClockSource {
        &self.s32k_clock
    }

    /// Advance both clocks. Devices whose timers fire are polled.
    pub fn advance_ns(&self, ns: u64) {
        self.main_clock.advance_ns(ns);
        self.s32k_clock.advance_ns(ns);
    }

    pub fn reset(&self) {
        for ppc in &self.ppcs {
            ppc.reset();
        }
        for mpc in &self.mpcs {
            mpc.reset();
        }
        self.secctl.reset();
        for dev in &self.devices {
            dev.warm_reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(variant: SseVariant) -> ArmSseArgs {
        ArmSseArgs {
            variant,
            main_clock: Some(ClockSource::new("MAINCLK", MPS2_MAINCLK_HZ)),
            s32k_clock: Some(ClockSource::new("S32KCLK", S32KCLK_HZ)),
            ..Default::default()
        }
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(BuildStage::Unconfigured < BuildStage::Realized);
        assert_eq!(BuildStage::Realized.next(), None);
        let sse = ArmSse::new(args(SseVariant::IotKit)).unwrap();
        assert_eq!(sse.stage(), BuildStage::Realized);
    }

    #[test]
    fn test_missing_clocks() {
        let mut no_main = args(SseVariant::IotKit);
        no_main.main_clock = None;
        assert!(matches!(
            ArmSse::new(no_main),
            Err(SseError::ClockNotConnected("MAINCLK"))
        ));
        let mut no_slow = args(SseVariant::Sse200);
        no_slow.s32k_clock = None;
        assert!(matches!(
            ArmSse::new(no_slow),
            Err(SseError::ClockNotConnected("S32KCLK"))
        ));
    }

    #[test]
    fn test_sram_addr_width_limits() {
        for width in [0, 23] {
            let mut bad = args(SseVariant::IotKit);
            bad.sram_addr_width = width;
            assert!(matches!(
                ArmSse::new(bad),
                Err(SseError::InvalidSramAddrWidth { max: 22, .. })
            ));
        }
        let mut small = args(SseVariant::IotKit);
        small.sram_addr_width = 12;
        let sse = ArmSse::new(small).unwrap();
        assert_eq!(sse.mpc(3).upstream().size(), 0x1000);
    }

    #[test]
    fn test_exp_irq_limit() {
        let mut bad = args(SseVariant::IotKit);
        bad.num_exp_irq = NUM_EXP_IRQ_MAX + 1;
        assert!(matches!(
            ArmSse::new(bad),
            Err(SseError::InvalidExpIrqCount { .. })
        ));
    }

    #[test]
    fn test_ppc_orgate_lines_are_distinct() {
        let mut lines: Vec<usize> = EXP_PPCS.iter().map(|&id| ppc_orgate_line(id)).collect();
        lines.extend([ppc_orgate_line(PpcId::Apb(0)), ppc_orgate_line(PpcId::Apb(1))]);
        lines.sort();
        assert_eq!(lines, (0..NUM_PPC_IRQS).collect::<Vec<_>>());
    }
}
