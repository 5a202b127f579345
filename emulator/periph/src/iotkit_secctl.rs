/*++

Licensed under the Apache-2.0 license.

File Name:

    iotkit_secctl.rs

Abstract:

    File contains the IoTKit security controller: the secure and non-secure
    privilege control register blocks that drive the configuration lines of
    every PPC and collect the PPC and MPC interrupt status.

--*/

use crate::tz_ppc::{Ppc, TZ_NUM_PORTS};
use emulator_bus::{extract_subword, Bus, BusError, Irq, IrqIn, MmioRegion};
use emulator_types::{id_register, HwAddr, RvAddr, RvData, RvSize, TxAttrs, ID_REGS_LEN};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

const SECCTL_BLOCK_SIZE: HwAddr = 0x1000;
pub const SECCTL_NUM_APB_PPC: usize = 2;
pub const SECCTL_NUM_APB_EXP_PPC: usize = 4;
pub const SECCTL_NUM_AHB_EXP_PPC: usize = 4;
pub const SECCTL_NUM_MPC: usize = 4;
pub const SECCTL_NUM_EXP_MPC: usize = 16;

const NUM_PPCS: usize = SECCTL_NUM_APB_PPC + SECCTL_NUM_APB_EXP_PPC + SECCTL_NUM_AHB_EXP_PPC;
const APB_PPC0_NUM_PORTS: usize = 5;
const APB_PPC1_NUM_PORTS: usize = 1;

const S_ID: [u8; ID_REGS_LEN] = [
    0x04, 0x00, 0x00, 0x00, 0x52, 0xb8, 0x0b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
];
const NS_ID: [u8; ID_REGS_LEN] = [
    0x04, 0x00, 0x00, 0x00, 0x53, 0xb8, 0x0b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
];

// Secure block.
const SECRESPCFG: RvAddr = 0x10;
const NSCCFG: RvAddr = 0x14;
const SECMPCINTSTATUS: RvAddr = 0x1c;
const SECPPCINTSTAT: RvAddr = 0x20;
const SECPPCINTCLR: RvAddr = 0x24;
const SECPPCINTEN: RvAddr = 0x28;
const SECMSCINTSTAT: RvAddr = 0x30;
const SECMSCINTCLR: RvAddr = 0x34;
const SECMSCINTEN: RvAddr = 0x38;
const BRGINTSTAT: RvAddr = 0x40;
const BRGINTCLR: RvAddr = 0x44;
const BRGINTEN: RvAddr = 0x48;
const AHBNSPPC0: RvAddr = 0x50;
const AHBNSPPCEXP0: RvAddr = 0x60;
const APBNSPPC0: RvAddr = 0x70;
const APBNSPPCEXP0: RvAddr = 0x80;
const AHBSPPPC0: RvAddr = 0x90;
const AHBSPPPCEXP0: RvAddr = 0xa0;
const APBSPPPC0: RvAddr = 0xb0;
const APBSPPPCEXP0: RvAddr = 0xc0;
const NSMSCEXP: RvAddr = 0xd0;

// Non-secure block.
const AHBNSPPPC0: RvAddr = 0x90;
const AHBNSPPPCEXP0: RvAddr = 0xa0;
const APBNSPPPC0: RvAddr = 0xb0;
const APBNSPPPCEXP0: RvAddr = 0xc0;

const NS_BANKS: [RvAddr; 3] = [AHBNSPPCEXP0, APBNSPPC0, APBNSPPCEXP0];
const SP_BANKS: [RvAddr; 3] = [AHBSPPPCEXP0, APBSPPPC0, APBSPPPCEXP0];
const NSP_BANKS: [RvAddr; 3] = [AHBNSPPPCEXP0, APBNSPPPC0, APBNSPPPCEXP0];

/// Valid bits of SECPPCINTSTAT/CLR/EN.
const PPC_IRQ_MASK: u32 = 0x00f0_00f3;

/// The PPCs under control of the security controller.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PpcId {
    /// Internal APB PPC.
    Apb(usize),
    /// Expansion APB PPC on the board.
    ApbExp(usize),
    /// Expansion AHB PPC on the board.
    AhbExp(usize),
}

impl PpcId {
    const ALL: [PpcId; NUM_PPCS] = [
        PpcId::Apb(0),
        PpcId::Apb(1),
        PpcId::ApbExp(0),
        PpcId::ApbExp(1),
        PpcId::ApbExp(2),
        PpcId::ApbExp(3),
        PpcId::AhbExp(0),
        PpcId::AhbExp(1),
        PpcId::AhbExp(2),
        PpcId::AhbExp(3),
    ];

    fn index(self) -> usize {
        match self {
            PpcId::Apb(n) if n < SECCTL_NUM_APB_PPC => n,
            PpcId::ApbExp(n) if n < SECCTL_NUM_APB_EXP_PPC => SECCTL_NUM_APB_PPC + n,
            PpcId::AhbExp(n) if n < SECCTL_NUM_AHB_EXP_PPC => {
                SECCTL_NUM_APB_PPC + SECCTL_NUM_APB_EXP_PPC + n
            }
            _ => panic!("security controller has no {self:?}"),
        }
    }

    /// Bit of this PPC in SECPPCINTSTAT/CLR/EN.
    fn irq_bit(self) -> u32 {
        match self {
            PpcId::Apb(n) => n as u32,
            PpcId::ApbExp(n) => 4 + n as u32,
            PpcId::AhbExp(n) => 20 + n as u32,
        }
    }

    fn num_ports(self) -> usize {
        match self {
            PpcId::Apb(0) => APB_PPC0_NUM_PORTS,
            PpcId::Apb(_) => APB_PPC1_NUM_PORTS,
            _ => TZ_NUM_PORTS,
        }
    }

    fn port_mask(self) -> u32 {
        (1 << self.num_ports()) - 1
    }

    /// The PPC whose register sits at `offset` in a bank of per-PPC
    /// registers starting at `base`.
    fn at(offset: RvAddr, base: RvAddr, count: usize, id: fn(usize) -> PpcId) -> Option<PpcId> {
        let index = (offset.checked_sub(base)? / 4) as usize;
        (index < count).then(|| id(index))
    }

    /// Decode one AHB EXP, APB and APB EXP register bank triple.
    fn decode(offset: RvAddr, [ahbexp, apb, apbexp]: [RvAddr; 3]) -> Option<PpcId> {
        Self::at(offset, ahbexp, SECCTL_NUM_AHB_EXP_PPC, PpcId::AhbExp)
            .or_else(|| Self::at(offset, apb, SECCTL_NUM_APB_PPC, PpcId::Apb))
            .or_else(|| Self::at(offset, apbexp, SECCTL_NUM_APB_EXP_PPC, PpcId::ApbExp))
    }
}

/// Configuration outputs for one PPC.
pub struct SecCtlPpcPins {
    nonsec: Vec<Irq>,
    ap: Vec<Irq>,
    irq_enable: Irq,
    irq_clear: Irq,
}

impl SecCtlPpcPins {
    fn new(num_ports: usize) -> Self {
        Self {
            nonsec: (0..num_ports).map(|_| Irq::new()).collect(),
            ap: (0..num_ports).map(|_| Irq::new()).collect(),
            irq_enable: Irq::new(),
            irq_clear: Irq::new(),
        }
    }

    pub fn num_ports(&self) -> usize {
        self.nonsec.len()
    }

    pub fn nonsec(&self, port: usize) -> &Irq {
        &self.nonsec[port]
    }

    pub fn ap(&self, port: usize) -> &Irq {
        &self.ap[port]
    }

    pub fn irq_enable(&self) -> &Irq {
        &self.irq_enable
    }

    pub fn irq_clear(&self) -> &Irq {
        &self.irq_clear
    }

    /// Connect these outputs to the configuration inputs of `ppc`.
    pub fn connect(&self, ppc: &Ppc) {
        for port in 0..self.num_ports().min(ppc.num_ports()) {
            self.nonsec[port].connect(ppc.cfg_nonsec_in(port));
            self.ap[port].connect(ppc.cfg_ap_in(port));
        }
        self.irq_enable.connect(ppc.irq_enable_in());
        self.irq_clear.connect(ppc.irq_clear_in());
    }
}

#[derive(Copy, Clone, Default)]
struct PpcRegs {
    ns: u32,
    sp: u32,
    nsp: u32,
}

#[derive(Default)]
struct SecCtlRegs {
    secrespcfg: u32,
    nsccfg: u32,
    secppcinten: u32,
    secmscinten: u32,
    nsmscexp: u32,
    ppcs: [PpcRegs; NUM_PPCS],
}

/// Side effect of a register write, applied once the registers are released.
enum Drive {
    None,
    SecResp(bool),
    Ppc(PpcId),
    IrqEnable,
    IrqClear(u32),
}

struct SecCtlInner {
    name: String,
    regs: RefCell<SecCtlRegs>,
    // Status inputs can be driven while a register write is in progress.
    secppcintstat: Cell<u32>,
    secmpcintstatus: Cell<u32>,
    sec_resp_cfg: Irq,
    ppc_pins: Vec<SecCtlPpcPins>,
}

impl SecCtlInner {
    fn drive_ppc(&self, id: PpcId) {
        let PpcRegs { ns, sp, nsp } = self.regs.borrow().ppcs[id.index()];
        let pins = &self.ppc_pins[id.index()];
        for port in 0..pins.num_ports() {
            let bit = |value: u32| value & (1 << port) != 0;
            pins.nonsec[port].set_level(bit(ns));
            pins.ap[port].set_level(if bit(ns) { bit(nsp) } else { bit(sp) });
        }
    }

    fn drive_irq_enable(&self) {
        let inten = self.regs.borrow().secppcinten;
        for id in PpcId::ALL {
            let pins = &self.ppc_pins[id.index()];
            pins.irq_enable.set_level(inten & (1 << id.irq_bit()) != 0);
        }
    }

    fn apply(&self, drive: Drive) {
        match drive {
            Drive::None => {}
            Drive::SecResp(level) => self.sec_resp_cfg.set_level(level),
            Drive::Ppc(id) => self.drive_ppc(id),
            Drive::IrqEnable => self.drive_irq_enable(),
            Drive::IrqClear(mask) => {
                for id in PpcId::ALL.into_iter().filter(|id| mask & (1 << id.irq_bit()) != 0) {
                    let clear = &self.ppc_pins[id.index()].irq_clear;
                    clear.raise();
                    clear.lower();
                }
            }
        }
    }

    fn s_read(&self, offset: RvAddr) -> RvData {
        let regs = self.regs.borrow();
        if let Some(id) = id_register(&S_ID, offset) {
            return id;
        }
        if let Some(id) = PpcId::decode(offset, NS_BANKS) {
            return regs.ppcs[id.index()].ns;
        }
        if let Some(id) = PpcId::decode(offset, SP_BANKS) {
            return regs.ppcs[id.index()].sp;
        }
        match offset {
            SECRESPCFG => regs.secrespcfg,
            NSCCFG => regs.nsccfg,
            SECMPCINTSTATUS => self.secmpcintstatus.get(),
            SECPPCINTSTAT => self.secppcintstat.get() & PPC_IRQ_MASK,
            SECPPCINTEN => regs.secppcinten,
            SECMSCINTSTAT => 0,
            SECMSCINTEN => regs.secmscinten,
            NSMSCEXP => regs.nsmscexp,
            AHBNSPPC0 | AHBSPPPC0 => 0,
            BRGINTSTAT | BRGINTEN => {
                log::warn!("{}: bridge interrupts are not implemented", self.name);
                0
            }
            SECPPCINTCLR | SECMSCINTCLR | BRGINTCLR => {
                log::warn!("{}: read of write-only offset 0x{offset:x}", self.name);
                0
            }
            _ => {
                log::warn!("{}: read of bad secure offset 0x{offset:x}", self.name);
                0
            }
        }
    }

    fn s_write(&self, offset: RvAddr, value: RvData) -> Drive {
        let mut regs = self.regs.borrow_mut();
        if let Some(id) = PpcId::decode(offset, NS_BANKS) {
            regs.ppcs[id.index()].ns = value & id.port_mask();
            return Drive::Ppc(id);
        }
        if let Some(id) = PpcId::decode(offset, SP_BANKS) {
            regs.ppcs[id.index()].sp = value & id.port_mask();
            return Drive::Ppc(id);
        }
        match offset {
            SECRESPCFG => {
                regs.secrespcfg = value & 1;
                Drive::SecResp(value & 1 != 0)
            }
            NSCCFG => {
                regs.nsccfg = value & 3;
                Drive::None
            }
            SECPPCINTCLR => Drive::IrqClear(value & PPC_IRQ_MASK),
            SECPPCINTEN => {
                regs.secppcinten = value & PPC_IRQ_MASK;
                Drive::IrqEnable
            }
            SECMSCINTEN => {
                regs.secmscinten = value;
                Drive::None
            }
            SECMSCINTCLR => Drive::None,
            NSMSCEXP => {
                regs.nsmscexp = value;
                Drive::None
            }
            BRGINTCLR | BRGINTEN => {
                log::warn!("{}: bridge interrupts are not implemented", self.name);
                Drive::None
            }
            _ => {
                log::warn!("{}: write to bad secure offset 0x{offset:x}", self.name);
                Drive::None
            }
        }
    }

    fn ns_read(&self, offset: RvAddr) -> RvData {
        if let Some(id) = id_register(&NS_ID, offset) {
            return id;
        }
        if let Some(id) = PpcId::decode(offset, NSP_BANKS) {
            return self.regs.borrow().ppcs[id.index()].nsp;
        }
        if offset == AHBNSPPPC0 {
            return 0;
        }
        log::warn!("{}: read of bad non-secure offset 0x{offset:x}", self.name);
        0
    }

    fn ns_write(&self, offset: RvAddr, value: RvData) -> Drive {
        if let Some(id) = PpcId::decode(offset, NSP_BANKS) {
            self.regs.borrow_mut().ppcs[id.index()].nsp = value & id.port_mask();
            return Drive::Ppc(id);
        }
        log::warn!("{}: write to bad non-secure offset 0x{offset:x}", self.name);
        Drive::None
    }
}

fn ppc_latch(inner: &SecCtlInner) -> &Cell<u32> {
    &inner.secppcintstat
}

fn mpc_latch(inner: &SecCtlInner) -> &Cell<u32> {
    &inner.secmpcintstatus
}

fn set_bit(cell: &Cell<u32>, bit: u32, level: bool) {
    let value = cell.get() & !(1 << bit);
    cell.set(value | (level as u32) << bit);
}

/// Which of the two register blocks a bus wrapper serves.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Block {
    Secure,
    NonSecure,
}

struct SecCtlBlock {
    secctl: Rc<SecCtlInner>,
    block: Block,
}

impl Bus for SecCtlBlock {
    fn read(&mut self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> Result<RvData, BusError> {
        if size == RvSize::Invalid || addr % size.bytes() != 0 {
            return Err(BusError::LoadAddrMisaligned);
        }
        if !attrs.privileged {
            log::warn!("{}: unprivileged read at 0x{addr:x}", self.secctl.name);
            return Err(BusError::LoadAccessFault);
        }
        let offset = addr & !3;
        let value = match self.block {
            Block::Secure => self.secctl.s_read(offset),
            Block::NonSecure => self.secctl.ns_read(offset),
        };
        Ok(extract_subword(value, size, addr))
    }

    fn write(
        &mut self,
        size: RvSize,
        addr: RvAddr,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        if size == RvSize::Invalid || addr % size.bytes() != 0 {
            return Err(BusError::StoreAddrMisaligned);
        }
        if !attrs.privileged {
            log::warn!("{}: unprivileged write at 0x{addr:x}", self.secctl.name);
            return Err(BusError::StoreAccessFault);
        }
        if size != RvSize::Word {
            log::warn!("{}: {size:?} write at 0x{addr:x} ignored", self.secctl.name);
            return Ok(());
        }
        log::trace!("{}: {:?} write 0x{addr:x} <- 0x{val:x}", self.secctl.name, self.block);
        let drive = match self.block {
            Block::Secure => self.secctl.s_write(addr, val),
            Block::NonSecure => self.secctl.ns_write(addr, val),
        };
        self.secctl.apply(drive);
        Ok(())
    }
}

#[derive(Clone)]
pub struct IoTKitSecCtl {
    inner: Rc<SecCtlInner>,
}

impl IoTKitSecCtl {
    pub fn new(name: &str) -> Self {
        Self {
            inner: Rc::new(SecCtlInner {
                name: name.to_string(),
                regs: RefCell::new(SecCtlRegs::default()),
                secppcintstat: Cell::new(0),
                secmpcintstatus: Cell::new(0),
                sec_resp_cfg: Irq::new(),
                ppc_pins: PpcId::ALL
                    .iter()
                    .map(|id| SecCtlPpcPins::new(id.num_ports()))
                    .collect(),
            }),
        }
    }

    /// Secure privilege control block.
    pub fn s_regs(&self) -> MmioRegion {
        self.block(Block::Secure, "s_regs")
    }

    /// Non-secure privilege control block.
    pub fn ns_regs(&self) -> MmioRegion {
        self.block(Block::NonSecure, "ns_regs")
    }

    fn block(&self, block: Block, suffix: &str) -> MmioRegion {
        MmioRegion::from_device(
            &format!("{}-{suffix}", self.inner.name),
            SECCTL_BLOCK_SIZE,
            SecCtlBlock {
                secctl: self.inner.clone(),
                block,
            },
        )
    }

    pub fn ppc_pins(&self, id: PpcId) -> &SecCtlPpcPins {
        &self.inner.ppc_pins[id.index()]
    }

    /// Interrupt status of the PPC `id`, reported in SECPPCINTSTAT.
    pub fn ppc_status_in(&self, id: PpcId) -> IrqIn {
        self.status_in(ppc_latch, id.irq_bit())
    }

    /// Interrupt status of internal MPC `n`.
    pub fn mpc_status_in(&self, n: usize) -> IrqIn {
        assert!(n < SECCTL_NUM_MPC, "{}: no MPC {n}", self.inner.name);
        self.status_in(mpc_latch, n as u32)
    }

    /// Interrupt status of expansion MPC `n`.
    pub fn mpcexp_status_in(&self, n: usize) -> IrqIn {
        assert!(n < SECCTL_NUM_EXP_MPC, "{}: no expansion MPC {n}", self.inner.name);
        self.status_in(mpc_latch, 16 + n as u32)
    }

    fn status_in(&self, latch: fn(&SecCtlInner) -> &Cell<u32>, bit: u32) -> IrqIn {
        let inner: Weak<SecCtlInner> = Rc::downgrade(&self.inner);
        IrqIn::new(move |level| {
            if let Some(inner) = inner.upgrade() {
                set_bit(latch(&inner), bit, level);
            }
        })
    }

    /// SECRESPCFG bit 0: bus error response for blocked PPC transactions.
    pub fn sec_resp_cfg(&self) -> &Irq {
        &self.inner.sec_resp_cfg
    }

    pub fn reset(&self) {
        *self.inner.regs.borrow_mut() = SecCtlRegs::default();
        self.inner.apply(Drive::SecResp(false));
        self.inner.apply(Drive::IrqEnable);
        for id in PpcId::ALL {
            self.inner.apply(Drive::Ppc(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tz_ppc::{PortAttribute, SecResp, TzPpc};
    use caliptra_emu_bus::Ram;
    use emulator_bus::BusConverter;

    const S: TxAttrs = TxAttrs::secure();

    fn ppc(ports: usize) -> Ppc {
        let mut ppc = TzPpc::new("ppc");
        for port in 0..ports {
            let ram = BusConverter::new(Box::new(Ram::new(vec![0; 0x100])));
            ppc.bind(port, MmioRegion::from_device("dev", 0x100, ram))
                .unwrap();
        }
        ppc.realize().unwrap()
    }

    fn write(region: &MmioRegion, offset: RvAddr, val: RvData) {
        region.write(RvSize::Word, offset, val, S).unwrap();
    }

    fn read(region: &MmioRegion, offset: RvAddr) -> RvData {
        region.read(RvSize::Word, offset, S).unwrap()
    }

    #[test]
    fn test_id_registers() {
        let secctl = IoTKitSecCtl::new("secctl");
        assert_eq!(read(&secctl.s_regs(), 0xfe0), 0x52);
        assert_eq!(read(&secctl.ns_regs(), 0xfe0), 0x53);
        assert_eq!(read(&secctl.s_regs(), 0xffc), 0xb1);
    }

    #[test]
    fn test_ns_and_ap_outputs_drive_ppc() {
        let secctl = IoTKitSecCtl::new("secctl");
        let ppc = ppc(3);
        secctl.ppc_pins(PpcId::Apb(0)).connect(&ppc);
        let s_regs = secctl.s_regs();
        let ns_regs = secctl.ns_regs();

        // Port 1 non-secure, unprivileged access allowed through NSP.
        write(&s_regs, APBNSPPC0, 0b010);
        write(&ns_regs, APBNSPPPC0, 0b010);
        // Port 2 secure, unprivileged access allowed through SP.
        write(&s_regs, APBSPPPC0, 0b100);
        assert!(ppc.port_attribute(1, PortAttribute::NonSecure));
        assert!(ppc.port_attribute(1, PortAttribute::PrivilegedOk));
        assert!(!ppc.port_attribute(2, PortAttribute::NonSecure));
        assert!(ppc.port_attribute(2, PortAttribute::PrivilegedOk));
        assert!(!ppc.port_attribute(0, PortAttribute::PrivilegedOk));

        // Flipping port 2 to non-secure switches its AP source to NSP.
        write(&s_regs, APBNSPPC0, 0b110);
        assert!(!ppc.port_attribute(2, PortAttribute::PrivilegedOk));

        // Bits beyond the PPC's port count are not stored.
        write(&s_regs, APBNSPPC0, 0xffff_ffff);
        assert_eq!(read(&s_regs, APBNSPPC0), 0x1f);
        assert_eq!(read(&ns_regs, APBNSPPPC0), 0b010);
    }

    #[test]
    fn test_expansion_register_banks() {
        let secctl = IoTKitSecCtl::new("secctl");
        let s_regs = secctl.s_regs();
        write(&s_regs, AHBNSPPCEXP0 + 8, 0x1_8001);
        write(&s_regs, APBNSPPCEXP0 + 12, 0xffff);
        write(&s_regs, APBSPPPCEXP0 + 4, 0x3);
        assert_eq!(read(&s_regs, AHBNSPPCEXP0 + 8), 0x8001);
        assert_eq!(read(&s_regs, APBNSPPCEXP0 + 12), 0xffff);
        assert_eq!(read(&s_regs, APBSPPPCEXP0 + 4), 0x3);
        assert!(secctl.ppc_pins(PpcId::AhbExp(2)).nonsec(15).level());
        assert!(secctl.ppc_pins(PpcId::ApbExp(1)).ap(1).level());
        assert_eq!(read(&s_regs, APBNSPPC0 + 8), 0);
    }

    #[test]
    fn test_ppc_interrupt_enable_status_and_clear() {
        let secctl = IoTKitSecCtl::new("secctl");
        let ppc = ppc(1);
        secctl.ppc_pins(PpcId::Apb(1)).connect(&ppc);
        ppc.irq().connect(secctl.ppc_status_in(PpcId::Apb(1)));
        let s_regs = secctl.s_regs();

        let upstream = ppc.upstream(0).unwrap();
        upstream.read(RvSize::Word, 0, TxAttrs::nonsecure()).unwrap();
        assert!(ppc.irq_status());
        assert_eq!(read(&s_regs, SECPPCINTSTAT), 0);

        write(&s_regs, SECPPCINTEN, 0xffff_ffff);
        assert_eq!(read(&s_regs, SECPPCINTEN), PPC_IRQ_MASK);
        assert_eq!(read(&s_regs, SECPPCINTSTAT), 0b10);

        write(&s_regs, SECPPCINTCLR, 0b01);
        assert_eq!(read(&s_regs, SECPPCINTSTAT), 0b10);
        write(&s_regs, SECPPCINTCLR, 0b10);
        assert_eq!(read(&s_regs, SECPPCINTSTAT), 0);
        assert!(!ppc.irq_status());

        // The clear line is released again after the pulse.
        upstream.read(RvSize::Word, 0, TxAttrs::nonsecure()).unwrap();
        assert_eq!(read(&s_regs, SECPPCINTSTAT), 0b10);
    }

    #[test]
    fn test_expansion_ppc_irq_bits() {
        let secctl = IoTKitSecCtl::new("secctl");
        let s_regs = secctl.s_regs();
        secctl.ppc_status_in(PpcId::ApbExp(2)).set_level(true);
        secctl.ppc_status_in(PpcId::AhbExp(3)).set_level(true);
        assert_eq!(read(&s_regs, SECPPCINTSTAT), 1 << 6 | 1 << 23);
        write(&s_regs, SECPPCINTEN, 1 << 21);
        assert!(secctl.ppc_pins(PpcId::AhbExp(1)).irq_enable().level());
        assert!(!secctl.ppc_pins(PpcId::AhbExp(0)).irq_enable().level());
    }

    #[test]
    fn test_mpc_status_inputs() {
        let secctl = IoTKitSecCtl::new("secctl");
        secctl.mpc_status_in(2).set_level(true);
        secctl.mpcexp_status_in(1).set_level(true);
        assert_eq!(read(&secctl.s_regs(), SECMPCINTSTATUS), 1 << 2 | 1 << 17);
        secctl.mpc_status_in(2).set_level(false);
        assert_eq!(read(&secctl.s_regs(), SECMPCINTSTATUS), 1 << 17);
    }

    #[test]
    fn test_sec_resp_cfg_output() {
        let secctl = IoTKitSecCtl::new("secctl");
        let ppc = ppc(1);
        secctl.sec_resp_cfg().connect(ppc.cfg_sec_resp_in());
        write(&secctl.s_regs(), SECRESPCFG, 0x3);
        assert_eq!(read(&secctl.s_regs(), SECRESPCFG), 1);
        assert_eq!(ppc.sec_resp(), SecResp::BusError);
        secctl.reset();
        assert_eq!(ppc.sec_resp(), SecResp::RazWi);
    }

    #[test]
    fn test_access_restrictions() {
        let secctl = IoTKitSecCtl::new("secctl");
        let s_regs = secctl.s_regs();
        let user = TxAttrs::secure().unprivileged();
        assert_eq!(
            s_regs.read(RvSize::Word, NSCCFG, user),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            s_regs.write(RvSize::Word, NSCCFG, 1, user),
            Err(BusError::StoreAccessFault)
        );
        // Sub-word writes are ignored, sub-word reads are allowed.
        s_regs.write(RvSize::Byte, NSCCFG, 3, S).unwrap();
        assert_eq!(read(&s_regs, NSCCFG), 0);
        write(&s_regs, NSCCFG, 0xff);
        assert_eq!(s_regs.read(RvSize::Byte, NSCCFG, S), Ok(3));
        // Unimplemented and bad offsets read as zero.
        assert_eq!(read(&s_regs, BRGINTSTAT), 0);
        assert_eq!(read(&s_regs, 0x800), 0);
    }
}
