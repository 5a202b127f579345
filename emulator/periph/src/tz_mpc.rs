/*++

Licensed under the Apache-2.0 license.

File Name:

    tz_mpc.rs

Abstract:

    File contains the TrustZone Memory Protection Controller. The MPC splits
    a downstream memory into equal blocks, each secure-only or non-secure,
    and routes every upstream access either to the memory or to a blocked
    sink. Routing decisions are exposed as an IOMMU-style translation with
    invalidation notifications on every lookup table change.

--*/

use crate::{PeriphError, StateError};
use caliptra_emu_bus::ReadWriteRegister;
use emulator_bus::{extract_subword, merge_subword, Bus, BusError, Irq, MmioRegion};
use emulator_consts::TARGET_PAGE_SIZE;
use emulator_types::{
    id_register, HwAddr, RvAddr, RvData, RvSize, TxAttrs, ID_REGS_LEN, ID_REGS_START,
};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_bitfields;

const MPC_REGS_SIZE: HwAddr = 0x1000;

const MPC_ID: [u8; ID_REGS_LEN] = [
    0x04, 0x00, 0x00, 0x00, 0x60, 0xb8, 0x1b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
];

register_bitfields! [
    u32,

    Ctrl [
        SEC_RESP OFFSET(0) NUMBITS(1) [],
        AUTOINC OFFSET(8) NUMBITS(1) [],
        LOCKDOWN OFFSET(31) NUMBITS(1) [],
    ],

    IntInfo2 [
        HMASTER OFFSET(0) NUMBITS(16) [],
        HNONSEC OFFSET(16) NUMBITS(1) [],
        CFG_NS OFFSET(17) NUMBITS(1) [],
    ],
];

const CTRL_WRITABLE: u32 = 0x8000_0101;
const CTRL_RESET: u32 = 0x100;

#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive)]
#[repr(u32)]
enum MpcReg {
    Ctrl = 0x00,
    BlkMax = 0x10,
    BlkCfg = 0x14,
    BlkIdx = 0x18,
    BlkLut = 0x1c,
    IntStat = 0x20,
    IntClear = 0x24,
    IntEn = 0x28,
    IntInfo1 = 0x2c,
    IntInfo2 = 0x30,
    IntSet = 0x34,
}

/// Which translation a transaction uses.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IommuIndex {
    Secure,
    NonSecure,
}

impl From<TxAttrs> for IommuIndex {
    fn from(attrs: TxAttrs) -> Self {
        if attrs.secure {
            IommuIndex::Secure
        } else {
            IommuIndex::NonSecure
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IommuTarget {
    Downstream,
    Blocked,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TranslationEntry {
    /// Block-aligned input address.
    pub iova: HwAddr,
    /// Low address bits passed through unchanged (block size - 1).
    pub addr_mask: HwAddr,
    pub target: IommuTarget,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IommuEventKind {
    /// Any cached translation for the range is stale.
    Unmap,
    /// The range now translates to this target.
    Map(IommuTarget),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IommuEvent {
    pub index: IommuIndex,
    pub kind: IommuEventKind,
    pub iova: HwAddr,
    pub addr_mask: HwAddr,
}

impl IommuEvent {
    pub fn range(&self) -> Range<HwAddr> {
        self.iova..self.iova + self.addr_mask + 1
    }
}

/// Consumer of MPC routing changes. Anything caching `TzMpc::translate`
/// results must subscribe.
pub trait IommuNotifier {
    fn notify(&self, event: &IommuEvent);
}

impl<F: Fn(&IommuEvent)> IommuNotifier for F {
    fn notify(&self, event: &IommuEvent) {
        self(event)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MpcConfig {
    pub block_size: u32,
    /// Report the blocks that change when `reset` clears the lookup table.
    pub notify_on_reset: bool,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            block_size: TARGET_PAGE_SIZE,
            notify_on_reset: false,
        }
    }
}

/// Guest-visible MPC state, for snapshots.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MpcState {
    pub ctrl: u32,
    pub blk_idx: u32,
    pub blk_lut: Vec<u32>,
    pub int_stat: bool,
    pub int_en: bool,
    pub int_info1: u32,
    pub int_info2: u32,
}

impl MpcState {
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }
}

struct MpcRegs {
    ctrl: ReadWriteRegister<u32, Ctrl::Register>,
    blk_idx: u32,
    blk_lut: Vec<u32>,
    int_stat: bool,
    int_en: bool,
    int_info1: u32,
    int_info2: ReadWriteRegister<u32, IntInfo2::Register>,
}

impl MpcRegs {
    fn new(blk_max: u32) -> Self {
        Self {
            ctrl: ReadWriteRegister::new(CTRL_RESET),
            blk_idx: 0,
            blk_lut: vec![0; blk_max as usize],
            int_stat: false,
            int_en: true,
            int_info1: 0,
            int_info2: ReadWriteRegister::new(0),
        }
    }

    fn irq_level(&self) -> bool {
        self.int_stat && self.int_en
    }
}

struct MpcInner {
    name: String,
    downstream: MmioRegion,
    block_size: u32,
    blk_max: u32,
    notify_on_reset: bool,
    regs: RefCell<MpcRegs>,
    irq: Irq,
    notifiers: RefCell<Vec<Box<dyn IommuNotifier>>>,
}

impl MpcInner {
    fn block_bit(&self, regs: &MpcRegs, addr: HwAddr) -> bool {
        let block = addr / self.block_size as HwAddr;
        let word = (block / 32) as usize;
        regs.blk_lut
            .get(word)
            .is_some_and(|lut| lut & (1 << (block % 32)) != 0)
    }

    fn translate(&self, addr: HwAddr, index: IommuIndex) -> TranslationEntry {
        let addr_mask = self.block_size as HwAddr - 1;
        let regs = self.regs.borrow();
        debug_assert!(regs.blk_idx < self.blk_max);
        let block_ns = self.block_bit(&regs, addr);
        let target = if block_ns == (index == IommuIndex::NonSecure) {
            IommuTarget::Downstream
        } else {
            IommuTarget::Blocked
        };
        TranslationEntry {
            iova: addr & !addr_mask,
            addr_mask,
            target,
        }
    }

    /// Events for the blocks of LUT word `word` whose bit differs between
    /// `old` and `new`.
    fn lut_change_events(&self, word: usize, old: u32, new: u32, events: &mut Vec<IommuEvent>) {
        let addr_mask = self.block_size as HwAddr - 1;
        let changed = old ^ new;
        for bit in (0..32u32).filter(|bit| changed & (1 << bit) != 0) {
            let block_ns = new & (1 << bit) != 0;
            let iova = (word as HwAddr * 32 + bit as HwAddr) * self.block_size as HwAddr;
            let event = |index, kind| IommuEvent {
                index,
                kind,
                iova,
                addr_mask,
            };
            let (secure_target, nonsecure_target) = if block_ns {
                (IommuTarget::Blocked, IommuTarget::Downstream)
            } else {
                (IommuTarget::Downstream, IommuTarget::Blocked)
            };
            events.extend([
                event(IommuIndex::Secure, IommuEventKind::Unmap),
                event(IommuIndex::NonSecure, IommuEventKind::Unmap),
                event(IommuIndex::Secure, IommuEventKind::Map(secure_target)),
                event(IommuIndex::NonSecure, IommuEventKind::Map(nonsecure_target)),
            ]);
        }
    }

    fn notify(&self, events: &[IommuEvent]) {
        if events.is_empty() {
            return;
        }
        let notifiers = self.notifiers.borrow();
        for event in events {
            log::trace!("{}: {:?}", self.name, event);
            for notifier in notifiers.iter() {
                notifier.notify(event);
            }
        }
    }

    fn autoinc(&self, regs: &mut MpcRegs, size: RvSize) {
        if size == RvSize::Word && regs.ctrl.reg.is_set(Ctrl::AUTOINC) {
            regs.blk_idx = (regs.blk_idx + 1) % self.blk_max;
        }
    }

    /// Current value of a register whose sub-word writes are merged.
    fn peek(&self, regs: &MpcRegs, reg: MpcReg) -> u32 {
        match reg {
            MpcReg::Ctrl => regs.ctrl.reg.get(),
            MpcReg::BlkIdx => regs.blk_idx,
            MpcReg::BlkLut => {
                debug_assert!(regs.blk_idx < self.blk_max);
                regs.blk_lut[regs.blk_idx as usize]
            }
            _ => 0,
        }
    }

    fn reg_read(&self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> RvData {
        let offset = addr & !3;
        if !attrs.secure && offset < ID_REGS_START {
            // Non-secure software only sees the ID registers.
            return 0;
        }
        let mut regs = self.regs.borrow_mut();
        let value = if let Some(id) = id_register(&MPC_ID, offset) {
            id
        } else {
            match MpcReg::try_from(offset) {
                Ok(MpcReg::Ctrl) => regs.ctrl.reg.get(),
                Ok(MpcReg::BlkMax) => self.blk_max - 1,
                Ok(MpcReg::BlkCfg) => self.block_size.trailing_zeros() - 5,
                Ok(MpcReg::BlkIdx) => regs.blk_idx,
                Ok(MpcReg::BlkLut) => {
                    debug_assert!(regs.blk_idx < self.blk_max);
                    let value = regs.blk_lut[regs.blk_idx as usize];
                    self.autoinc(&mut regs, size);
                    value
                }
                Ok(MpcReg::IntStat) => regs.int_stat as u32,
                Ok(MpcReg::IntEn) => regs.int_en as u32,
                Ok(MpcReg::IntInfo1) => regs.int_info1,
                Ok(MpcReg::IntInfo2) => regs.int_info2.reg.get(),
                Ok(reg @ (MpcReg::IntClear | MpcReg::IntSet)) => {
                    log::warn!("{}: read of write-only register {reg:?}", self.name);
                    0
                }
                Err(_) => {
                    log::warn!("{}: read of bad offset 0x{offset:x}", self.name);
                    0
                }
            }
        };
        log::trace!("{}: read 0x{offset:x} -> 0x{value:x}", self.name);
        extract_subword(value, size, addr)
    }

    fn reg_write(&self, size: RvSize, addr: RvAddr, val: RvData, attrs: TxAttrs) {
        let offset = addr & !3;
        let reg = MpcReg::try_from(offset).ok();
        let mut regs = self.regs.borrow_mut();
        let value = match (size, reg) {
            (RvSize::Word, _) => val,
            (_, Some(reg @ (MpcReg::Ctrl | MpcReg::BlkIdx | MpcReg::BlkLut))) => {
                merge_subword(self.peek(&regs, reg), size, addr, val)
            }
            _ => (val & size.mask()) << ((addr & 3) * 8),
        };
        if !attrs.secure && offset < ID_REGS_START {
            return;
        }
        log::trace!("{}: write 0x{offset:x} <- 0x{value:x}", self.name);

        let locked = regs.ctrl.reg.is_set(Ctrl::LOCKDOWN);
        let mut events = Vec::new();
        let mut update_irq = false;
        match reg {
            Some(reg @ (MpcReg::Ctrl | MpcReg::BlkLut | MpcReg::IntEn)) if locked => {
                log::warn!("{}: write to {reg:?} ignored, controller is locked down", self.name);
            }
            Some(MpcReg::Ctrl) => regs.ctrl.reg.set(value & CTRL_WRITABLE),
            Some(MpcReg::BlkIdx) => regs.blk_idx = value % self.blk_max,
            Some(MpcReg::BlkLut) => {
                debug_assert!(regs.blk_idx < self.blk_max);
                let idx = regs.blk_idx as usize;
                self.lut_change_events(idx, regs.blk_lut[idx], value, &mut events);
                regs.blk_lut[idx] = value;
                self.autoinc(&mut regs, size);
            }
            Some(MpcReg::IntClear) => {
                if value & 1 != 0 {
                    regs.int_stat = false;
                }
                update_irq = true;
            }
            Some(MpcReg::IntEn) => {
                regs.int_en = value & 1 != 0;
                update_irq = true;
            }
            Some(MpcReg::IntSet) => {
                if value & 1 != 0 {
                    regs.int_stat = true;
                }
                update_irq = true;
            }
            Some(
                reg @ (MpcReg::BlkMax
                | MpcReg::BlkCfg
                | MpcReg::IntStat
                | MpcReg::IntInfo1
                | MpcReg::IntInfo2),
            ) => {
                log::warn!("{}: write to read-only register {reg:?}", self.name);
            }
            None if offset >= ID_REGS_START => {
                log::warn!("{}: write to read-only ID register 0x{offset:x}", self.name);
            }
            None => {
                log::warn!("{}: write to bad offset 0x{offset:x}", self.name);
            }
        }
        let level = regs.irq_level();
        drop(regs);
        if update_irq {
            self.irq.set_level(level);
        }
        self.notify(&events);
    }

    /// Record a blocked transaction. Only the first one after the interrupt
    /// is cleared is captured in INT_INFO1/2.
    fn handle_block(&self, addr: RvAddr, attrs: TxAttrs, is_write: bool) -> Result<(), BusError> {
        log::debug!(
            "{}: blocked {} at 0x{addr:x} (secure={}, requester={})",
            self.name,
            if is_write { "write" } else { "read" },
            attrs.secure,
            attrs.requester_id
        );
        let (captured, level, bus_error) = {
            let mut regs = self.regs.borrow_mut();
            let captured = !regs.int_stat;
            if captured {
                let cfg_ns = self.block_bit(&regs, addr as HwAddr);
                regs.int_info1 = addr;
                regs.int_info2.reg.write(
                    IntInfo2::HMASTER.val(attrs.requester_id as u32)
                        + IntInfo2::HNONSEC.val(!attrs.secure as u32)
                        + IntInfo2::CFG_NS.val(cfg_ns as u32),
                );
                regs.int_stat = true;
            }
            (
                captured,
                regs.irq_level(),
                regs.ctrl.reg.is_set(Ctrl::SEC_RESP),
            )
        };
        if captured {
            self.irq.set_level(level);
        }
        if bus_error {
            Err(BusError::access_fault(is_write))
        } else {
            Ok(())
        }
    }
}

struct MpcRegBlock {
    mpc: Rc<MpcInner>,
}

impl Bus for MpcRegBlock {
    fn read(&mut self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> Result<RvData, BusError> {
        if size == RvSize::Invalid || addr % size.bytes() != 0 {
            return Err(BusError::LoadAddrMisaligned);
        }
        Ok(self.mpc.reg_read(size, addr, attrs))
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
        self.mpc.reg_write(size, addr, val, attrs);
        Ok(())
    }
}

/// The protected face of the downstream memory.
struct MpcUpstream {
    mpc: Rc<MpcInner>,
}

impl Bus for MpcUpstream {
    fn read(&mut self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> Result<RvData, BusError> {
        match self.mpc.translate(addr as HwAddr, attrs.into()).target {
            IommuTarget::Downstream => self.mpc.downstream.read(size, addr, attrs),
            IommuTarget::Blocked => self.mpc.handle_block(addr, attrs, false).map(|_| 0),
        }
    }

    fn write(
        &mut self,
        size: RvSize,
        addr: RvAddr,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        match self.mpc.translate(addr as HwAddr, attrs.into()).target {
            IommuTarget::Downstream => self.mpc.downstream.write(size, addr, val, attrs),
            IommuTarget::Blocked => self.mpc.handle_block(addr, attrs, true),
        }
    }
}

#[derive(Clone)]
pub struct TzMpc {
    inner: Rc<MpcInner>,
}

impl TzMpc {
    pub fn new(name: &str, downstream: MmioRegion, config: MpcConfig) -> Result<Self, PeriphError> {
        let block_size = config.block_size;
        if !block_size.is_power_of_two() || block_size < TARGET_PAGE_SIZE {
            return Err(PeriphError::InvalidBlockSize {
                device: name.to_string(),
                block_size,
                min: TARGET_PAGE_SIZE,
            });
        }
        let size = downstream.size();
        if size == 0 || size % block_size as HwAddr != 0 {
            return Err(PeriphError::InvalidDownstreamSize {
                device: name.to_string(),
                size,
                block_size,
            });
        }
        let blocks = size / block_size as HwAddr;
        let blk_max = blocks.div_ceil(32) as u32;
        log::debug!(
            "{name}: {blocks} blocks of 0x{block_size:x} over {}",
            downstream.name()
        );
        Ok(Self {
            inner: Rc::new(MpcInner {
                name: name.to_string(),
                downstream,
                block_size,
                blk_max,
                notify_on_reset: config.notify_on_reset,
                regs: RefCell::new(MpcRegs::new(blk_max)),
                irq: Irq::new(),
                notifiers: RefCell::new(Vec::new()),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn block_size(&self) -> u32 {
        self.inner.block_size
    }

    /// Number of 32-bit lookup table words.
    pub fn blk_max(&self) -> u32 {
        self.inner.blk_max
    }

    /// Control register block.
    pub fn regs(&self) -> MmioRegion {
        MmioRegion::from_device(
            &format!("{}-regs", self.inner.name),
            MPC_REGS_SIZE,
            MpcRegBlock {
                mpc: self.inner.clone(),
            },
        )
    }

    /// Region to map in place of the downstream memory.
    pub fn upstream(&self) -> MmioRegion {
        MmioRegion::from_device(
            &self.inner.name,
            self.inner.downstream.size(),
            MpcUpstream {
                mpc: self.inner.clone(),
            },
        )
    }

    pub fn irq(&self) -> &Irq {
        &self.inner.irq
    }

    pub fn translate(&self, addr: HwAddr, index: IommuIndex) -> TranslationEntry {
        self.inner.translate(addr, index)
    }

    pub fn register_notifier(&self, notifier: impl IommuNotifier + 'static) {
        self.inner.notifiers.borrow_mut().push(Box::new(notifier));
    }

    pub fn reset(&self) {
        let mut events = Vec::new();
        {
            let mut regs = self.inner.regs.borrow_mut();
            if self.inner.notify_on_reset {
                for (word, &lut) in regs.blk_lut.iter().enumerate() {
                    self.inner.lut_change_events(word, lut, 0, &mut events);
                }
            }
            *regs = MpcRegs::new(self.inner.blk_max);
        }
        self.inner.irq.set_level(false);
        self.inner.notify(&events);
    }

    pub fn save_state(&self) -> MpcState {
        let regs = self.inner.regs.borrow();
        MpcState {
            ctrl: regs.ctrl.reg.get(),
            blk_idx: regs.blk_idx,
            blk_lut: regs.blk_lut.clone(),
            int_stat: regs.int_stat,
            int_en: regs.int_en,
            int_info1: regs.int_info1,
            int_info2: regs.int_info2.reg.get(),
        }
    }

    /// Load a snapshot. An inconsistent snapshot is rejected and leaves the
    /// current state untouched.
    pub fn restore_state(&self, state: MpcState) -> Result<(), StateError> {
        let blk_max = self.inner.blk_max;
        if state.blk_idx >= blk_max {
            return Err(StateError::BlockIndexOutOfRange {
                blk_idx: state.blk_idx,
                blk_max,
            });
        }
        if state.blk_lut.len() != blk_max as usize {
            return Err(StateError::LutLength {
                len: state.blk_lut.len(),
                expected: blk_max as usize,
            });
        }
        let level = {
            let mut regs = self.inner.regs.borrow_mut();
            regs.ctrl.reg.set(state.ctrl);
            regs.blk_idx = state.blk_idx;
            regs.blk_lut = state.blk_lut;
            regs.int_stat = state.int_stat;
            regs.int_en = state.int_en;
            regs.int_info1 = state.int_info1;
            regs.int_info2.reg.set(state.int_info2);
            regs.irq_level()
        };
        self.inner.irq.set_level(level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caliptra_emu_bus::Ram;
    use emulator_bus::{BusConverter, IrqLines};

    const CTRL: RvAddr = 0x00;
    const BLK_MAX: RvAddr = 0x10;
    const BLK_CFG: RvAddr = 0x14;
    const BLK_IDX: RvAddr = 0x18;
    const BLK_LUT: RvAddr = 0x1c;
    const INT_STAT: RvAddr = 0x20;
    const INT_CLEAR: RvAddr = 0x24;
    const INT_EN: RvAddr = 0x28;
    const INT_INFO1: RvAddr = 0x2c;
    const INT_INFO2: RvAddr = 0x30;
    const INT_SET: RvAddr = 0x34;

    const S: TxAttrs = TxAttrs::secure();
    const NS: TxAttrs = TxAttrs::nonsecure();

    fn memory(size: usize) -> MmioRegion {
        let data = (0..size).map(|i| (i / 4) as u8 ^ 0x5a).collect();
        MmioRegion::from_device(
            "mem",
            size as HwAddr,
            BusConverter::new(Box::new(Ram::new(data))),
        )
    }

    fn mpc(size: usize, block_size: u32) -> TzMpc {
        TzMpc::new(
            "mpc",
            memory(size),
            MpcConfig {
                block_size,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn read(regs: &MmioRegion, offset: RvAddr) -> RvData {
        regs.read(RvSize::Word, offset, S).unwrap()
    }

    fn write(regs: &MmioRegion, offset: RvAddr, val: RvData) {
        regs.write(RvSize::Word, offset, val, S).unwrap()
    }

    fn recorder(mpc: &TzMpc) -> Rc<RefCell<Vec<IommuEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        mpc.register_notifier(move |event: &IommuEvent| sink.borrow_mut().push(*event));
        events
    }

    #[test]
    fn test_configuration_checks() {
        let err = TzMpc::new("mpc", memory(0x1000), MpcConfig { block_size: 0x600, notify_on_reset: false });
        assert!(matches!(err, Err(PeriphError::InvalidBlockSize { .. })));
        let err = TzMpc::new("mpc", memory(0x1000), MpcConfig { block_size: 0x200, notify_on_reset: false });
        assert!(matches!(err, Err(PeriphError::InvalidBlockSize { .. })));
        let err = TzMpc::new("mpc", memory(0x1200), MpcConfig::default());
        assert!(matches!(err, Err(PeriphError::InvalidDownstreamSize { .. })));
        assert!(TzMpc::new("mpc", memory(0x1000), MpcConfig::default()).is_ok());
    }

    #[test]
    fn test_geometry_and_id_registers() {
        // 64 blocks -> two LUT words.
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        assert_eq!(mpc.blk_max(), 2);
        assert_eq!(read(&regs, BLK_MAX), 1);
        assert_eq!(read(&regs, BLK_CFG), 5);
        assert_eq!(read(&regs, CTRL), 0x100);
        assert_eq!(read(&regs, INT_EN), 1);
        let id: Vec<_> = (0..12).map(|n| read(&regs, 0xfd0 + n * 4)).collect();
        assert_eq!(
            id,
            vec![0x04, 0x00, 0x00, 0x00, 0x60, 0xb8, 0x1b, 0x00, 0x0d, 0xf0, 0x05, 0xb1]
        );
        // ID registers are visible to non-secure software, nothing else is.
        assert_eq!(regs.read(RvSize::Word, 0xfe0, NS), Ok(0x60));
        assert_eq!(regs.read(RvSize::Word, CTRL, NS), Ok(0));
        regs.write(RvSize::Word, CTRL, 0x8000_0000, NS).unwrap();
        assert_eq!(read(&regs, CTRL), 0x100);
    }

    #[test]
    fn test_translation_is_total_and_consistent() {
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        write(&regs, CTRL, 0);
        write(&regs, BLK_LUT, 0xa5a5_0f0f);
        write(&regs, BLK_IDX, 1);
        write(&regs, BLK_LUT, 0x8000_0001);
        let lut = [0xa5a5_0f0fu32, 0x8000_0001];
        for addr in (0..0x1_0000u64).step_by(0x100) {
            let block = addr / 0x400;
            let bit = lut[(block / 32) as usize] & (1 << (block % 32)) != 0;
            let secure = mpc.translate(addr, IommuIndex::Secure);
            let nonsecure = mpc.translate(addr, IommuIndex::NonSecure);
            assert_ne!(secure.target, nonsecure.target);
            let expect_ns = if bit { IommuTarget::Downstream } else { IommuTarget::Blocked };
            assert_eq!(nonsecure.target, expect_ns, "addr 0x{addr:x}");
            assert_eq!(secure.iova, addr & !0x3ff);
            assert_eq!(secure.addr_mask, 0x3ff);
        }
    }

    #[test]
    fn test_lut_round_trip_and_autoinc() {
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        // AUTOINC is set out of reset.
        write(&regs, BLK_LUT, 0x1111_1111);
        assert_eq!(read(&regs, BLK_IDX), 1);
        write(&regs, BLK_LUT, 0x2222_2222);
        assert_eq!(read(&regs, BLK_IDX), 0);
        assert_eq!(read(&regs, BLK_LUT), 0x1111_1111);
        assert_eq!(read(&regs, BLK_LUT), 0x2222_2222);
        assert_eq!(read(&regs, BLK_IDX), 0);

        write(&regs, CTRL, 0);
        write(&regs, BLK_LUT, 0x3333_3333);
        assert_eq!(read(&regs, BLK_IDX), 0);
        assert_eq!(read(&regs, BLK_LUT), 0x3333_3333);
        assert_eq!(read(&regs, BLK_IDX), 0);

        // Index writes wrap.
        write(&regs, BLK_IDX, 5);
        assert_eq!(read(&regs, BLK_IDX), 1);
    }

    #[test]
    fn test_block_index_stays_in_range() {
        // 96 blocks -> three LUT words.
        let mpc = mpc(0x1_8000, 0x400);
        let regs = mpc.regs();
        assert_eq!(mpc.blk_max(), 3);
        for value in [0, 2, 3, 4, 0xff, 0xffff_ffff] {
            write(&regs, BLK_IDX, value);
            let idx = read(&regs, BLK_IDX);
            assert_eq!(idx, value % 3);
            write(&regs, BLK_LUT, idx + 1);
            assert_eq!(mpc.save_state().blk_lut[idx as usize], idx + 1);
        }
        // Byte writes into the upper bytes wrap too.
        regs.write(RvSize::Byte, BLK_IDX + 3, 0x80, S).unwrap();
        assert!(read(&regs, BLK_IDX) < 3);

        // AUTOINC walks the LUT and wraps back to the first word.
        write(&regs, CTRL, 0x100);
        write(&regs, BLK_IDX, 0);
        for round in 0..7u32 {
            assert_eq!(read(&regs, BLK_IDX), round % 3);
            read(&regs, BLK_LUT);
        }
        assert_eq!(mpc.translate(0x1_7fff, IommuIndex::Secure).iova, 0x1_7c00);
    }

    #[test]
    fn test_subword_accesses() {
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        // Merged into the current value.
        regs.write(RvSize::Byte, CTRL, 0x01, S).unwrap();
        assert_eq!(read(&regs, CTRL), 0x101);
        write(&regs, BLK_LUT, 0xaabb_ccdd);
        write(&regs, BLK_IDX, 0);
        regs.write(RvSize::Byte, BLK_LUT + 1, 0x00, S).unwrap();
        // Sub-word accesses do not auto-increment.
        assert_eq!(read(&regs, BLK_IDX), 0);
        assert_eq!(regs.read(RvSize::HalfWord, BLK_LUT + 2, S), Ok(0xaabb));
        assert_eq!(read(&regs, BLK_IDX), 0);
        assert_eq!(read(&regs, BLK_LUT), 0xaabb_00dd);

        // Zero-extended into place: this clears INT_EN bit 0.
        regs.write(RvSize::Byte, INT_EN + 1, 0x01, S).unwrap();
        assert_eq!(read(&regs, INT_EN), 0);
        regs.write(RvSize::HalfWord, INT_EN, 0x01, S).unwrap();
        assert_eq!(read(&regs, INT_EN), 1);
    }

    #[test]
    fn test_lockdown() {
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        write(&regs, BLK_LUT, 0x0000_00ff);
        write(&regs, CTRL, 0x8000_0000);
        assert_eq!(read(&regs, CTRL), 0x8000_0000);

        write(&regs, CTRL, 0x101);
        write(&regs, BLK_IDX, 0);
        write(&regs, BLK_LUT, 0xffff_0000);
        write(&regs, INT_EN, 0);
        regs.write(RvSize::Byte, CTRL + 3, 0, S).unwrap();
        assert_eq!(read(&regs, CTRL), 0x8000_0000);
        assert_eq!(read(&regs, BLK_LUT), 0x0000_00ff);
        assert_eq!(read(&regs, INT_EN), 1);
        // BLK_IDX is not locked.
        write(&regs, BLK_IDX, 1);
        assert_eq!(read(&regs, BLK_IDX), 1);

        mpc.reset();
        write(&regs, INT_EN, 0);
        assert_eq!(read(&regs, INT_EN), 0);
        assert_eq!(read(&regs, CTRL), 0x100);
    }

    #[test]
    fn test_block_remap() {
        // Two 32 KiB blocks. Bit 1 set: block 0 secure-only, block 1 non-secure.
        let mpc = mpc(0x1_0000, 0x8000);
        let regs = mpc.regs();
        let upstream = mpc.upstream();
        let downstream_word = memory(0x1_0000).read(RvSize::Word, 0x8000, S).unwrap();
        write(&regs, BLK_LUT, 0b10);

        assert_eq!(upstream.read(RvSize::Word, 0x0000, NS), Ok(0));
        assert_eq!(read(&regs, INT_STAT), 1);
        assert_eq!(upstream.read(RvSize::Word, 0x8000, NS), Ok(downstream_word));
        assert_eq!(upstream.read(RvSize::Word, 0x0004, S), Ok(memory(0x1_0000).read(RvSize::Word, 4, S).unwrap()));
        assert_eq!(upstream.read(RvSize::Word, 0x8000, S), Ok(0));

        // The mirrored table swaps the two blocks.
        write(&regs, INT_CLEAR, 1);
        write(&regs, BLK_IDX, 0);
        write(&regs, BLK_LUT, 0b01);
        assert_eq!(upstream.read(RvSize::Word, 0x8000, NS), Ok(0));
        assert_ne!(upstream.read(RvSize::Word, 0x0000, NS), Ok(0));
        upstream.write(RvSize::Word, 0x8000, 0xdead_beef, NS).unwrap();
        assert_eq!(upstream.read(RvSize::Word, 0x8000, S), Ok(downstream_word));
    }

    #[test]
    fn test_first_fault_capture() {
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        let cpu = IrqLines::new(1);
        mpc.irq().connect(cpu.input(0));

        let first = TxAttrs::nonsecure().with_requester(3);
        let second = TxAttrs::nonsecure().with_requester(9);
        mpc.upstream().read(RvSize::Word, 0x124, first).unwrap();
        mpc.upstream().write(RvSize::Word, 0x800, 0, second).unwrap();
        assert!(cpu.level(0));
        assert_eq!(cpu.rising_edges(0), 1);
        assert_eq!(read(&regs, INT_INFO1), 0x124);
        assert_eq!(read(&regs, INT_INFO2), 3 | 1 << 16);

        write(&regs, INT_CLEAR, 1);
        assert!(!cpu.level(0));
        // Block 2 non-secure; a secure access to it is the next fault.
        write(&regs, BLK_IDX, 0);
        write(&regs, BLK_LUT, 0b100);
        mpc.upstream().read(RvSize::Word, 0x800, second.with_requester(9)).unwrap();
        mpc.upstream().read(RvSize::Word, 0x804, TxAttrs::secure().with_requester(5)).unwrap();
        assert_eq!(read(&regs, INT_INFO1), 0x804);
        assert_eq!(read(&regs, INT_INFO2), 5 | 1 << 17);
        assert_eq!(cpu.rising_edges(0), 2);
    }

    #[test]
    fn test_sec_resp_and_int_set() {
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        write(&regs, CTRL, 0x1);
        assert_eq!(
            mpc.upstream().read(RvSize::Word, 0, NS),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            mpc.upstream().write(RvSize::Word, 0, 0, NS),
            Err(BusError::StoreAccessFault)
        );

        write(&regs, INT_CLEAR, 1);
        write(&regs, INT_EN, 0);
        write(&regs, INT_SET, 1);
        assert_eq!(read(&regs, INT_STAT), 1);
        assert!(!mpc.irq().level());
        write(&regs, INT_EN, 1);
        assert!(mpc.irq().level());
        assert_eq!(read(&regs, INT_SET), 0);
        assert_eq!(read(&regs, INT_CLEAR), 0);
    }

    #[test]
    fn test_lut_write_notifications() {
        let mpc = mpc(0x1_0000, 0x400);
        let events = recorder(&mpc);
        let regs = mpc.regs();
        write(&regs, CTRL, 0);
        write(&regs, BLK_LUT, 0b1);
        write(&regs, BLK_LUT, 0b1);
        // Unchanged bits produce nothing.
        assert_eq!(events.borrow().len(), 4);
        let range = events.borrow()[0].range();
        assert_eq!(range, 0..0x400);
        let kinds: Vec<_> = events.borrow().iter().map(|e| (e.index, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (IommuIndex::Secure, IommuEventKind::Unmap),
                (IommuIndex::NonSecure, IommuEventKind::Unmap),
                (IommuIndex::Secure, IommuEventKind::Map(IommuTarget::Blocked)),
                (IommuIndex::NonSecure, IommuEventKind::Map(IommuTarget::Downstream)),
            ]
        );

        events.borrow_mut().clear();
        write(&regs, BLK_IDX, 1);
        write(&regs, BLK_LUT, 0x8000_0000);
        write(&regs, BLK_LUT, 0);
        let ranges: Vec<_> = events.borrow().iter().map(IommuEvent::range).collect();
        assert_eq!(ranges.len(), 8);
        assert!(ranges.iter().all(|r| *r == (0xfc00..0x1_0000)));
        assert_eq!(
            events.borrow()[7].kind,
            IommuEventKind::Map(IommuTarget::Blocked)
        );
    }

    #[test]
    fn test_reset_notifications_configurable() {
        for notify_on_reset in [false, true] {
            let mpc = TzMpc::new(
                "mpc",
                memory(0x1_0000),
                MpcConfig {
                    block_size: 0x400,
                    notify_on_reset,
                },
            )
            .unwrap();
            let regs = mpc.regs();
            write(&regs, BLK_LUT, 0b110);
            let events = recorder(&mpc);
            mpc.reset();
            assert_eq!(read(&regs, BLK_LUT), 0);
            let events = events.borrow();
            if notify_on_reset {
                let ranges: Vec<_> = events.iter().map(IommuEvent::range).collect();
                assert_eq!(ranges.len(), 8);
                assert_eq!(ranges[0], 0x400..0x800);
                assert_eq!(ranges[4], 0x800..0xc00);
                assert_eq!(
                    events[3].kind,
                    IommuEventKind::Map(IommuTarget::Blocked)
                );
            } else {
                assert!(events.is_empty());
            }
        }
    }

    #[test]
    fn test_state_save_and_restore() {
        let mpc = mpc(0x1_0000, 0x400);
        let regs = mpc.regs();
        write(&regs, BLK_LUT, 0xf0);
        write(&regs, INT_SET, 1);
        let json = mpc.save_state().to_json().unwrap();

        mpc.reset();
        assert!(!mpc.irq().level());
        mpc.restore_state(MpcState::from_json(&json).unwrap()).unwrap();
        assert!(mpc.irq().level());
        assert_eq!(read(&regs, BLK_IDX), 1);
        write(&regs, BLK_IDX, 0);
        assert_eq!(read(&regs, BLK_LUT), 0xf0);

        let mut bad = mpc.save_state();
        bad.blk_idx = 2;
        assert!(matches!(
            mpc.restore_state(bad),
            Err(StateError::BlockIndexOutOfRange { blk_idx: 2, blk_max: 2 })
        ));
        let mut bad = mpc.save_state();
        bad.blk_lut.push(0);
        assert!(matches!(
            mpc.restore_state(bad),
            Err(StateError::LutLength { len: 3, expected: 2 })
        ));
        assert!(matches!(
            MpcState::from_json("{\"ctrl\": 1}"),
            Err(StateError::Json(_))
        ));
        // Rejected snapshots leave the state alone.
        write(&regs, BLK_IDX, 0);
        assert_eq!(read(&regs, BLK_LUT), 0xf0);
    }
}
