/*++

Licensed under the Apache-2.0 license.

File Name:

    memory.rs

Abstract:

    File contains the address-space region graph: MMIO regions, aliases and
    priority-ordered containers, and the lookup that routes a transaction to
    the device that owns an address.

--*/

use crate::{Bus, BusError};
use emulator_types::{HwAddr, RvAddr, RvData, RvSize, TxAttrs};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum MapError {
    #[error("region '{0}' is not a container")]
    NotAContainer(String),
    #[error("region '{0}' is not an alias")]
    NotAnAlias(String),
    #[error("region '{0}' is already mapped")]
    AlreadyMapped(String),
    #[error("region '{region}' at 0x{base:x} (size 0x{size:x}) does not fit in '{container}'")]
    OutOfBounds {
        region: String,
        base: HwAddr,
        size: HwAddr,
        container: String,
    },
    #[error("regions '{first}' and '{second}' overlap in '{container}' at the same priority {priority}")]
    PriorityTie {
        container: String,
        first: String,
        second: String,
        priority: i32,
    },
    #[error("alias '{alias}' window 0x{offset:x}+0x{size:x} exceeds target '{target}'")]
    AliasOutOfBounds {
        alias: String,
        offset: HwAddr,
        size: HwAddr,
        target: String,
    },
}

/// A primary region: a device (register file, RAM, protection controller
/// port) that terminates address lookup.
#[derive(Clone)]
pub struct MmioRegion {
    name: Rc<str>,
    size: HwAddr,
    bus: Rc<RefCell<dyn Bus>>,
}

impl MmioRegion {
    pub fn new(name: &str, size: HwAddr, bus: Rc<RefCell<dyn Bus>>) -> Self {
        Self {
            name: name.into(),
            size,
            bus,
        }
    }

    pub fn from_device<B: Bus + 'static>(name: &str, size: HwAddr, device: B) -> Self {
        Self::new(name, size, Rc::new(RefCell::new(device)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> HwAddr {
        self.size
    }

    fn fits(&self, size: RvSize, addr: RvAddr) -> bool {
        addr as HwAddr + size.bytes() as HwAddr <= self.size
    }

    pub fn read(&self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> Result<RvData, BusError> {
        if !self.fits(size, addr) {
            return Err(BusError::LoadAccessFault);
        }
        self.bus.borrow_mut().read(size, addr, attrs)
    }

    pub fn write(
        &self,
        size: RvSize,
        addr: RvAddr,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        if !self.fits(size, addr) {
            return Err(BusError::StoreAccessFault);
        }
        self.bus.borrow_mut().write(size, addr, val, attrs)
    }

    pub fn poll(&self) {
        self.bus.borrow_mut().poll();
    }

    pub fn warm_reset(&self) {
        self.bus.borrow_mut().warm_reset();
    }
}

impl fmt::Debug for MmioRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmioRegion")
            .field("name", &self.name)
            .field("size", &format_args!("0x{:x}", self.size))
            .finish()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RegionId(usize);

struct Subregion {
    region: RegionId,
    base: HwAddr,
    priority: i32,
}

enum RegionKind {
    Mmio(MmioRegion),
    Alias { target: RegionId, offset: HwAddr },
    Container { subregions: Vec<Subregion> },
}

struct RegionNode {
    name: String,
    size: HwAddr,
    kind: RegionKind,
    mapped: bool,
}

/// One entry of a flattened address map.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FlatRange {
    pub start: HwAddr,
    /// Exclusive.
    pub end: HwAddr,
    pub region: String,
    /// Offset inside `region` that `start` maps to.
    pub offset: HwAddr,
}

impl fmt::Display for FlatRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:08x} {} @{:08x}",
            self.start,
            self.end - 1,
            self.region,
            self.offset
        )
    }
}

/// Arena of regions making up one or more address spaces.
///
/// Inside a container the covering subregion with the highest priority owns
/// an address. When that subregion has nothing at the address (a container
/// hole, or an alias onto one) the lookup falls through to the next priority.
/// Overlapping subregions of equal priority are rejected when mapped.
#[derive(Default)]
pub struct AddressMap {
    regions: Vec<RegionNode>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: &str, size: HwAddr, kind: RegionKind) -> RegionId {
        self.regions.push(RegionNode {
            name: name.to_string(),
            size,
            kind,
            mapped: false,
        });
        RegionId(self.regions.len() - 1)
    }

    fn node(&self, id: RegionId) -> &RegionNode {
        &self.regions[id.0]
    }

    pub fn add_container(&mut self, name: &str, size: HwAddr) -> RegionId {
        self.push(
            name,
            size,
            RegionKind::Container {
                subregions: Vec::new(),
            },
        )
    }

    pub fn add_mmio(&mut self, region: MmioRegion) -> RegionId {
        let name = region.name().to_string();
        let size = region.size();
        self.push(&name, size, RegionKind::Mmio(region))
    }

    /// Create an alias exposing `target[offset..offset + size]`.
    pub fn add_alias(
        &mut self,
        name: &str,
        target: RegionId,
        offset: HwAddr,
        size: HwAddr,
    ) -> Result<RegionId, MapError> {
        self.check_alias_window(name, target, offset, size)?;
        Ok(self.push(name, size, RegionKind::Alias { target, offset }))
    }

    fn check_alias_window(
        &self,
        name: &str,
        target: RegionId,
        offset: HwAddr,
        size: HwAddr,
    ) -> Result<(), MapError> {
        let target_node = self.node(target);
        match offset.checked_add(size) {
            Some(end) if end <= target_node.size => Ok(()),
            _ => Err(MapError::AliasOutOfBounds {
                alias: name.to_string(),
                offset,
                size,
                target: target_node.name.clone(),
            }),
        }
    }

    /// Move the window of an existing alias. The size stays fixed.
    pub fn set_alias_offset(&mut self, alias: RegionId, new_offset: HwAddr) -> Result<(), MapError> {
        let node = self.node(alias);
        let RegionKind::Alias { target, .. } = node.kind else {
            return Err(MapError::NotAnAlias(node.name.clone()));
        };
        self.check_alias_window(&node.name.clone(), target, new_offset, node.size)?;
        if let RegionKind::Alias { offset, .. } = &mut self.regions[alias.0].kind {
            *offset = new_offset;
        }
        Ok(())
    }

    /// Place `region` inside `container` at `base`.
    pub fn map(
        &mut self,
        container: RegionId,
        base: HwAddr,
        region: RegionId,
        priority: i32,
    ) -> Result<(), MapError> {
        let container_node = self.node(container);
        let RegionKind::Container { subregions } = &container_node.kind else {
            return Err(MapError::NotAContainer(container_node.name.clone()));
        };
        let region_node = self.node(region);
        if region_node.mapped || region == container {
            return Err(MapError::AlreadyMapped(region_node.name.clone()));
        }
        let size = region_node.size;
        if !matches!(base.checked_add(size), Some(end) if end <= container_node.size) {
            return Err(MapError::OutOfBounds {
                region: region_node.name.clone(),
                base,
                size,
                container: container_node.name.clone(),
            });
        }
        if let Some(other) = subregions.iter().find(|sub| {
            sub.priority == priority
                && base < sub.base + self.node(sub.region).size
                && sub.base < base + size
        }) {
            return Err(MapError::PriorityTie {
                container: container_node.name.clone(),
                first: self.node(other.region).name.clone(),
                second: region_node.name.clone(),
                priority,
            });
        }

        self.regions[region.0].mapped = true;
        if let RegionKind::Container { subregions } = &mut self.regions[container.0].kind {
            subregions.push(Subregion {
                region,
                base,
                priority,
            });
            // Highest priority first; stable so equal priorities keep map order.
            subregions.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        Ok(())
    }

    pub fn name(&self, id: RegionId) -> &str {
        &self.node(id).name
    }

    pub fn size(&self, id: RegionId) -> HwAddr {
        self.node(id).size
    }

    /// Find the MMIO region owning `addr` in the space rooted at `root`, and
    /// the offset of `addr` inside it.
    pub fn resolve(&self, root: RegionId, addr: HwAddr) -> Option<(&MmioRegion, HwAddr)> {
        let node = self.node(root);
        if addr >= node.size {
            return None;
        }
        match &node.kind {
            RegionKind::Mmio(region) => Some((region, addr)),
            RegionKind::Alias { target, offset } => self.resolve(*target, addr + offset),
            RegionKind::Container { subregions } => subregions
                .iter()
                .filter(|sub| addr >= sub.base && addr - sub.base < self.node(sub.region).size)
                .find_map(|sub| self.resolve(sub.region, addr - sub.base)),
        }
    }

    pub fn read(
        &self,
        root: RegionId,
        size: RvSize,
        addr: HwAddr,
        attrs: TxAttrs,
    ) -> Result<RvData, BusError> {
        match self.resolve(root, addr) {
            Some((region, offset)) => region.read(size, offset as RvAddr, attrs),
            None => {
                log::warn!("{}: read of unassigned address 0x{addr:x}", self.name(root));
                Err(BusError::LoadAccessFault)
            }
        }
    }

    pub fn write(
        &self,
        root: RegionId,
        size: RvSize,
        addr: HwAddr,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        match self.resolve(root, addr) {
            Some((region, offset)) => region.write(size, offset as RvAddr, val, attrs),
            None => {
                log::warn!("{}: write of unassigned address 0x{addr:x}", self.name(root));
                Err(BusError::StoreAccessFault)
            }
        }
    }

    /// Render the space rooted at `root` into non-overlapping ranges, sorted
    /// by address.
    pub fn flatten(&self, root: RegionId) -> Vec<FlatRange> {
        let mut out = Vec::new();
        self.render(root, 0, 0, self.size(root), &mut out);
        out
    }

    fn render(&self, id: RegionId, base: i128, lo: HwAddr, hi: HwAddr, out: &mut Vec<FlatRange>) {
        let node = self.node(id);
        let clamp = |v: i128| v.clamp(0, HwAddr::MAX as i128) as HwAddr;
        let start = lo.max(clamp(base));
        let end = hi.min(clamp(base + node.size as i128));
        if start >= end {
            return;
        }
        match &node.kind {
            RegionKind::Mmio(region) => insert_uncovered(out, start, end, region.name(), base),
            RegionKind::Alias { target, offset } => {
                self.render(*target, base - *offset as i128, start, end, out)
            }
            RegionKind::Container { subregions } => {
                for sub in subregions {
                    self.render(sub.region, base + sub.base as i128, start, end, out);
                }
            }
        }
    }
}

/// Add the parts of `[start, end)` not already claimed by a higher-priority
/// range.
fn insert_uncovered(out: &mut Vec<FlatRange>, start: HwAddr, end: HwAddr, name: &str, base: i128) {
    let mut pieces = Vec::new();
    let mut cur = start;
    for range in out.iter().filter(|r| r.end > start && r.start < end) {
        if range.start > cur {
            pieces.push((cur, range.start));
        }
        cur = cur.max(range.end);
        if cur >= end {
            break;
        }
    }
    if cur < end {
        pieces.push((cur, end));
    }
    out.extend(pieces.into_iter().map(|(s, e)| FlatRange {
        start: s,
        end: e,
        region: name.to_string(),
        offset: (s as i128 - base) as HwAddr,
    }));
    out.sort_by_key(|r| r.start);
}
