/*++

Licensed under the Apache-2.0 license.

File Name:

    tz_ppc.rs

Abstract:

    File contains the TrustZone Peripheral Protection Controller. The PPC sits
    in front of up to 16 downstream devices and gates each transaction on its
    security and privilege attributes. It has no register interface; all of
    its configuration arrives on signal lines.

--*/

use crate::PeriphError;
use emulator_bus::{Bus, BusError, Irq, IrqIn, MmioRegion};
use emulator_types::{HwAddr, RvAddr, RvData, RvSize, TxAttrs};
use std::cell::RefCell;
use std::rc::Rc;

pub const TZ_NUM_PORTS: usize = 16;

/// Size of the placeholder upstream region of an unbound port.
const UNBOUND_PORT_SIZE: HwAddr = 0x1_0000;

/// Response to a blocked transaction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SecResp {
    /// Reads return zero, writes are dropped.
    #[default]
    RazWi,
    BusError,
}

impl From<bool> for SecResp {
    /// The level of the `cfg_sec_resp` line.
    fn from(level: bool) -> Self {
        if level {
            SecResp::BusError
        } else {
            SecResp::RazWi
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PortAttribute {
    NonSecure,
    PrivilegedOk,
}

/// A PPC being configured. Ports are bound here; `realize` fixes the port
/// set and produces the working controller.
pub struct TzPpc {
    name: String,
    nonsec_mask: u16,
    ports: [Option<MmioRegion>; TZ_NUM_PORTS],
}

impl TzPpc {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nonsec_mask: 0,
            ports: std::array::from_fn(|_| None),
        }
    }

    /// Ports whose bit is set skip the security check. Privilege is still
    /// checked.
    pub fn set_nonsec_mask(&mut self, mask: u16) {
        self.nonsec_mask = mask;
    }

    pub fn bind(&mut self, port: usize, downstream: MmioRegion) -> Result<(), PeriphError> {
        let slot = self
            .ports
            .get_mut(port)
            .ok_or_else(|| PeriphError::PortOutOfRange {
                device: self.name.clone(),
                port,
                max: TZ_NUM_PORTS,
            })?;
        if slot.is_some() {
            return Err(PeriphError::PortAlreadyBound {
                device: self.name.clone(),
                port,
            });
        }
        log::debug!("{}: port {port} -> {}", self.name, downstream.name());
        *slot = Some(downstream);
        Ok(())
    }

    pub fn realize(self) -> Result<Ppc, PeriphError> {
        let bound = self
            .ports
            .iter()
            .enumerate()
            .filter(|(_, port)| port.is_some())
            .fold(0u32, |mask, (port, _)| mask | 1 << port);
        let num_ports = self
            .ports
            .iter()
            .rposition(Option::is_some)
            .map(|last| last + 1)
            .ok_or_else(|| PeriphError::NoPortsBound {
                device: self.name.clone(),
            })?;

        let inner = Rc::new(PpcInner {
            name: self.name,
            nonsec_mask: self.nonsec_mask,
            num_ports,
            state: RefCell::new(PpcState::default()),
            irq: Irq::new(),
        });
        let upstream = self
            .ports
            .into_iter()
            .take(num_ports)
            .enumerate()
            .map(|(port, downstream)| {
                let size = downstream
                    .as_ref()
                    .map_or(UNBOUND_PORT_SIZE, MmioRegion::size);
                let name = format!("{}-port{port}", inner.name);
                MmioRegion::from_device(
                    &name,
                    size,
                    PpcPort {
                        ppc: inner.clone(),
                        port,
                        downstream,
                    },
                )
            })
            .collect();
        Ok(Ppc {
            inner,
            upstream,
            bound,
        })
    }
}

#[derive(Default)]
struct PpcState {
    cfg_nonsec: [bool; TZ_NUM_PORTS],
    cfg_ap: [bool; TZ_NUM_PORTS],
    sec_resp: SecResp,
    irq_enable: bool,
    irq_clear: bool,
    irq_status: bool,
}

struct PpcInner {
    name: String,
    nonsec_mask: u16,
    num_ports: usize,
    state: RefCell<PpcState>,
    irq: Irq,
}

impl PpcInner {
    fn is_blocked(&self, port: usize, attrs: TxAttrs) -> bool {
        let state = self.state.borrow();
        let sec_exempt = self.nonsec_mask & (1 << port) != 0;
        (!sec_exempt && attrs.secure == state.cfg_nonsec[port])
            || (!attrs.privileged && !state.cfg_ap[port])
    }

    fn block(&self, port: usize, addr: RvAddr, attrs: TxAttrs, is_write: bool) -> Result<(), BusError> {
        log::debug!(
            "{}: blocked {} of port {port} offset 0x{addr:x} (secure={}, privileged={})",
            self.name,
            if is_write { "write" } else { "read" },
            attrs.secure,
            attrs.privileged
        );
        let sec_resp = {
            let mut state = self.state.borrow_mut();
            if !state.irq_clear {
                state.irq_status = true;
            }
            state.sec_resp
        };
        self.update_irq();
        match sec_resp {
            SecResp::BusError => Err(BusError::access_fault(is_write)),
            SecResp::RazWi => Ok(()),
        }
    }

    fn update_irq(&self) {
        let level = {
            let state = self.state.borrow();
            state.irq_status && state.irq_enable
        };
        self.irq.set_level(level);
    }

    fn set_port_attribute(&self, port: usize, attr: PortAttribute, value: bool) {
        let mut state = self.state.borrow_mut();
        match attr {
            PortAttribute::NonSecure => state.cfg_nonsec[port] = value,
            PortAttribute::PrivilegedOk => state.cfg_ap[port] = value,
        }
    }

    fn set_irq_enable(&self, level: bool) {
        self.state.borrow_mut().irq_enable = level;
        self.update_irq();
    }

    fn set_irq_clear(&self, level: bool) {
        {
            let mut state = self.state.borrow_mut();
            state.irq_clear = level;
            if level {
                state.irq_status = false;
            }
        }
        self.update_irq();
    }
}

/// Upstream face of one port.
struct PpcPort {
    ppc: Rc<PpcInner>,
    port: usize,
    downstream: Option<MmioRegion>,
}

impl PpcPort {
    fn downstream(&self) -> &MmioRegion {
        match &self.downstream {
            Some(region) => region,
            None => unreachable!("{}: access to unbound port {}", self.ppc.name, self.port),
        }
    }
}

impl Bus for PpcPort {
    fn read(&mut self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> Result<RvData, BusError> {
        let downstream = self.downstream();
        if self.ppc.is_blocked(self.port, attrs) {
            return self.ppc.block(self.port, addr, attrs, false).map(|_| 0);
        }
        downstream.read(size, addr, attrs)
    }

    fn write(
        &mut self,
        size: RvSize,
        addr: RvAddr,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        let downstream = self.downstream();
        if self.ppc.is_blocked(self.port, attrs) {
            return self.ppc.block(self.port, addr, attrs, true);
        }
        downstream.write(size, addr, val, attrs)
    }

    fn poll(&mut self) {
        if let Some(downstream) = &self.downstream {
            downstream.poll();
        }
    }
}

/// A realized PPC.
#[derive(Clone)]
pub struct Ppc {
    inner: Rc<PpcInner>,
    upstream: Vec<MmioRegion>,
    bound: u32,
}

impl Ppc {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Highest bound port + 1.
    pub fn num_ports(&self) -> usize {
        self.inner.num_ports
    }

    /// Region to map into the address space in place of the device bound at
    /// `port`.
    pub fn upstream(&self, port: usize) -> Option<&MmioRegion> {
        self.upstream.get(port)
    }

    pub fn is_bound(&self, port: usize) -> bool {
        self.bound & (1 << port) != 0
    }

    pub fn set_port_attribute(&self, port: usize, attr: PortAttribute, value: bool) {
        self.inner.set_port_attribute(port, attr, value);
    }

    pub fn port_attribute(&self, port: usize, attr: PortAttribute) -> bool {
        let state = self.inner.state.borrow();
        match attr {
            PortAttribute::NonSecure => state.cfg_nonsec[port],
            PortAttribute::PrivilegedOk => state.cfg_ap[port],
        }
    }

    pub fn set_sec_resp(&self, sec_resp: SecResp) {
        self.inner.state.borrow_mut().sec_resp = sec_resp;
    }

    pub fn sec_resp(&self) -> SecResp {
        self.inner.state.borrow().sec_resp
    }

    pub fn set_irq_enable(&self, level: bool) {
        self.inner.set_irq_enable(level);
    }

    /// While `level` is high the interrupt status is held clear and blocked
    /// transactions do not latch it.
    pub fn set_irq_clear(&self, level: bool) {
        self.inner.set_irq_clear(level);
    }

    pub fn irq_status(&self) -> bool {
        self.inner.state.borrow().irq_status
    }

    pub fn irq(&self) -> &Irq {
        &self.inner.irq
    }

    pub fn cfg_nonsec_in(&self, port: usize) -> IrqIn {
        self.attribute_in(port, PortAttribute::NonSecure)
    }

    pub fn cfg_ap_in(&self, port: usize) -> IrqIn {
        self.attribute_in(port, PortAttribute::PrivilegedOk)
    }

    fn attribute_in(&self, port: usize, attr: PortAttribute) -> IrqIn {
        assert!(port < TZ_NUM_PORTS, "{}: no port {port}", self.name());
        let inner = self.inner.clone();
        IrqIn::new(move |level| inner.set_port_attribute(port, attr, level))
    }

    pub fn cfg_sec_resp_in(&self) -> IrqIn {
        let inner = self.inner.clone();
        IrqIn::new(move |level| inner.state.borrow_mut().sec_resp = SecResp::from(level))
    }

    pub fn irq_enable_in(&self) -> IrqIn {
        let inner = self.inner.clone();
        IrqIn::new(move |level| inner.set_irq_enable(level))
    }

    pub fn irq_clear_in(&self) -> IrqIn {
        let inner = self.inner.clone();
        IrqIn::new(move |level| inner.set_irq_clear(level))
    }

    /// Clears the interrupt status and every port attribute, and selects
    /// RAZ/WI. The enable and clear inputs keep their levels.
    pub fn reset(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.irq_status = false;
            state.cfg_nonsec = [false; TZ_NUM_PORTS];
            state.cfg_ap = [false; TZ_NUM_PORTS];
            state.sec_resp = SecResp::RazWi;
        }
        self.inner.update_irq();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caliptra_emu_bus::Ram;
    use emulator_bus::{BusConverter, IrqLines};

    const DATA: RvData = 0x1234_5678;

    fn downstream(name: &str) -> MmioRegion {
        let ram = Ram::new(DATA.to_le_bytes().repeat(0x40));
        MmioRegion::from_device(name, 0x100, BusConverter::new(Box::new(ram)))
    }

    fn ppc_with_ports(ports: &[usize], nonsec_mask: u16) -> Ppc {
        let mut ppc = TzPpc::new("ppc");
        ppc.set_nonsec_mask(nonsec_mask);
        for &port in ports {
            ppc.bind(port, downstream(&format!("dev{port}"))).unwrap();
        }
        ppc.realize().unwrap()
    }

    fn attrs(secure: bool, privileged: bool) -> TxAttrs {
        TxAttrs {
            secure,
            privileged,
            requester_id: 0,
        }
    }

    #[test]
    fn test_bind_errors() {
        let mut ppc = TzPpc::new("ppc");
        assert_eq!(
            ppc.bind(16, downstream("dev")),
            Err(PeriphError::PortOutOfRange {
                device: "ppc".into(),
                port: 16,
                max: 16
            })
        );
        ppc.bind(2, downstream("dev")).unwrap();
        assert_eq!(
            ppc.bind(2, downstream("dev")),
            Err(PeriphError::PortAlreadyBound {
                device: "ppc".into(),
                port: 2
            })
        );
        assert!(matches!(
            TzPpc::new("empty").realize(),
            Err(PeriphError::NoPortsBound { .. })
        ));
    }

    #[test]
    fn test_port_count_from_highest_bound_port() {
        let ppc = ppc_with_ports(&[0, 3], 0);
        assert_eq!(ppc.num_ports(), 4);
        assert_eq!(ppc.upstream(3).unwrap().size(), 0x100);
        assert_eq!(ppc.upstream(1).unwrap().size(), UNBOUND_PORT_SIZE);
        assert!(ppc.upstream(4).is_none());
        assert!(ppc.is_bound(3));
        assert!(!ppc.is_bound(1));
    }

    #[test]
    #[should_panic(expected = "unbound port 1")]
    fn test_unbound_port_access_is_unreachable() {
        let ppc = ppc_with_ports(&[0, 2], 0);
        let _ = ppc.upstream(1).unwrap().read(RvSize::Word, 0, TxAttrs::secure());
    }

    #[test]
    fn test_block_rule_exhaustive() {
        let all_ports: Vec<usize> = (0..TZ_NUM_PORTS).collect();
        // Even ports are exempt from the security check.
        for nonsec_mask in [0, 0x5555u16] {
            let ppc = ppc_with_ports(&all_ports, nonsec_mask);
            let cpu = IrqLines::new(1);
            ppc.irq().connect(cpu.input(0));
            ppc.set_irq_enable(true);
            ppc.set_sec_resp(SecResp::BusError);
            for port in 0..TZ_NUM_PORTS {
                let exempt = nonsec_mask & (1 << port) != 0;
                for bits in 0..16u32 {
                    let port_nonsec = bits & 1 != 0;
                    let port_ap = bits & 2 != 0;
                    let secure = bits & 4 != 0;
                    let privileged = bits & 8 != 0;
                    let case = format!("mask {nonsec_mask:04x} port {port} bits {bits:04b}");

                    ppc.set_port_attribute(port, PortAttribute::NonSecure, port_nonsec);
                    ppc.set_port_attribute(port, PortAttribute::PrivilegedOk, port_ap);
                    ppc.set_irq_clear(true);
                    ppc.set_irq_clear(false);
                    assert!(!cpu.level(0), "{case}");

                    let expect_blocked =
                        (!exempt && secure == port_nonsec) || (!privileged && !port_ap);
                    let upstream = ppc.upstream(port).unwrap();
                    let result = upstream.read(RvSize::Word, 0, attrs(secure, privileged));
                    if expect_blocked {
                        assert_eq!(result, Err(BusError::LoadAccessFault), "{case}");
                    } else {
                        assert_eq!(result, Ok(DATA), "{case}");
                    }
                    assert_eq!(ppc.irq_status(), expect_blocked, "{case}");
                    assert_eq!(cpu.level(0), expect_blocked, "{case}");
                }
                ppc.set_port_attribute(port, PortAttribute::NonSecure, false);
                ppc.set_port_attribute(port, PortAttribute::PrivilegedOk, false);
            }
        }
    }

    #[test]
    fn test_raz_wi_response() {
        let ppc = ppc_with_ports(&[0], 0);
        let upstream = ppc.upstream(0).unwrap();
        // Port is secure: a non-secure access is blocked.
        ppc.set_port_attribute(0, PortAttribute::PrivilegedOk, true);
        assert_eq!(upstream.read(RvSize::Word, 0, TxAttrs::nonsecure()), Ok(0));
        assert_eq!(upstream.write(RvSize::Word, 0, 0, TxAttrs::nonsecure()), Ok(()));
        assert_eq!(upstream.read(RvSize::Word, 0, TxAttrs::secure()), Ok(DATA));

        ppc.set_sec_resp(SecResp::BusError);
        assert_eq!(
            upstream.write(RvSize::Word, 0, 0, TxAttrs::nonsecure()),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(upstream.read(RvSize::Word, 0, TxAttrs::secure()), Ok(DATA));
    }

    #[test]
    fn test_irq_latch_enable_and_clear() {
        let ppc = ppc_with_ports(&[0], 0);
        let cpu = IrqLines::new(1);
        ppc.irq().connect(cpu.input(0));
        let upstream = ppc.upstream(0).unwrap();

        // Blocked while the interrupt is disabled: status latches, line stays low.
        upstream.read(RvSize::Word, 0, TxAttrs::nonsecure()).unwrap();
        assert!(ppc.irq_status());
        assert!(!cpu.level(0));

        // Enabling republishes the level at once.
        ppc.set_irq_enable(true);
        assert!(cpu.level(0));

        // Holding clear drops the status and keeps it from latching.
        ppc.set_irq_clear(true);
        assert!(!cpu.level(0));
        upstream.read(RvSize::Word, 0, TxAttrs::nonsecure()).unwrap();
        assert!(!ppc.irq_status());
        ppc.set_irq_clear(false);

        upstream.read(RvSize::Word, 0, TxAttrs::nonsecure()).unwrap();
        assert!(cpu.level(0));
        assert_eq!(cpu.rising_edges(0), 2);
    }

    #[test]
    fn test_signal_inputs() {
        let ppc = ppc_with_ports(&[1], 0);
        let nonsec = Irq::new();
        let ap = Irq::new();
        let sec_resp = Irq::new();
        nonsec.connect(ppc.cfg_nonsec_in(1));
        ap.connect(ppc.cfg_ap_in(1));
        sec_resp.connect(ppc.cfg_sec_resp_in());

        nonsec.raise();
        assert!(ppc.port_attribute(1, PortAttribute::NonSecure));
        assert!(!ppc.port_attribute(1, PortAttribute::PrivilegedOk));
        ap.raise();
        assert!(ppc.port_attribute(1, PortAttribute::PrivilegedOk));
        sec_resp.raise();
        assert_eq!(ppc.sec_resp(), SecResp::BusError);

        let upstream = ppc.upstream(1).unwrap();
        let user_ns = TxAttrs::nonsecure().unprivileged();
        assert_eq!(upstream.read(RvSize::Word, 0, user_ns), Ok(DATA));
        ap.lower();
        assert_eq!(
            upstream.read(RvSize::Word, 0, user_ns),
            Err(BusError::LoadAccessFault)
        );
    }

    #[test]
    fn test_reset() {
        let ppc = ppc_with_ports(&[0], 0);
        ppc.set_irq_enable(true);
        ppc.set_port_attribute(0, PortAttribute::NonSecure, true);
        ppc.set_sec_resp(SecResp::BusError);
        let _ = ppc.upstream(0).unwrap().read(RvSize::Word, 0, TxAttrs::secure());
        assert!(ppc.irq().level());

        ppc.reset();
        assert!(!ppc.irq_status());
        assert!(!ppc.irq().level());
        assert!(!ppc.port_attribute(0, PortAttribute::NonSecure));
        assert_eq!(ppc.sec_resp(), SecResp::RazWi);
    }
}
