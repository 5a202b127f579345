/*++

Licensed under the Apache-2.0 license.

File Name:

    clock.rs

Abstract:

    File contains the clock sources: a `caliptra_emu_bus::Clock` counting the
    cycles of a fixed frequency, plus the devices its timers poll.

--*/

use crate::MmioRegion;
use caliptra_emu_bus::{BusError, Clock, Timer};
use caliptra_emu_types::{RvAddr, RvData, RvSize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const NS_PER_SEC: u128 = 1_000_000_000;

struct ClockSourceInner {
    name: String,
    freq_hz: u32,
    clock: Clock,
    elapsed_ns: Cell<u64>,
    devices: RefCell<Vec<MmioRegion>>,
}

/// A clock input of the subsystem, such as MAINCLK or S32KCLK.
///
/// All sources of a system are advanced by the same wall time, so devices on
/// a slow clock and devices on the main clock stay in step. A source with a
/// frequency of 0 is stopped.
#[derive(Clone)]
pub struct ClockSource {
    inner: Rc<ClockSourceInner>,
}

impl ClockSource {
    pub fn new(name: &str, freq_hz: u32) -> Self {
        Self {
            inner: Rc::new(ClockSourceInner {
                name: name.to_string(),
                freq_hz,
                clock: Clock::new(),
                elapsed_ns: Cell::new(0),
                devices: RefCell::new(vec![]),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn freq_hz(&self) -> u32 {
        self.inner.freq_hz
    }

    /// The cycle counter devices on this source build their timers from.
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    pub fn timer(&self) -> Timer {
        self.inner.clock.timer()
    }

    /// Cycles elapsed since the source was created.
    pub fn now(&self) -> u64 {
        self.inner.clock.now()
    }

    /// Poll `region` whenever a timer scheduled on this source fires.
    pub fn attach(&self, region: MmioRegion) {
        self.inner.devices.borrow_mut().push(region);
    }

    pub fn advance_ns(&self, ns: u64) {
        let elapsed = self.inner.elapsed_ns.get().saturating_add(ns);
        self.inner.elapsed_ns.set(elapsed);
        let target = (elapsed as u128 * self.inner.freq_hz as u128 / NS_PER_SEC) as u64;
        let delta = target.saturating_sub(self.inner.clock.now());
        if delta == 0 {
            return;
        }
        let devices = self.inner.devices.borrow().clone();
        self.inner
            .clock
            .increment_and_process_timer_actions(delta, &mut PollTargets(&devices));
    }
}

impl std::fmt::Debug for ClockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockSource")
            .field("name", &self.inner.name)
            .field("freq_hz", &self.inner.freq_hz)
            .field("now", &self.now())
            .finish()
    }
}

/// The devices of one source, as the target of the poll actions its timers
/// fire. It decodes no addresses.
struct PollTargets<'a>(&'a [MmioRegion]);

impl caliptra_emu_bus::Bus for PollTargets<'_> {
    fn read(&mut self, _size: RvSize, _addr: RvAddr) -> Result<RvData, BusError> {
        Err(BusError::LoadAccessFault)
    }

    fn write(&mut self, _size: RvSize, _addr: RvAddr, _val: RvData) -> Result<(), BusError> {
        Err(BusError::StoreAccessFault)
    }

    fn poll(&mut self) {
        for device in self.0 {
            device.poll();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bus;
    use caliptra_emu_bus::ActionHandle;
    use emulator_types::TxAttrs;

    #[test]
    fn test_sources_advance_together() {
        let main = ClockSource::new("MAINCLK", 20_000_000);
        let slow = ClockSource::new("S32KCLK", 32_768);
        for source in [&main, &slow] {
            source.advance_ns(1_000_000_000);
        }
        assert_eq!(main.now(), 20_000_000);
        assert_eq!(slow.now(), 32_768);
    }

    #[test]
    fn test_stopped_source() {
        let source = ClockSource::new("stopped", 0);
        source.advance_ns(5_000);
        assert_eq!(source.now(), 0);
    }

    struct Alarm {
        timer: Timer,
        pending: Option<ActionHandle>,
        rang: Rc<Cell<u32>>,
    }

    impl Bus for Alarm {
        fn read(
            &mut self,
            _: emulator_types::RvSize,
            _: u32,
            _: TxAttrs,
        ) -> Result<u32, crate::BusError> {
            Ok(0)
        }

        fn write(
            &mut self,
            _: emulator_types::RvSize,
            _: u32,
            _: u32,
            _: TxAttrs,
        ) -> Result<(), crate::BusError> {
            Ok(())
        }

        fn poll(&mut self) {
            if self.timer.fired(&mut self.pending) {
                self.rang.set(self.rang.get() + 1);
            }
        }
    }

    #[test]
    fn test_timers_poll_attached_devices() {
        // 1 MHz: one cycle per microsecond.
        let source = ClockSource::new("MAINCLK", 1_000_000);
        let timer = source.timer();
        let rang = Rc::new(Cell::new(0));
        let alarm = Alarm {
            pending: Some(timer.schedule_poll_in(10)),
            timer,
            rang: rang.clone(),
        };
        source.attach(MmioRegion::from_device("alarm", 0x10, alarm));

        source.advance_ns(9_000);
        assert_eq!(rang.get(), 0);
        source.advance_ns(1_000);
        assert_eq!(rang.get(), 1);
        source.advance_ns(100_000);
        assert_eq!(rang.get(), 1);
    }
}
