/*++

Licensed under the Apache-2.0 license.

File Name:

    cmsdk_apb_watchdog.rs

Abstract:

    File contains the CMSDK APB watchdog. The first expiry raises the
    interrupt, the second one with reset enabled asserts the reset output.

--*/

use caliptra_emu_bus::{
    ActionHandle, BusError, Clock, ReadOnlyRegister, ReadWriteRegister, Timer, WriteOnlyRegister,
};
use caliptra_emu_derive::Bus;
use caliptra_emu_types::{RvData, RvSize};
use emulator_bus::{BusConverter, Irq, MmioRegion};
use emulator_types::{HwAddr, ID_REGS_LEN};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_bitfields;

const WATCHDOG_REGS_SIZE: HwAddr = 0x1000;

const WATCHDOG_ID: [u8; ID_REGS_LEN] = [
    0x04, 0x00, 0x00, 0x00, 0x24, 0xb8, 0x1b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
];

/// Writing this to WDOGLOCK enables write access to the other registers.
const WATCHDOG_UNLOCK_KEY: u32 = 0x1ACC_E551;

register_bitfields! [
    u32,

    Control [
        INTEN OFFSET(0) NUMBITS(1) [],
        RESEN OFFSET(1) NUMBITS(1) [],
    ],

    Itop [
        WDOGRES OFFSET(0) NUMBITS(1) [],
        WDOGINT OFFSET(1) NUMBITS(1) [],
    ],
];

#[derive(Bus)]
#[poll_fn(bus_poll)]
#[warm_reset_fn(reset)]
pub struct CmsdkApbWatchdog {
    #[register(offset = 0x0, write_fn = on_write_load)]
    load: ReadWriteRegister<u32>,

    #[register(offset = 0x4, read_fn = on_read_value)]
    value: ReadOnlyRegister<u32>,

    #[register(offset = 0x8, write_fn = on_write_control)]
    control: ReadWriteRegister<u32, Control::Register>,

    #[register(offset = 0xc, write_fn = on_write_intclr)]
    intclr: WriteOnlyRegister<u32>,

    #[register(offset = 0x10, read_fn = on_read_ris)]
    ris: ReadOnlyRegister<u32>,

    #[register(offset = 0x14, read_fn = on_read_mis)]
    mis: ReadOnlyRegister<u32>,

    /// Reads 1 while locked.
    #[register(offset = 0xc00, write_fn = on_write_lock)]
    lock: ReadWriteRegister<u32>,

    #[register(offset = 0xf00, write_fn = on_write_itcr)]
    itcr: ReadWriteRegister<u32>,

    #[register(offset = 0xf04, write_fn = on_write_itop)]
    itop: WriteOnlyRegister<u32, Itop::Register>,

    name: String,
    timer: Timer,
    expiry: Option<ActionHandle>,
    intstatus: bool,
    /// Set once the reset output fired; the counter stops.
    reset_fired: bool,
    synced_at: u64,
    irq: Irq,
    reset_req: Irq,
}

impl CmsdkApbWatchdog {
    pub fn new(name: &str, clock: &Clock, irq: Irq) -> Self {
        let timer = clock.timer();
        Self {
            load: ReadWriteRegister::new(u32::MAX),
            value: ReadOnlyRegister::new(u32::MAX),
            control: ReadWriteRegister::new(0),
            intclr: WriteOnlyRegister::new(0),
            ris: ReadOnlyRegister::new(0),
            mis: ReadOnlyRegister::new(0),
            lock: ReadWriteRegister::new(0),
            itcr: ReadWriteRegister::new(0),
            itop: WriteOnlyRegister::new(0),
            name: name.to_string(),
            synced_at: timer.now(),
            timer,
            expiry: None,
            intstatus: false,
            reset_fired: false,
            irq,
            reset_req: Irq::new(),
        }
    }

    /// The watchdog as a register block with its ID registers.
    pub fn into_region(self) -> MmioRegion {
        let name = self.name.clone();
        MmioRegion::from_device(
            &name,
            WATCHDOG_REGS_SIZE,
            BusConverter::registers(&name, Box::new(self), WATCHDOG_ID),
        )
    }

    pub fn irq(&self) -> &Irq {
        &self.irq
    }

    /// Asserted when the watchdog requests a system reset.
    pub fn reset_request(&self) -> &Irq {
        &self.reset_req
    }

    fn running(&self) -> bool {
        self.control.reg.is_set(Control::INTEN) && !self.reset_fired
    }

    fn locked(&self) -> bool {
        if self.lock.reg.get() != 0 {
            log::debug!("{}: write while locked", self.name);
            return true;
        }
        false
    }

    fn expire(&mut self) {
        if !self.intstatus {
            self.intstatus = true;
        } else if self.control.reg.is_set(Control::RESEN) {
            log::info!("{}: timeout, requesting reset", self.name);
            self.reset_fired = true;
        }
    }

    fn sync(&mut self) {
        let now = self.timer.now();
        let mut elapsed = now - self.synced_at;
        self.synced_at = now;
        let load = self.load.reg.get() as u64;
        while elapsed > 0 && self.running() {
            let value = self.value.reg.get() as u64;
            if elapsed < value {
                self.value.reg.set((value - elapsed) as u32);
                return;
            }
            elapsed -= value;
            self.value.reg.set(load as u32);
            self.expire();
            if load == 0 {
                return;
            }
            if self.intstatus && !self.control.reg.is_set(Control::RESEN) {
                // Further expiries change nothing.
                elapsed %= load;
            }
        }
    }

    fn reload(&mut self) {
        self.value.reg.set(self.load.reg.get());
        self.schedule_expiry();
    }

    fn schedule_expiry(&mut self) {
        self.expiry = self
            .running()
            .then(|| self.timer.schedule_poll_in((self.value.reg.get() as u64).max(1)));
    }

    fn update_outputs(&self) {
        let (int, res) = if self.itcr.reg.get() != 0 {
            (
                self.itop.reg.is_set(Itop::WDOGINT),
                self.itop.reg.is_set(Itop::WDOGRES),
            )
        } else {
            (
                self.intstatus && self.control.reg.is_set(Control::INTEN),
                self.reset_fired,
            )
        };
        self.irq.set_level(int);
        self.reset_req.set_level(res);
    }

    pub fn reset(&mut self) {
        self.load.reg.set(u32::MAX);
        self.value.reg.set(u32::MAX);
        self.control.reg.set(0);
        self.lock.reg.set(0);
        self.itcr.reg.set(0);
        self.itop.reg.set(0);
        self.expiry = None;
        self.intstatus = false;
        self.reset_fired = false;
        self.synced_at = self.timer.now();
        self.update_outputs();
    }

    pub fn on_write_load(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if self.locked() {
            return Ok(());
        }
        self.sync();
        self.load.reg.set(val);
        self.reload();
        self.update_outputs();
        Ok(())
    }

    pub fn on_read_value(&mut self, _size: RvSize) -> Result<u32, BusError> {
        self.sync();
        self.update_outputs();
        Ok(self.value.reg.get())
    }

    pub fn on_write_control(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if self.locked() {
            return Ok(());
        }
        self.sync();
        let was_running = self.control.reg.is_set(Control::INTEN);
        self.control.reg.set(val & 0x3);
        if !was_running && self.control.reg.is_set(Control::INTEN) {
            self.reload();
        }
        self.update_outputs();
        Ok(())
    }

    pub fn on_write_intclr(&mut self, size: RvSize, _val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if self.locked() {
            return Ok(());
        }
        self.sync();
        self.intstatus = false;
        self.reload();
        self.update_outputs();
        Ok(())
    }

    pub fn on_read_ris(&mut self, _size: RvSize) -> Result<u32, BusError> {
        self.sync();
        self.update_outputs();
        Ok(self.intstatus as u32)
    }

    pub fn on_read_mis(&mut self, _size: RvSize) -> Result<u32, BusError> {
        self.sync();
        self.update_outputs();
        Ok((self.intstatus && self.control.reg.is_set(Control::INTEN)) as u32)
    }

    pub fn on_write_lock(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.lock.reg.set((val != WATCHDOG_UNLOCK_KEY) as u32);
        Ok(())
    }

    pub fn on_write_itcr(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if self.locked() {
            return Ok(());
        }
        self.itcr.reg.set(val & 1);
        self.update_outputs();
        Ok(())
    }

    pub fn on_write_itop(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        if self.locked() {
            return Ok(());
        }
        self.itop.reg.set(val & 0x3);
        self.update_outputs();
        Ok(())
    }

    fn bus_poll(&mut self) {
        self.sync();
        self.update_outputs();
        if self.timer.fired(&mut self.expiry) {
            self.schedule_expiry();
        }
    }
}
