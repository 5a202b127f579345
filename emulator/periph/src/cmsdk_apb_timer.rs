/*++

Licensed under the Apache-2.0 license.

File Name:

    cmsdk_apb_timer.rs

Abstract:

    File contains the CMSDK APB timer: a 32-bit down counter with reload
    and a level interrupt.

--*/

use caliptra_emu_bus::{ActionHandle, BusError, Clock, ReadWriteRegister, Timer};
use caliptra_emu_derive::Bus;
use caliptra_emu_types::{RvData, RvSize};
use emulator_bus::{BusConverter, Irq, MmioRegion};
use emulator_types::{HwAddr, ID_REGS_LEN};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_bitfields;

const TIMER_REGS_SIZE: HwAddr = 0x1000;

const TIMER_ID: [u8; ID_REGS_LEN] = [
    0x04, 0x00, 0x00, 0x00, 0x22, 0xb8, 0x1b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
];

register_bitfields! [
    u32,

    Ctrl [
        EN OFFSET(0) NUMBITS(1) [],
        SELEXTEN OFFSET(1) NUMBITS(1) [],
        SELEXTCLK OFFSET(2) NUMBITS(1) [],
        IRQEN OFFSET(3) NUMBITS(1) [],
    ],
];

#[derive(Bus)]
#[poll_fn(bus_poll)]
#[warm_reset_fn(reset)]
pub struct CmsdkApbTimer {
    #[register(offset = 0x0, write_fn = on_write_ctrl)]
    ctrl: ReadWriteRegister<u32, Ctrl::Register>,

    #[register(offset = 0x4, read_fn = on_read_value, write_fn = on_write_value)]
    value: ReadWriteRegister<u32>,

    #[register(offset = 0x8, write_fn = on_write_reload)]
    reload: ReadWriteRegister<u32>,

    /// Write 1 to clear.
    #[register(offset = 0xc, read_fn = on_read_intstatus, write_fn = on_write_intstatus)]
    intstatus: ReadWriteRegister<u32>,

    name: String,
    timer: Timer,
    /// Poll scheduled for the next time the counter reaches zero.
    next_zero: Option<ActionHandle>,
    /// Clock tick `value` was last brought up to date at.
    synced_at: u64,
    irq: Irq,
}

impl CmsdkApbTimer {
    const CTRL_MASK: u32 = 0xf;

    pub fn new(name: &str, clock: &Clock, irq: Irq) -> Self {
        let timer = clock.timer();
        Self {
            ctrl: ReadWriteRegister::new(0),
            value: ReadWriteRegister::new(0),
            reload: ReadWriteRegister::new(0),
            intstatus: ReadWriteRegister::new(0),
            name: name.to_string(),
            synced_at: timer.now(),
            timer,
            next_zero: None,
            irq,
        }
    }

    /// The timer as a register block with its ID registers.
    pub fn into_region(self) -> MmioRegion {
        let name = self.name.clone();
        MmioRegion::from_device(
            &name,
            TIMER_REGS_SIZE,
            BusConverter::registers(&name, Box::new(self), TIMER_ID),
        )
    }

    fn enabled(&self) -> bool {
        self.ctrl.reg.is_set(Ctrl::EN)
    }

    /// Bring the counter up to the current clock tick.
    fn sync(&mut self) {
        let now = self.timer.now();
        let elapsed = now - self.synced_at;
        self.synced_at = now;
        if !self.enabled() || elapsed == 0 {
            return;
        }
        let value = self.value.reg.get() as u64;
        if elapsed < value {
            self.value.reg.set((value - elapsed) as u32);
            return;
        }
        // Zero is reached after `value` ticks, then every `period` ticks.
        let period = self.reload.reg.get() as u64 + 1;
        let remaining = elapsed - value;
        let zero_hits = remaining / period + if value == 0 { 0 } else { 1 };
        if zero_hits > 0 {
            self.intstatus.reg.set(1);
        }
        self.value
            .reg
            .set(((period - remaining % period) % period) as u32);
    }

    fn schedule_next_zero(&mut self) {
        if !self.enabled() {
            self.next_zero = None;
            return;
        }
        let ticks = match self.value.reg.get() {
            0 => self.reload.reg.get() as u64 + 1,
            value => value as u64,
        };
        self.next_zero = Some(self.timer.schedule_poll_in(ticks));
    }

    fn update_irq(&self) {
        self.irq
            .set_level(self.intstatus.reg.get() != 0 && self.ctrl.reg.is_set(Ctrl::IRQEN));
    }

    pub fn irq(&self) -> &Irq {
        &self.irq
    }

    pub fn reset(&mut self) {
        self.ctrl.reg.set(0);
        self.value.reg.set(0);
        self.reload.reg.set(0);
        self.intstatus.reg.set(0);
        self.next_zero = None;
        self.synced_at = self.timer.now();
        self.update_irq();
    }

    pub fn on_write_ctrl(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.sync();
        if val & (Ctrl::SELEXTEN::SET.value | Ctrl::SELEXTCLK::SET.value) != 0 {
            log::warn!("{}: external enable and clock are not modelled", self.name);
        }
        self.ctrl.reg.set(val & Self::CTRL_MASK);
        self.schedule_next_zero();
        self.update_irq();
        Ok(())
    }

    pub fn on_read_value(&mut self, _size: RvSize) -> Result<u32, BusError> {
        self.sync();
        self.update_irq();
        Ok(self.value.reg.get())
    }

    pub fn on_write_value(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.sync();
        self.value.reg.set(val);
        self.schedule_next_zero();
        self.update_irq();
        Ok(())
    }

    pub fn on_write_reload(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.sync();
        self.reload.reg.set(val);
        self.value.reg.set(val);
        self.schedule_next_zero();
        self.update_irq();
        Ok(())
    }

    pub fn on_read_intstatus(&mut self, _size: RvSize) -> Result<u32, BusError> {
        self.sync();
        self.update_irq();
        Ok(self.intstatus.reg.get())
    }

    pub fn on_write_intstatus(&mut self, size: RvSize, val: RvData) -> Result<(), BusError> {
        if size != RvSize::Word {
            Err(BusError::StoreAccessFault)?
        }
        self.sync();
        if val & 1 != 0 {
            self.intstatus.reg.set(0);
        }
        self.update_irq();
        Ok(())
    }

    fn bus_poll(&mut self) {
        self.sync();
        self.update_irq();
        if self.timer.fired(&mut self.next_zero) {
            self.schedule_next_zero();
        }
    }
}
