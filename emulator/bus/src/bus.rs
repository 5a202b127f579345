/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains definition of the Bus trait and the converter presenting
    `caliptra_emu_bus` devices on it.

--*/

use crate::extract_subword;
use emulator_types::{id_register, RvAddr, RvData, RvSize, TxAttrs, ID_REGS_LEN};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusError {
    /// Load address misaligned exception
    LoadAddrMisaligned,

    /// Load access fault exception
    LoadAccessFault,

    /// Store address misaligned exception
    StoreAddrMisaligned,

    /// Store access fault exception
    StoreAccessFault,
}

impl From<caliptra_emu_bus::BusError> for BusError {
    fn from(value: caliptra_emu_bus::BusError) -> Self {
        match value {
            // Nothing on these buses is fetched from.
            caliptra_emu_bus::BusError::InstrAccessFault => BusError::LoadAccessFault,
            caliptra_emu_bus::BusError::LoadAddrMisaligned => BusError::LoadAddrMisaligned,
            caliptra_emu_bus::BusError::LoadAccessFault => BusError::LoadAccessFault,
            caliptra_emu_bus::BusError::StoreAddrMisaligned => BusError::StoreAddrMisaligned,
            caliptra_emu_bus::BusError::StoreAccessFault => BusError::StoreAccessFault,
        }
    }
}

impl BusError {
    /// The access fault matching the direction of a transaction.
    pub fn access_fault(is_write: bool) -> Self {
        if is_write {
            BusError::StoreAccessFault
        } else {
            BusError::LoadAccessFault
        }
    }
}

/// Represents an abstract memory bus. Used to read and write from RAM and
/// peripheral addresses.
pub trait Bus {
    /// Read data of specified size from given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the read
    /// * `addr` - Address to read from
    /// * `attrs` - Security and privilege attributes of the transaction
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::LoadAccessFault` or `BusError::LoadAddrMisaligned`
    fn read(&mut self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> Result<RvData, BusError>;

    /// Write data of specified size to given address
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the write
    /// * `addr` - Address to write
    /// * `val` - Data to write
    /// * `attrs` - Security and privilege attributes of the transaction
    ///
    /// # Error
    ///
    /// * `BusError` - Exception with cause `BusError::StoreAccessFault` or `BusError::StoreAddrMisaligned`
    fn write(
        &mut self,
        size: RvSize,
        addr: RvAddr,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError>;

    /// This method is used to notify peripherals of the passage of time. The
    /// owner of this bus MAY call this function periodically.
    fn poll(&mut self) {
        // By default, do nothing
    }

    fn warm_reset(&mut self) {
        // By default, do nothing
    }
}

struct RegisterBlock {
    name: String,
    idregs: [u8; ID_REGS_LEN],
}

/// Presents a device implementing `caliptra_emu_bus::Bus` as a [`Bus`].
///
/// The device never sees the transaction attributes. Whatever gates on them
/// sits in front of it.
pub struct BusConverter {
    caliptra_bus: Box<dyn caliptra_emu_bus::Bus>,
    registers: Option<RegisterBlock>,
}

impl BusConverter {
    /// Accesses of every size pass straight through, as for a RAM.
    pub fn new(caliptra_bus: Box<dyn caliptra_emu_bus::Bus>) -> Self {
        Self {
            caliptra_bus,
            registers: None,
        }
    }

    /// A block of 32-bit registers followed by the CoreSight ID registers
    /// `idregs`.
    ///
    /// Sub-word reads return the addressed bytes of the register, sub-word
    /// writes are ignored. Offsets the device does not decode read as zero
    /// and ignore writes.
    pub fn registers(
        name: &str,
        caliptra_bus: Box<dyn caliptra_emu_bus::Bus>,
        idregs: [u8; ID_REGS_LEN],
    ) -> Self {
        Self {
            caliptra_bus,
            registers: Some(RegisterBlock {
                name: name.to_string(),
                idregs,
            }),
        }
    }
}

impl Bus for BusConverter {
    fn read(&mut self, size: RvSize, addr: RvAddr, attrs: TxAttrs) -> Result<RvData, BusError> {
        let Some(regs) = &self.registers else {
            return self
                .caliptra_bus
                .read((size as usize).into(), addr as caliptra_emu_types::RvAddr)
                .map_err(|x| x.into());
        };
        if size == RvSize::Invalid || addr % size.bytes() != 0 {
            return Err(BusError::LoadAddrMisaligned);
        }
        let offset = addr & !3;
        let word = match id_register(&regs.idregs, offset) {
            Some(id) => id,
            None => match self
                .caliptra_bus
                .read(caliptra_emu_types::RvSize::Word, offset)
            {
                Ok(word) => word,
                Err(caliptra_emu_bus::BusError::LoadAccessFault) => {
                    log::warn!(
                        "{}: read of bad offset 0x{offset:x} by requester {}",
                        regs.name,
                        attrs.requester_id
                    );
                    0
                }
                Err(err) => return Err(err.into()),
            },
        };
        Ok(extract_subword(word, size, addr))
    }

    fn write(
        &mut self,
        size: RvSize,
        addr: RvAddr,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        let Some(regs) = &self.registers else {
            return self
                .caliptra_bus
                .write(
                    (size as usize).into(),
                    addr as caliptra_emu_types::RvAddr,
                    val,
                )
                .map_err(|x| x.into());
        };
        if size == RvSize::Invalid || addr % size.bytes() != 0 {
            return Err(BusError::StoreAddrMisaligned);
        }
        if size != RvSize::Word {
            log::warn!("{}: {size:?} write at 0x{addr:x} ignored", regs.name);
            return Ok(());
        }
        if id_register(&regs.idregs, addr).is_some() {
            log::warn!("{}: write to ID register 0x{addr:x}", regs.name);
            return Ok(());
        }
        match self
            .caliptra_bus
            .write(caliptra_emu_types::RvSize::Word, addr, val)
        {
            Err(caliptra_emu_bus::BusError::StoreAccessFault) => {
                log::warn!(
                    "{}: write to bad or read-only offset 0x{addr:x} by requester {}",
                    regs.name,
                    attrs.requester_id
                );
                Ok(())
            }
            res => res.map_err(|x| x.into()),
        }
    }

    fn poll(&mut self) {
        self.caliptra_bus.poll();
    }

    fn warm_reset(&mut self) {
        self.caliptra_bus.warm_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caliptra_emu_bus::Ram;

    const S: TxAttrs = TxAttrs::secure();

    const IDS: [u8; ID_REGS_LEN] = [
        0x04, 0x00, 0x00, 0x00, 0x11, 0xb8, 0x1b, 0x00, 0x0d, 0xf0, 0x05, 0xb1,
    ];

    #[test]
    fn test_memory_passes_through() {
        let mut ram = BusConverter::new(Box::new(Ram::new(vec![0; 16])));
        ram.write(RvSize::Word, 4, 0x1122_3344, S).unwrap();
        assert_eq!(ram.read(RvSize::Byte, 5, S), Ok(0x33));
        assert_eq!(ram.read(RvSize::HalfWord, 6, S), Ok(0x1122));
        ram.write(RvSize::Byte, 7, 0xaa, S).unwrap();
        assert_eq!(ram.read(RvSize::Word, 4, S), Ok(0xaa22_3344));
        assert_eq!(ram.read(RvSize::Word, 16, S), Err(BusError::LoadAccessFault));
    }

    #[test]
    fn test_register_block() {
        // A RAM stands in for a device decoding the first 8 bytes only.
        let mut regs = BusConverter::registers("regs", Box::new(Ram::new(vec![0; 8])), IDS);
        regs.write(RvSize::Word, 0x4, 0x1122_3344, S).unwrap();
        assert_eq!(regs.read(RvSize::Byte, 0x6, S), Ok(0x22));
        assert_eq!(regs.read(RvSize::HalfWord, 0x6, S), Ok(0x1122));

        regs.write(RvSize::Byte, 0x4, 0xff, S).unwrap();
        assert_eq!(regs.read(RvSize::Word, 0x4, S), Ok(0x1122_3344));

        assert_eq!(regs.read(RvSize::Word, 0x100, S), Ok(0));
        assert_eq!(regs.write(RvSize::Word, 0x100, 1, S), Ok(()));

        assert_eq!(regs.read(RvSize::Word, 0xfe0, S), Ok(0x11));
        regs.write(RvSize::Word, 0xfe0, 0, S).unwrap();
        assert_eq!(regs.read(RvSize::Byte, 0xfe0, S), Ok(0x11));

        assert_eq!(
            regs.read(RvSize::Word, 0x2, S),
            Err(BusError::LoadAddrMisaligned)
        );
        assert_eq!(
            regs.write(RvSize::HalfWord, 0x1, 0, S),
            Err(BusError::StoreAddrMisaligned)
        );
    }
}
