/*++

Licensed under the Apache-2.0 license.

File Name:

    unimp.rs

Abstract:

    File contains a placeholder for devices that are not modelled. Reads
    return zero and writes are dropped; every access is logged.

--*/

use emulator_bus::{Bus, BusError};
use emulator_types::{HwAddr, RvAddr, RvData, RvSize, TxAttrs};

pub struct UnimplementedDevice {
    name: String,
    size: HwAddr,
}

impl UnimplementedDevice {
    pub fn new(name: &str, size: HwAddr) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }

    pub fn size(&self) -> HwAddr {
        self.size
    }
}

impl Bus for UnimplementedDevice {
    fn read(&mut self, size: RvSize, addr: RvAddr, _attrs: TxAttrs) -> Result<RvData, BusError> {
        log::warn!(
            "{}: unimplemented device read ({size:?}) at offset 0x{addr:x}",
            self.name
        );
        Ok(0)
    }

    fn write(
        &mut self,
        size: RvSize,
        addr: RvAddr,
        val: RvData,
        _attrs: TxAttrs,
    ) -> Result<(), BusError> {
        log::warn!(
            "{}: unimplemented device write ({size:?}) at offset 0x{addr:x}, value 0x{val:x}",
            self.name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raz_wi() {
        let mut dev = UnimplementedDevice::new("uart0", 0x1000);
        let s = TxAttrs::nonsecure();
        dev.write(RvSize::Word, 0x10, 0xdead_beef, s).unwrap();
        assert_eq!(dev.read(RvSize::Word, 0x10, s), Ok(0));
        assert_eq!(dev.read(RvSize::Byte, 0x3, s), Ok(0));
        assert_eq!(dev.size(), 0x1000);
    }
}
