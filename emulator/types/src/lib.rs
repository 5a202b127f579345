/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the basic types shared by the SSE emulator crates.

--*/

mod consts;

pub use consts::{id_register, ID_REGS_END, ID_REGS_LEN, ID_REGS_START};

/// Bus address as seen by a device (offset inside its region).
pub type RvAddr = u32;

/// Data travelling on the bus. Sub-word accesses use the low bits.
pub type RvData = u32;

/// Absolute address inside an address space. Containers span the full
/// 32-bit space, so sizes need one more bit than `RvAddr`.
pub type HwAddr = u64;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RvSize {
    Byte = 1,
    HalfWord = 2,
    Word = 4,
    Invalid = 0,
}

impl From<usize> for RvSize {
    fn from(value: usize) -> Self {
        match value {
            1 => RvSize::Byte,
            2 => RvSize::HalfWord,
            4 => RvSize::Word,
            _ => RvSize::Invalid,
        }
    }
}

impl RvSize {
    /// Number of bytes moved by an access of this size.
    pub fn bytes(self) -> u32 {
        self as u32
    }

    /// Mask selecting the valid data bits of an access of this size.
    pub fn mask(self) -> RvData {
        match self {
            RvSize::Byte => 0xff,
            RvSize::HalfWord => 0xffff,
            RvSize::Word => 0xffff_ffff,
            RvSize::Invalid => 0,
        }
    }
}

/// Attributes carried by every bus transaction.
///
/// `secure` is the TrustZone security state of the requester, `privileged`
/// is false for unprivileged (user mode) code. `requester_id` identifies the
/// bus master and is reported in fault syndromes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct TxAttrs {
    pub secure: bool,
    pub privileged: bool,
    pub requester_id: u16,
}

impl TxAttrs {
    /// Secure, privileged access from requester 0.
    pub const fn secure() -> Self {
        Self {
            secure: true,
            privileged: true,
            requester_id: 0,
        }
    }

    /// Non-secure, privileged access from requester 0.
    pub const fn nonsecure() -> Self {
        Self {
            secure: false,
            privileged: true,
            requester_id: 0,
        }
    }

    pub const fn unprivileged(mut self) -> Self {
        self.privileged = false;
        self
    }

    pub const fn with_requester(mut self, requester_id: u16) -> Self {
        self.requester_id = requester_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_from_usize() {
        assert_eq!(RvSize::from(1), RvSize::Byte);
        assert_eq!(RvSize::from(2), RvSize::HalfWord);
        assert_eq!(RvSize::from(4), RvSize::Word);
        assert_eq!(RvSize::from(3), RvSize::Invalid);
        assert_eq!(RvSize::HalfWord.mask(), 0xffff);
    }

    #[test]
    fn test_attrs_builders() {
        let attrs = TxAttrs::nonsecure().unprivileged().with_requester(7);
        assert!(!attrs.secure);
        assert!(!attrs.privileged);
        assert_eq!(attrs.requester_id, 7);
        assert!(TxAttrs::secure().privileged);
    }
}
