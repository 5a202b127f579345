/*++

Licensed under the Apache-2.0 license.

File Name:

    subword.rs

Abstract:

    File contains the sub-word access helpers used by the register-backed
    devices.

--*/

use emulator_types::{RvAddr, RvData, RvSize};

/// Extract the bytes addressed by a sub-word read from the full 32-bit
/// register value.
pub fn extract_subword(word: RvData, size: RvSize, addr: RvAddr) -> RvData {
    let shift = (addr & 3) * 8;
    (word >> shift) & size.mask()
}

/// Deposit the data of a sub-word write into `old`, the current value of the
/// 32-bit register it targets.
pub fn merge_subword(old: RvData, size: RvSize, addr: RvAddr, val: RvData) -> RvData {
    let shift = (addr & 3) * 8;
    let mask = size.mask() << shift;
    (old & !mask) | ((val << shift) & mask)
}
