/*++

Licensed under the Apache-2.0 license.

File Name:

    consts.rs

Abstract:

    File contains the layout of the CoreSight-style peripheral and component
    ID registers shared by the Arm CMSDK and SSE register blocks.

--*/

use crate::{RvAddr, RvData};

/// Offset of PIDR4, the first ID register.
pub const ID_REGS_START: RvAddr = 0xfd0;

/// One past the last ID register byte (CIDR3 ends at 0xfff).
pub const ID_REGS_END: RvAddr = 0x1000;

/// PIDR4..PIDR7, PIDR0..PIDR3, CIDR0..CIDR3.
pub const ID_REGS_LEN: usize = 12;

/// Returns the value of the ID register at `offset`, or `None` if `offset`
/// is outside the ID block.
pub fn id_register(idregs: &[u8; ID_REGS_LEN], offset: RvAddr) -> Option<RvData> {
    if !(ID_REGS_START..ID_REGS_END).contains(&offset) {
        return None;
    }
    let index = ((offset - ID_REGS_START) / 4) as usize;
    Some(idregs[index] as RvData)
}
