/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Library interface for the MPS2 TrustZone board emulator.

--*/

pub mod board;
pub mod emulator;

pub use board::{BoardArgs, BoardError, BoardKind, Mps2TzBoard};
pub use emulator::{Emulator, EmulatorArgs};
