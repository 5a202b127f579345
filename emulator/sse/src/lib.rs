/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Arm SSE subsystem composition library.

--*/

mod armsse;
mod devices;
mod error;
mod variant;

pub use armsse::{ArmSse, ArmSseArgs, BuildStage};
pub use devices::{DeviceInfo, DeviceKind, IrqTarget, NmiInput, PortBinding};
pub use error::SseError;
pub use variant::SseVariant;
