/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the SSE emulator peripheral library.

--*/

mod armsse_cpuid;
mod cmsdk_apb_timer;
mod cmsdk_apb_watchdog;
mod error;
mod iotkit_secctl;
mod iotkit_sysinfo;
mod or_irq;
mod split_irq;
mod tz_mpc;
mod tz_ppc;
mod unimp;

pub use armsse_cpuid::ArmSseCpuId;
pub use cmsdk_apb_timer::CmsdkApbTimer;
pub use cmsdk_apb_watchdog::CmsdkApbWatchdog;
pub use error::{PeriphError, StateError};
pub use iotkit_secctl::{
    IoTKitSecCtl, PpcId, SecCtlPpcPins, SECCTL_NUM_AHB_EXP_PPC, SECCTL_NUM_APB_EXP_PPC,
    SECCTL_NUM_APB_PPC, SECCTL_NUM_EXP_MPC, SECCTL_NUM_MPC,
};
pub use iotkit_sysinfo::IoTKitSysInfo;
pub use or_irq::OrIrq;
pub use split_irq::SplitIrq;
pub use tz_mpc::{
    IommuEvent, IommuEventKind, IommuIndex, IommuNotifier, IommuTarget, MpcConfig, MpcState,
    TranslationEntry, TzMpc,
};
pub use tz_ppc::{PortAttribute, Ppc, SecResp, TzPpc};
pub use unimp::UnimplementedDevice;
