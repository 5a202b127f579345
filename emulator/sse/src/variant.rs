// Licensed under the Apache-2.0 license

use crate::devices::{DeviceInfo, IOTKIT_DEVICES, SSE200_DEVICES};
use emulator_consts::NUM_INTERNAL_IRQS;
use strum_macros::{Display, EnumIter, EnumString};

/// SSE-200 interrupts that go to every CPU. The rest are per-CPU (MHU, cache
/// and CTI interrupts) or reserved.
const SSE200_IRQ_IS_COMMON: u32 = 0x07df_9f3f;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumIter, EnumString)]
pub enum SseVariant {
    #[strum(serialize = "iotkit")]
    IotKit,
    #[strum(serialize = "sse-200")]
    Sse200,
}

impl SseVariant {
    pub fn num_cpus(self) -> usize {
        match self {
            SseVariant::IotKit => 1,
            SseVariant::Sse200 => 2,
        }
    }

    pub fn sram_banks(self) -> usize {
        4
    }

    pub fn sys_version(self) -> u32 {
        match self {
            SseVariant::IotKit => 0x41743,
            SseVariant::Sse200 => 0x2204_1743,
        }
    }

    /// SYS_CONFIG value for a subsystem with SRAM banks of
    /// `1 << sram_addr_width` bytes.
    pub fn sys_config(self, sram_addr_width: u32) -> u32 {
        let banks = self.sram_banks() as u32;
        match self {
            SseVariant::IotKit => banks | (sram_addr_width.wrapping_sub(12) & 0xf) << 4,
            SseVariant::Sse200 => {
                // CPU0 is a Cortex-M33 (type 2).
                let mut config = banks | (sram_addr_width & 0x1f) << 4 | 2 << 24;
                if self.num_cpus() > 1 {
                    config |= 1 << 10 | (banks - 1) << 20 | 2 << 28;
                }
                config
            }
        }
    }

    pub fn devices(self) -> &'static [DeviceInfo] {
        match self {
            SseVariant::IotKit => IOTKIT_DEVICES,
            SseVariant::Sse200 => SSE200_DEVICES,
        }
    }

    /// Whether internal interrupt `irq` is shared by all CPUs. Every line is
    /// common on a single-CPU subsystem.
    pub fn irq_is_common(self, irq: u32) -> bool {
        if irq >= NUM_INTERNAL_IRQS {
            return false;
        }
        match self {
            SseVariant::IotKit => true,
            SseVariant::Sse200 => SSE200_IRQ_IS_COMMON & (1 << irq) != 0,
        }
    }

    /// CPUID, cache controller and CPU security control blocks per CPU.
    pub fn has_cpu_private_devices(self) -> bool {
        self == SseVariant::Sse200
    }
}
