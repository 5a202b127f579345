/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains memory map constants of the SSE subsystems and the MPS2
    TrustZone boards built around them.

--*/

use emulator_types::HwAddr;

/// Size of every address space (shared container and per-CPU views).
pub const ADDRESS_SPACE_SIZE: HwAddr = 1 << 32;

/// Smallest translation granule of the emulated memory system. MPC blocks
/// cannot be smaller.
pub const TARGET_PAGE_SIZE: u32 = 0x400;

/// Size of a peripheral register block.
pub const PERIPH_BLOCK_SIZE: u32 = 0x1000;

// Security aliases of the lower half of the map.
pub const ALIAS1_BASE: u32 = 0x1000_0000;
pub const ALIAS1_TARGET: u32 = 0x0000_0000;
pub const ALIAS2_BASE: u32 = 0x3000_0000;
pub const ALIAS2_TARGET: u32 = 0x2000_0000;
pub const ALIAS3_BASE: u32 = 0x5000_0000;
pub const ALIAS3_TARGET: u32 = 0x4000_0000;
pub const ALIAS_SIZE: u32 = 0x1000_0000;
pub const ALIAS_PRIORITY: i32 = -1500;

// Internal SRAM and its MPCs.
pub const SRAM_BASE: u32 = 0x2000_0000;
pub const SRAM_MPC_REGS_BASE: u32 = 0x5008_3000;
pub const SRAM_MPC_REGS_STRIDE: u32 = 0x1000;
pub const SRAM_ADDR_WIDTH_DEFAULT: u32 = 15;
pub const SRAM_ADDR_WIDTH_MAX: u32 = 24;

// Security controller.
pub const SECCTL_S_BASE: u32 = 0x5008_0000;
pub const SECCTL_NS_BASE: u32 = 0x4008_0000;

// Internal peripherals.
pub const TIMER0_BASE: u32 = 0x4000_0000;
pub const TIMER1_BASE: u32 = 0x4000_1000;
pub const DUALTIMER_BASE: u32 = 0x4000_2000;
pub const MHU0_BASE: u32 = 0x4000_3000;
pub const MHU1_BASE: u32 = 0x4000_4000;
pub const CPUID_BASE: u32 = 0x4001_f000;
pub const SYSINFO_BASE: u32 = 0x4002_0000;
pub const S32KTIMER_BASE: u32 = 0x4002_f000;
pub const NSWATCHDOG_BASE: u32 = 0x4008_1000;
pub const CACHECTRL_BASE: u32 = 0x5001_0000;
pub const CPUSECCTRL_BASE: u32 = 0x5001_1000;
pub const SYSCTL_BASE: u32 = 0x5002_1000;
pub const PPU_BASES: [u32; 8] = [
    0x5002_2000, // SYS
    0x5002_3000, // CPU0CORE
    0x5002_5000, // CPU1CORE
    0x5002_9000, // DBG
    0x5002_a000, // RAM0
    0x5002_b000, // RAM1
    0x5002_c000, // RAM2
    0x5002_d000, // RAM3
];
pub const S32KWATCHDOG_BASE: u32 = 0x5002_e000;
pub const SWATCHDOG_BASE: u32 = 0x5008_1000;

// Interrupt layout of each CPU.
pub const NUM_INTERNAL_IRQS: u32 = 32;
pub const NUM_EXP_IRQ_DEFAULT: u32 = 64;
pub const NUM_EXP_IRQ_MAX: u32 = 96;
pub const IRQ_MPC: u32 = 9;
pub const IRQ_PPC: u32 = 10;

/// Main clock frequency supplied by the MPS2 boards.
pub const MPS2_MAINCLK_HZ: u32 = 20_000_000;
/// Slow always-on clock.
pub const S32KCLK_HZ: u32 = 32_768;

// MPS2 board memories.
pub const SSRAM0_BASE: u32 = 0x0000_0000;
pub const SSRAM0_SIZE: u32 = 0x0040_0000;
pub const SSRAM1_BASE: u32 = 0x2800_0000;
pub const SSRAM1_SIZE: u32 = 0x0020_0000;
pub const SSRAM_MPC_REGS_BASE: [u32; 2] = [0x5800_7000, 0x5800_8000];
pub const SSRAM_MPC_BLOCK_SIZE: u32 = 0x4000;

// MPS2 board peripherals.
pub const BOARD_SPI_BASE: u32 = 0x4020_5000;
pub const BOARD_UART_BASE: u32 = 0x4020_0000;
pub const BOARD_UART_STRIDE: u32 = 0x1000;
pub const BOARD_NUM_UARTS: u32 = 5;
pub const BOARD_I2C_BASE: u32 = 0x4020_7000;
pub const BOARD_SCC_BASE: u32 = 0x4030_0000;
pub const BOARD_AUDIO_BASE: u32 = 0x4030_1000;
pub const BOARD_FPGAIO_BASE: u32 = 0x4030_2000;
pub const BOARD_VGA_BASE: u32 = 0x4110_0000;
pub const BOARD_VGA_SIZE: u32 = 0x0020_0000;
pub const BOARD_GPIO_BASE: u32 = 0x4010_0000;
pub const BOARD_GPIO_COUNT: u32 = 4;
pub const BOARD_ETHERNET_BASE: u32 = 0x4220_0000;
pub const BOARD_ETHERNET_SIZE: u32 = 0x0010_0000;
