/*++

Licensed under the Apache-2.0 license.

File Name:

    board.rs

Abstract:

    File contains the MPS2 TrustZone board assembly: the SSE subsystem, the
    board SSRAMs behind their MPCs and the board peripherals behind the
    expansion PPCs.

--*/

use caliptra_emu_bus::Ram;
use emulator_bus::{
    AddressMap, BusConverter, BusError, ClockSource, FlatRange, MapError, MmioRegion, RegionId,
};
use emulator_consts::*;
use emulator_periph::{
    MpcConfig, PeriphError, Ppc, PpcId, SplitIrq, TzMpc, TzPpc, UnimplementedDevice,
};
use emulator_sse::{ArmSse, ArmSseArgs, SseError, SseVariant};
use emulator_types::{HwAddr, RvData, RvSize, TxAttrs};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("cpu {cpu} does not exist, the board has {num_cpus} CPUs")]
    NoSuchCpu { cpu: usize, num_cpus: usize },
    #[error(transparent)]
    Sse(#[from] SseError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Periph(#[from] PeriphError),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumIter, EnumString)]
pub enum BoardKind {
    /// IoTKit on an MPS2+ FPGA image.
    #[strum(serialize = "an505")]
    An505,
    /// Dual-core SSE-200 on an MPS2+ FPGA image.
    #[strum(serialize = "an521")]
    An521,
}

impl BoardKind {
    pub fn variant(self) -> SseVariant {
        match self {
            BoardKind::An505 => SseVariant::IotKit,
            BoardKind::An521 => SseVariant::Sse200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardArgs {
    pub kind: BoardKind,
    pub mpc_notify_on_reset: bool,
}

impl Default for BoardArgs {
    fn default() -> Self {
        Self {
            kind: BoardKind::An505,
            mpc_notify_on_reset: false,
        }
    }
}

/// Expansion PPCs populated by the board, in sec_resp_cfg fan-out order.
const BOARD_PPCS: [PpcId; 5] = [
    PpcId::ApbExp(0),
    PpcId::ApbExp(1),
    PpcId::ApbExp(2),
    PpcId::AhbExp(0),
    PpcId::AhbExp(1),
];

/// The SSRAMs' MPC register blocks sit on the first ports of this PPC.
const SSRAM_MPC_PPC: PpcId = PpcId::ApbExp(0);

struct Ssram {
    name: &'static str,
    base: u32,
    size: u32,
}

const SSRAMS: [Ssram; 2] = [
    Ssram {
        name: "ssram-0",
        base: SSRAM0_BASE,
        size: SSRAM0_SIZE,
    },
    Ssram {
        name: "ssram-1",
        base: SSRAM1_BASE,
        size: SSRAM1_SIZE,
    },
];

struct BoardDevice {
    name: &'static str,
    addr: u32,
    size: u32,
    ppc: PpcId,
    port: usize,
}

const fn apb(name: &'static str, addr: u32, ppc: usize, port: usize) -> BoardDevice {
    BoardDevice {
        name,
        addr,
        size: PERIPH_BLOCK_SIZE,
        ppc: PpcId::ApbExp(ppc),
        port,
    }
}

const fn ahb(name: &'static str, addr: u32, size: u32, ppc: usize, port: usize) -> BoardDevice {
    BoardDevice {
        name,
        addr,
        size,
        ppc: PpcId::AhbExp(ppc),
        port,
    }
}

const BOARD_DEVICES: &[BoardDevice] = &[
    apb("uart0", BOARD_UART_BASE, 1, 0),
    apb("uart1", BOARD_UART_BASE + BOARD_UART_STRIDE, 1, 1),
    apb("uart2", BOARD_UART_BASE + 2 * BOARD_UART_STRIDE, 1, 2),
    apb("uart3", BOARD_UART_BASE + 3 * BOARD_UART_STRIDE, 1, 3),
    apb("uart4", BOARD_UART_BASE + 4 * BOARD_UART_STRIDE, 1, 4),
    apb("spi0", BOARD_SPI_BASE, 1, 5),
    apb("i2c0", BOARD_I2C_BASE, 1, 6),
    apb("scc", BOARD_SCC_BASE, 2, 0),
    apb("i2s-audio", BOARD_AUDIO_BASE, 2, 1),
    apb("fpgaio", BOARD_FPGAIO_BASE, 2, 2),
    ahb("gpio0", BOARD_GPIO_BASE, PERIPH_BLOCK_SIZE, 0, 0),
    ahb("gpio1", BOARD_GPIO_BASE + PERIPH_BLOCK_SIZE, PERIPH_BLOCK_SIZE, 0, 1),
    ahb("gpio2", BOARD_GPIO_BASE + 2 * PERIPH_BLOCK_SIZE, PERIPH_BLOCK_SIZE, 0, 2),
    ahb("gpio3", BOARD_GPIO_BASE + 3 * PERIPH_BLOCK_SIZE, PERIPH_BLOCK_SIZE, 0, 3),
    ahb("eth", BOARD_ETHERNET_BASE, BOARD_ETHERNET_SIZE, 0, 4),
    ahb("vga", BOARD_VGA_BASE, BOARD_VGA_SIZE, 1, 0),
];

fn map_at(
    map: &mut AddressMap,
    container: RegionId,
    addr: u32,
    region: MmioRegion,
) -> Result<(), MapError> {
    let id = map.add_mmio(region);
    map.map(container, addr as HwAddr, id, 0)
}

fn builder(builders: &mut [(PpcId, TzPpc)], id: PpcId) -> &mut TzPpc {
    match builders.iter_mut().find(|(ppc, _)| *ppc == id) {
        Some((_, builder)) => builder,
        None => unreachable!("{id:?} is not populated on the board"),
    }
}

/// An MPS2+ board with an AN505 or AN521 FPGA image.
pub struct Mps2TzBoard {
    kind: BoardKind,
    sse: ArmSse,
    ssram_mpcs: Vec<TzMpc>,
    ppcs: Vec<(PpcId, Ppc)>,
}

impl Mps2TzBoard {
    pub fn new(args: BoardArgs) -> Result<Self, BoardError> {
        let mut sse = ArmSse::new(ArmSseArgs {
            variant: args.kind.variant(),
            main_clock: Some(ClockSource::new("MAINCLK", MPS2_MAINCLK_HZ)),
            s32k_clock: Some(ClockSource::new("S32KCLK", S32KCLK_HZ)),
            mpc_notify_on_reset: args.mpc_notify_on_reset,
            ..Default::default()
        })?;
        let container = sse.container();

        let mut builders: Vec<(PpcId, TzPpc)> = BOARD_PPCS
            .iter()
            .map(|&id| (id, TzPpc::new(&ppc_name(id))))
            .collect();
        // Address, PPC and port of everything that sits behind a board PPC.
        let mut gated = vec![];

        let mut ssram_mpcs = vec![];
        for (n, ssram) in SSRAMS.iter().enumerate() {
            let ram = MmioRegion::from_device(
                ssram.name,
                ssram.size as HwAddr,
                BusConverter::new(Box::new(Ram::new(vec![0; ssram.size as usize]))),
            );
            let mpc = TzMpc::new(
                &format!("{}-mpc", ssram.name),
                ram,
                MpcConfig {
                    block_size: SSRAM_MPC_BLOCK_SIZE,
                    notify_on_reset: args.mpc_notify_on_reset,
                },
            )?;
            map_at(sse.address_map_mut(), container, ssram.base, mpc.upstream())?;
            builder(&mut builders, SSRAM_MPC_PPC).bind(n, mpc.regs())?;
            gated.push((SSRAM_MPC_REGS_BASE[n], SSRAM_MPC_PPC, n));
            mpc.irq().connect(sse.mpcexp_status_in(n));
            ssram_mpcs.push(mpc);
        }

        for dev in BOARD_DEVICES {
            let size = dev.size as HwAddr;
            let region =
                MmioRegion::from_device(dev.name, size, UnimplementedDevice::new(dev.name, size));
            builder(&mut builders, dev.ppc).bind(dev.port, region)?;
            gated.push((dev.addr, dev.ppc, dev.port));
        }

        let ppcs = builders
            .into_iter()
            .map(|(id, builder)| Ok((id, builder.realize()?)))
            .collect::<Result<Vec<_>, PeriphError>>()?;
        for (addr, id, port) in gated {
            let Some((_, ppc)) = ppcs.iter().find(|(ppc, _)| *ppc == id) else {
                continue;
            };
            if let Some(upstream) = ppc.upstream(port) {
                map_at(sse.address_map_mut(), container, addr, upstream.clone())?;
            }
        }

        let sec_resp_split = SplitIrq::new(ppcs.len())?;
        sse.sec_resp_cfg().connect(sec_resp_split.input());
        for (n, (id, ppc)) in ppcs.iter().enumerate() {
            sse.ppcexp_pins(*id).connect(ppc);
            sec_resp_split.output(n).connect(ppc.cfg_sec_resp_in());
            ppc.irq().connect(sse.ppcexp_status_in(*id));
        }

        let board = Self {
            kind: args.kind,
            sse,
            ssram_mpcs,
            ppcs,
        };
        board.reset();
        log::info!(
            "{}: {} board PPCs, {} SSRAMs",
            board.kind,
            board.ppcs.len(),
            board.ssram_mpcs.len()
        );
        Ok(board)
    }

    pub fn kind(&self) -> BoardKind {
        self.kind
    }

    pub fn sse(&self) -> &ArmSse {
        &self.sse
    }

    pub fn num_cpus(&self) -> usize {
        self.sse.num_cpus()
    }

    pub fn check_cpu(&self, cpu: usize) -> Result<(), BoardError> {
        if cpu < self.num_cpus() {
            Ok(())
        } else {
            Err(BoardError::NoSuchCpu {
                cpu,
                num_cpus: self.num_cpus(),
            })
        }
    }

    pub fn read(
        &self,
        cpu: usize,
        size: RvSize,
        addr: u32,
        attrs: TxAttrs,
    ) -> Result<RvData, BusError> {
        self.sse.read(cpu, size, addr, attrs)
    }

    pub fn write(
        &self,
        cpu: usize,
        size: RvSize,
        addr: u32,
        val: RvData,
        attrs: TxAttrs,
    ) -> Result<(), BusError> {
        self.sse.write(cpu, size, addr, val, attrs)
    }

    pub fn flat_view(&self, cpu: usize) -> Vec<FlatRange> {
        self.sse.flat_view(cpu)
    }

    pub fn ssram_mpc(&self, n: usize) -> &TzMpc {
        &self.ssram_mpcs[n]
    }

    pub fn ppc(&self, id: PpcId) -> Option<&Ppc> {
        self.ppcs
            .iter()
            .find(|(ppc, _)| *ppc == id)
            .map(|(_, ppc)| ppc)
    }

    pub fn advance_ns(&self, ns: u64) {
        self.sse.advance_ns(ns);
    }

    /// Reset the board devices, then the subsystem so the security
    /// controller drives its reset configuration into the board PPCs.
    pub fn reset(&self) {
        for (_, ppc) in &self.ppcs {
            ppc.reset();
        }
        for mpc in &self.ssram_mpcs {
            mpc.reset();
        }
        self.sse.reset();
    }
}

fn ppc_name(id: PpcId) -> String {
    match id {
        PpcId::Apb(n) => format!("apb-ppc{n}"),
        PpcId::ApbExp(n) => format!("apb-ppcexp{n}"),
        PpcId::AhbExp(n) => format!("ahb-ppcexp{n}"),
    }
}
