/*++

Licensed under the Apache-2.0 license.

File Name:

    emulator.rs

Abstract:

    File contains the command line arguments and the Emulator struct driving
    a board from them.

--*/

use crate::board::{BoardArgs, BoardKind, Mps2TzBoard};
use clap::Parser;
use clap_num::maybe_hex;
use emulator_bus::BusError;
use emulator_types::{RvData, RvSize, TxAttrs};
use std::io::{self, Write};

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, name = "MPS2 TrustZone Emulator")]
pub struct EmulatorArgs {
    /// Board to assemble.
    #[arg(short, long, default_value_t = BoardKind::An505)]
    pub board: BoardKind,

    /// CPU whose view of the address space is used.
    #[arg(short, long, default_value_t = 0)]
    pub cpu: usize,

    /// Print the flattened memory map of the CPU.
    #[arg(long, default_value_t = false)]
    pub dump_map: bool,

    /// Read a word at this address. May be repeated.
    #[arg(long, value_parser = maybe_hex::<u32>)]
    pub read: Vec<u32>,

    /// Issue the reads as non-secure transactions.
    #[arg(long, default_value_t = false)]
    pub nonsecure: bool,

    /// Issue the reads as unprivileged transactions.
    #[arg(long, default_value_t = false)]
    pub unprivileged: bool,

    /// Report the MPC lookup table changes made by a reset.
    #[arg(long, default_value_t = false)]
    pub mpc_notify_on_reset: bool,

    #[arg(long, default_value_t = log::LevelFilter::Warn)]
    pub log_level: log::LevelFilter,
}

pub struct Emulator {
    board: Mps2TzBoard,
    cpu: usize,
    attrs: TxAttrs,
}

impl Emulator {
    pub fn from_args(cli: &EmulatorArgs) -> io::Result<Self> {
        let board = Mps2TzBoard::new(BoardArgs {
            kind: cli.board,
            mpc_notify_on_reset: cli.mpc_notify_on_reset,
        })
        .and_then(|board| board.check_cpu(cli.cpu).map(|()| board))
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

        let mut attrs = if cli.nonsecure {
            TxAttrs::nonsecure()
        } else {
            TxAttrs::secure()
        };
        if cli.unprivileged {
            attrs = attrs.unprivileged();
        }
        Ok(Self {
            board,
            cpu: cli.cpu,
            attrs,
        })
    }

    pub fn board(&self) -> &Mps2TzBoard {
        &self.board
    }

    pub fn read_word(&self, addr: u32) -> Result<RvData, BusError> {
        self.board.read(self.cpu, RvSize::Word, addr, self.attrs)
    }

    pub fn dump_map(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{} cpu{} address space:", self.board.kind(), self.cpu)?;
        for range in self.board.flat_view(self.cpu) {
            writeln!(out, "  {range}")?;
        }
        Ok(())
    }

    /// Perform what the command line asked for, writing results to `out`.
    pub fn run(&self, cli: &EmulatorArgs, out: &mut impl Write) -> io::Result<()> {
        if cli.dump_map {
            self.dump_map(out)?;
        }
        for &addr in &cli.read {
            match self.read_word(addr) {
                Ok(val) => writeln!(out, "0x{addr:08x}: 0x{val:08x}")?,
                Err(err) => writeln!(out, "0x{addr:08x}: {err:?}")?,
            }
        }
        Ok(())
    }
}
