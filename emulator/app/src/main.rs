/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the MPS2 TrustZone board emulator.

--*/

use clap::Parser;
use emulator::{Emulator, EmulatorArgs};
use std::io;

fn main() -> io::Result<()> {
    let cli = EmulatorArgs::parse();
    let _ = simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init();

    let emulator = Emulator::from_args(&cli)?;
    emulator.run(&cli, &mut io::stdout().lock())
}
