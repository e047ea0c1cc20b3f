//! Entrypoint for CLI
use std::{env, error::Error, fs, time::Duration};

use log::info;
use okto::{prelude::*, IMPL_VERSION};

static USAGE: &str = r#"
usage: okto CMD [FILE]

commands:
    run     Run the target ROM file
    run64   Run a base64-encoded ROM file

examples:
    okto run breakout.rom
    okto run64 breakout.rom.b64
"#;

/// How long a ROM is allowed to run before the CLI gives up and prints
/// the display. Interactive hosts would loop forever instead.
const RUN_BUDGET: Duration = Duration::from_secs(5);

fn run_rom(filepath: &str, base64: bool) -> Result<(), Box<dyn Error>> {
    let machine = Machine::new(MachineConf::default());

    if base64 {
        let encoded = fs::read_to_string(filepath)?;
        machine.load_rom_base64(&encoded)?;
    } else {
        let bytes = fs::read(filepath)?;
        machine.load_rom(&bytes)?;
    }

    info!("running {filepath}");
    machine.run_for(RUN_BUDGET);

    println!("{}", machine.dump_display()?);

    if let Some(err) = machine.halt_reason() {
        return Err(Box::new(err));
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Run { filepath, base64 }) => run_rom(&filepath, base64)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next()?.as_str() {
        "run" => Some(Cmd::Run {
            filepath: args.next()?,
            base64: false,
        }),
        "run64" => Some(Cmd::Run {
            filepath: args.next()?,
            base64: true,
        }),
        _ => None,
    }
}

fn print_usage() {
    println!("Okto v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run a ROM file
    Run { filepath: String, base64: bool },
}
