// Copyright 2026 hubio developers
// Licensed under the Apache-2.0 and MIT licenses.

use std::{io::Write, fs::File, time::{Instant, Duration}};
use clap::{Command, Arg, ArgAction, ArgMatches, crate_description, crate_version, value_parser};
use clap_num::maybe_hex;
use anyhow::{bail, Context};

use hubio::{Board, Bitstream, Connector, DeviceId, TcpProbe, UsbProbe};

fn main() -> anyhow::Result<()> {
    let matches = Command::new("hubio")
        .version(crate_version!())
        .about(crate_description!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .propagate_version(true)
        .infer_subcommands(true)
        .arg(Arg::new("quiet")
             .help("Suppress informative output and raise log level to errors only")
             .long("quiet")
             .short('q')
             .action(ArgAction::SetTrue)
             .global(true))
        .arg(Arg::new("verbose")
             .help("Increase log level, specify once for info, twice for debug, three times for trace")
             .long("verbose")
             .short('v')
             .action(ArgAction::Count)
             .conflicts_with("quiet")
             .global(true))
        .arg(Arg::new("probe")
             .help("VID:PID of the FTDI bridge to use")
             .long("probe")
             .short('p')
             .action(ArgAction::Set)
             .global(true))
        .arg(Arg::new("tcp")
             .help("HOST:PORT of a networked board, used instead of USB")
             .long("tcp")
             .action(ArgAction::Set)
             .conflicts_with("probe")
             .global(true))
        .arg(Arg::new("timeout")
             .help("Timeout for each transfer in milliseconds")
             .long("timeout")
             .action(ArgAction::Set)
             .default_value("1000")
             .value_parser(value_parser!(u64))
             .global(true))
        .subcommand(Command::new("idcode")
            .about("Read the FPGA's JTAG IDCODE"))
        .subcommand(Command::new("program")
            .about("Configure the FPGA with a bitstream")
            .arg(Arg::new("file")
                 .help("Bitstream file to program")
                 .required(true)))
        .subcommand(Command::new("read")
            .about("Read registers through the FIFO interface")
            .arg(Arg::new("port")
                 .help("Port to read from")
                 .long("port")
                 .value_parser(value_parser!(u8))
                 .default_value("0"))
            .arg(Arg::new("address")
                 .help("Start address (decimal, or hex with 0x prefix)")
                 .long("address")
                 .short('a')
                 .value_parser(maybe_hex::<u64>)
                 .default_value("0"))
            .arg(Arg::new("length")
                 .help("Number of bytes to read (decimal, or hex with 0x prefix)")
                 .long("length")
                 .short('l')
                 .value_parser(maybe_hex::<usize>)
                 .default_value("4"))
            .arg(Arg::new("increment")
                 .help("Read every chunk from the start address")
                 .long("no-increment")
                 .action(ArgAction::SetFalse))
            .arg(Arg::new("file")
                 .help("File to save data to, printed as words if omitted")))
        .subcommand(Command::new("write")
            .about("Write a file to registers through the FIFO interface")
            .arg(Arg::new("port")
                 .help("Port to write to")
                 .long("port")
                 .value_parser(value_parser!(u8))
                 .default_value("0"))
            .arg(Arg::new("address")
                 .help("Start address (decimal, or hex with 0x prefix)")
                 .long("address")
                 .short('a')
                 .value_parser(maybe_hex::<u64>)
                 .default_value("0"))
            .arg(Arg::new("increment")
                 .help("Write every chunk to the start address")
                 .long("no-increment")
                 .action(ArgAction::SetFalse))
            .arg(Arg::new("file")
                 .help("File to write")
                 .required(true)))
        .subcommand(Command::new("edge")
            .about("Pulse bits of the edge register")
            .arg(Arg::new("address")
                 .help("Edge register address (decimal, or hex with 0x prefix)")
                 .long("address")
                 .short('a')
                 .value_parser(maybe_hex::<u64>)
                 .default_value("0"))
            .arg(Arg::new("mask")
                 .help("Bits to pulse (decimal, or hex with 0x prefix)")
                 .long("mask")
                 .short('m')
                 .value_parser(maybe_hex::<u32>)
                 .default_value("1"))
            .arg(Arg::new("value")
                 .help("Current register value (decimal, or hex with 0x prefix)")
                 .long("value")
                 .value_parser(maybe_hex::<u32>)
                 .default_value("0"))
            .arg(Arg::new("falling")
                 .help("Generate a falling edge instead of a rising one")
                 .long("falling")
                 .action(ArgAction::SetTrue)))
        .subcommand(Command::new("flush")
            .about("Drain stale data and purge the bridge buffers"))
        .get_matches();

    let t0 = Instant::now();
    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_count("verbose");
    let env = if quiet {
        env_logger::Env::default().default_filter_or("error")
    } else if verbose == 0 {
        env_logger::Env::default().default_filter_or("warn")
    } else if verbose == 1 {
        env_logger::Env::default().default_filter_or("info")
    } else if verbose == 2 {
        env_logger::Env::default().default_filter_or("debug")
    } else {
        env_logger::Env::default().default_filter_or("trace")
    };
    env_logger::Builder::from_env(env).format_timestamp(None).init();

    let timeout = Duration::from_millis(matches.get_one::<u64>("timeout").copied().unwrap_or(1000));
    let tcp = match matches.get_one::<String>("tcp") {
        Some(addr) => Some(TcpProbe::new(addr.as_str())?.with_timeout(timeout)),
        None => None,
    };
    let probe = matches.get_one::<String>("probe");

    match matches.subcommand() {
        Some(("idcode", _)) => {
            if tcp.is_some() {
                bail!("IDCODE can only be read over USB JTAG.");
            }
            let mut board = Board::usb(usb_probe(probe, UsbProbe::mpsse(), timeout)?);
            let mut session = board.start()?;
            session.flush()?;
            let mut tap = session.jtag();
            tap.setup()?;
            tap.idle()?;
            let idcode = tap.idcode()?;
            match DeviceId::from_idcode(idcode) {
                Some(device) => println!("Read IDCODE: 0x{idcode:07X} [{}]", device.name()),
                None => println!("Read IDCODE: 0x{idcode:07X}"),
            }
        },
        Some(("program", matches)) => {
            let path = match matches.get_one::<String>("file") {
                Some(path) => path,
                None => bail!("No bitstream file given."),
            };
            match tcp {
                Some(tcp) => {
                    let data = std::fs::read(path)
                        .with_context(|| format!("Could not read {path}"))?;
                    if !quiet { println!("Sending {} bytes to {}", data.len(), tcp) };
                    let mut board = Board::tcp(tcp);
                    board.start()?.fifo().program(&data)?;
                },
                None => {
                    let bitstream = Bitstream::from_path(path)?;
                    let mut board = Board::usb(usb_probe(probe, UsbProbe::mpsse(), timeout)?);
                    let mut session = board.start()?;
                    session.flush()?;
                    let mut tap = session.jtag();
                    tap.setup()?;
                    tap.idle()?;
                    if quiet {
                        tap.configure(bitstream.data())?;
                    } else {
                        tap.configure_progress(bitstream.data())?;
                    }
                },
            }
        },
        Some((command, matches)) => match tcp {
            Some(tcp) => run_fifo(Board::tcp(tcp), command, matches, quiet)?,
            None => {
                let probe = usb_probe(probe, UsbProbe::fifo(), timeout)?;
                run_fifo(Board::usb(probe), command, matches, quiet)?
            },
        },
        None => bail!("No command given."),
    }

    let t1 = t0.elapsed();
    if !quiet {
        println!("Finished in {}.{:02}s", t1.as_secs(), t1.subsec_millis()/10);
    }

    Ok(())
}

fn usb_probe(specifier: Option<&String>, preset: UsbProbe, timeout: Duration)
    -> anyhow::Result<UsbProbe>
{
    let probe = match specifier {
        Some(specifier) => preset.with_specifier(specifier)?,
        None => preset,
    };
    Ok(probe.with_timeout(timeout))
}

/// Commands which only need the FIFO path, over either backend.
fn run_fifo<C: Connector>(mut board: Board<C>, command: &str, matches: &ArgMatches, quiet: bool)
    -> anyhow::Result<()>
{
    let mut session = board.start()?;
    match command {
        "flush" => {
            session.flush()?;
            if !quiet { println!("Flushed receive path and purged buffers.") };
        },
        "read" => {
            let port = matches.get_one::<u8>("port").copied().unwrap_or(0);
            let address = matches.get_one::<u64>("address").copied().unwrap_or(0);
            let length = matches.get_one::<usize>("length").copied().unwrap_or(4);
            let increment = matches.get_flag("increment");
            let path = matches.get_one::<String>("file");
            let mut fifo = session.fifo();
            let data = if quiet || path.is_none() {
                let mut data = vec![0u8; length];
                fifo.read(&mut data, port, address, increment)?;
                data
            } else {
                fifo.read_progress(length, port, address, increment)?
            };
            match path {
                Some(path) => File::create(path)?.write_all(&data)?,
                None => print_words(&data, fifo.framing().unit_bytes, address, increment),
            }
        },
        "write" => {
            let port = matches.get_one::<u8>("port").copied().unwrap_or(0);
            let address = matches.get_one::<u64>("address").copied().unwrap_or(0);
            let increment = matches.get_flag("increment");
            let path = match matches.get_one::<String>("file") {
                Some(path) => path,
                None => bail!("No input file given."),
            };
            let data = std::fs::read(path).with_context(|| format!("Could not read {path}"))?;
            let mut fifo = session.fifo();
            if quiet {
                fifo.write(&data, port, address, increment)?;
            } else {
                fifo.write_progress(&data, port, address, increment)?;
            }
        },
        "edge" => {
            let address = matches.get_one::<u64>("address").copied().unwrap_or(0);
            let mask = matches.get_one::<u32>("mask").copied().unwrap_or(1);
            let value = matches.get_one::<u32>("value").copied().unwrap_or(0);
            let positive = !matches.get_flag("falling");
            let value = session.fifo().edge(value, mask, positive, address)?;
            if !quiet { println!("Edge register now 0x{value:08X}") };
        },
        _ => bail!("Unhandled command."),
    }
    Ok(())
}

fn print_words(data: &[u8], unit: usize, address: u64, increment: bool) {
    for (idx, word) in data.chunks(unit).enumerate() {
        let value = word.iter().rev().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        let address = if increment { address + idx as u64 } else { address };
        println!("0x{address:06X}: 0x{value:0width$X}", width = 2 * word.len());
    }
}
