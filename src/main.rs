// SPDX-License-Identifier: GPL-3.0-or-later

use clap::Parser;
use log::{Level, Log, Metadata, Record};

use polyfish::{misc, uci, ucioption};

#[derive(Parser)]
#[command(name = "polyfish", about = "UCI chess engine for chess and lichess-style variants")]
struct Args {
    /// Number of search threads
    #[arg(long)]
    threads: Option<u32>,

    /// Transposition table size in megabytes
    #[arg(long)]
    hash: Option<u32>,

    /// Variant to play (chess, atomic, crazyhouse, ...)
    #[arg(long)]
    variant: Option<String>,
}

fn level_to_char(level: Level) -> char {
    match level {
        Level::Trace => 'T',
        Level::Debug => 'D',
        Level::Info => 'I',
        Level::Warn => 'W',
        Level::Error => 'E',
    }
}

// Diagnostics go to stderr so that stdout stays a clean protocol stream.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!("{} {}", level_to_char(record.level()), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() {
    log::set_logger(&LOGGER).expect("logger already installed");
    log::set_max_level(log::LevelFilter::Info);

    println!("{}", misc::engine_info(false));

    polyfish::init();

    let args = Args::parse();
    if let Some(threads) = args.threads {
        ucioption::set("Threads", &threads.to_string());
    }
    if let Some(hash) = args.hash {
        ucioption::set("Hash", &hash.to_string());
    }
    if let Some(variant) = args.variant {
        ucioption::set("UCI_Variant", &variant);
    }

    uci::cmd_loop();
}
