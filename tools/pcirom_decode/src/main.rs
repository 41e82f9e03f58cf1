#![forbid(unsafe_code)]

mod report;

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pcirom::{decode_rom, sane_strings, DecodeOptions, IdentifierDatabase};

use report::FileReport;

#[derive(Debug, Parser)]
#[command(name = "pcirom-decode")]
#[command(about = "Identify the images inside PCI expansion (option) ROM dumps")]
struct Cli {
    /// ROM dump(s) to decode.
    #[arg(required = true, value_name = "ROM")]
    roms: Vec<PathBuf>,

    /// Vendor/device database in pci.ids format.
    #[arg(long, env = "PCIROM_IDS", value_name = "PATH", default_value = "pci.ids")]
    ids: PathBuf,

    /// Class database (the `C xx` sections of pci.ids).
    #[arg(
        long,
        env = "PCIROM_CLASSES",
        value_name = "PATH",
        default_value = "pciclasses.ids"
    )]
    classes: PathBuf,

    /// Also list printable strings found anywhere in each file.
    #[arg(short = 't', long)]
    strings: bool,

    /// Do not scan for misplaced headers; a missing 0x55AA header or wrong PCIR pointer ends the
    /// chain instead.
    #[arg(long)]
    strict: bool,

    /// Print one JSON document per file instead of text.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            fallback_scan: !self.strict,
            ..DecodeOptions::default()
        }
    }

    /// A database file that fails to load only costs names, so it is a warning.
    fn load_database(&self) -> IdentifierDatabase {
        let mut ids = IdentifierDatabase::new();
        for path in [&self.ids, &self.classes] {
            if let Err(err) = ids.load_file(path) {
                tracing::warn!("{err}; affected names will be reported as unknown");
            }
        }
        ids
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let ids = cli.load_database();
    let options = cli.decode_options();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for path in &cli.roms {
        let rom = fs::read(path).with_context(|| format!("read ROM file {}", path.display()))?;
        tracing::debug!("{}: {} bytes", path.display(), rom.len());

        let report = FileReport {
            path,
            size: rom.len(),
            result: decode_rom(&rom, &ids, &options).map_err(|err| err.to_string()),
            strings: cli.strings.then(|| sane_strings(&rom)),
        };

        if cli.json {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        } else {
            report.render(&mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
