use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod check;
pub mod scan;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a byte stream and print every matched frame.
    Scan(ScanArgs),
    /// Validate a frame config and print the frame shapes.
    Check(CheckArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Scan(args) => scan::run(args, format),
        Command::Check(args) => check::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Frame config file (JSON).
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: PathBuf,
    /// Read from a file or device instead of stdin.
    #[arg(long, short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Only print these frame ids (comma-separated). Default: all.
    #[arg(long, value_delimiter = ',')]
    pub frames: Option<Vec<u32>>,
    /// Exit after printing this many frames.
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
    /// Bytes requested per read.
    #[arg(long, default_value = "8192")]
    pub read_size: usize,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Frame config file (JSON).
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}
