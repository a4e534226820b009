use std::path::PathBuf;

use clap::{Args, Subcommand};
use erd_sensor::{Attributes, Backend, ClockSource, Domain, SensorRoots};
use erd_transport::SocketPathConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod measure;
pub mod resolve;
pub mod sample;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daemon for one energy counter.
    Serve(ServeArgs),
    /// Print one reading from a running daemon.
    Sample(SampleArgs),
    /// Sample twice and print the energy consumed in between.
    Measure(MeasureArgs),
    /// Resolve a sensor locally and print its zone path.
    Resolve(ResolveArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Sample(args) => sample::run(args, format),
        Command::Measure(args) => measure::run(args, format),
        Command::Resolve(args) => resolve::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Clone)]
pub struct SensorArgs {
    /// RAPL domain: package, cores, uncore or dram.
    #[arg(long, default_value = "package")]
    pub domain: Domain,
    /// Physical package (socket) index.
    #[arg(long, default_value_t = 0)]
    pub socket: u32,
    /// Powercap root holding `intel-rapl:<n>` zones.
    #[arg(long, value_name = "DIR", hide = true)]
    pub powercap_root: Option<PathBuf>,
    /// CPU root holding `cpu<n>/topology`.
    #[arg(long, value_name = "DIR", hide = true)]
    pub cpu_root: Option<PathBuf>,
}

impl SensorArgs {
    pub fn attributes(&self) -> Attributes {
        Attributes::new(self.domain, self.socket)
    }

    pub fn roots(&self) -> SensorRoots {
        let defaults = SensorRoots::default();
        SensorRoots {
            powercap: self.powercap_root.clone().unwrap_or(defaults.powercap),
            cpu: self.cpu_root.clone().unwrap_or(defaults.cpu),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SocketArgs {
    /// Daemon socket path. Default: `$XDG_RUNTIME_DIR/erd.sock`, else `/tmp/erd.sock`.
    #[arg(long, value_name = "PATH", env = "ERD_SOCKET")]
    pub socket_path: Option<PathBuf>,
}

impl SocketArgs {
    pub fn config(&self) -> SocketPathConfig {
        let mut config = SocketPathConfig::from_env();
        if let Some(path) = &self.socket_path {
            config.override_path = Some(path.clone());
        }
        config
    }

    pub fn resolve(&self) -> PathBuf {
        self.config().resolve()
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub sensor: SensorArgs,
    #[command(flatten)]
    pub socket: SocketArgs,
    /// Reader backend: powercap or nop.
    #[arg(long, default_value = "powercap")]
    pub backend: Backend,
    /// Clock used to timestamp readings: monotonic or realtime.
    #[arg(long, default_value = "monotonic")]
    pub clock: ClockSource,
    /// Use a per-process socket name (`erd-<pid>.sock`).
    #[arg(long)]
    pub unique: bool,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[command(flatten)]
    pub socket: SocketArgs,
}

#[derive(Args, Debug)]
pub struct MeasureArgs {
    #[command(flatten)]
    pub socket: SocketArgs,
    /// Time between the two samples (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub sensor: SensorArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
