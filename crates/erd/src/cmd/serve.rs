use std::path::PathBuf;

use erd_rpc::{Daemon, DaemonConfig};
use erd_sensor::{Reader, ReaderConfig};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{rpc_error, sensor_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let attrs = args.sensor.attributes();
    let config = ReaderConfig {
        backend: args.backend,
        roots: args.sensor.roots(),
        clock: args.clock,
    };
    let reader =
        Reader::new(attrs, &config).map_err(|err| sensor_error("failed to open sensor", err))?;

    let mut socket = args.socket.config();
    if args.unique {
        socket = socket.unique();
    }
    let path = socket.resolve();

    let mut daemon = Daemon::bind(&path, reader, DaemonConfig::default())
        .map_err(|err| rpc_error("bind failed", err))?;
    install_ctrlc_handler(path)?;

    daemon.run().map_err(|err| rpc_error("daemon stopped", err))?;
    Ok(SUCCESS)
}

/// Remove the socket file and exit on Ctrl-C or SIGTERM.
fn install_ctrlc_handler(path: PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        info!(path = %path.display(), "shutting down");
        let _ = std::fs::remove_file(&path);
        std::process::exit(SUCCESS);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
