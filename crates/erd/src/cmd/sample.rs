use erd_rpc::Client;

use crate::cmd::SampleArgs;
use crate::exit::{rpc_error, CliResult, SUCCESS};
use crate::output::{print_reading, OutputFormat};

pub fn run(args: SampleArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client =
        Client::connect(args.socket.resolve()).map_err(|err| rpc_error("connect failed", err))?;
    let reading = client
        .obtain_readings()
        .map_err(|err| rpc_error("sample failed", err))?;
    print_reading(&reading, format);
    Ok(SUCCESS)
}
