use erd_sensor::resolve_sensor;

use crate::cmd::ResolveArgs;
use crate::exit::{sensor_error, CliResult, SUCCESS};
use crate::output::{print_sensor, OutputFormat};

pub fn run(args: ResolveArgs, format: OutputFormat) -> CliResult<i32> {
    let attrs = args.sensor.attributes();
    let sensor = resolve_sensor(attrs, &args.sensor.roots())
        .map_err(|err| sensor_error("resolve failed", err))?;
    print_sensor(attrs, &sensor, format);
    Ok(SUCCESS)
}
