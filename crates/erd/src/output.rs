use std::io::IsTerminal;
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use erd_sensor::{Attributes, Difference, Reading, ResolvedSensor};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReadingOutput {
    timestamp_ns: i64,
    energy_uj: u64,
}

#[derive(Serialize)]
struct DifferenceOutput {
    duration_ns: i64,
    energy_uj: u64,
    energy_j: f64,
    average_watts: Option<f64>,
}

#[derive(Serialize)]
struct SensorOutput<'a> {
    domain: String,
    socket: u32,
    path: &'a Path,
    max_energy_uj: u64,
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: &[&str], row: Vec<String>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec())
        .add_row(row);
    println!("{table}");
}

pub fn print_reading(reading: &Reading, format: OutputFormat) {
    let out = ReadingOutput {
        timestamp_ns: reading.timestamp.as_nanos(),
        energy_uj: reading.energy.as_u64(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["TIMESTAMP (ns)", "ENERGY (uJ)"],
            vec![out.timestamp_ns.to_string(), out.energy_uj.to_string()],
        ),
        OutputFormat::Pretty => {
            println!("timestamp={}ns energy={}uJ", out.timestamp_ns, out.energy_uj);
        }
    }
}

pub fn print_difference(diff: &Difference, format: OutputFormat) {
    let out = DifferenceOutput {
        duration_ns: diff.duration_ns,
        energy_uj: diff.energy_consumed.as_u64(),
        energy_j: diff.energy_consumed.as_joules_f64(),
        average_watts: diff.average_watts(),
    };
    let watts = out
        .average_watts
        .map(|w| format!("{w:.3}"))
        .unwrap_or_else(|| "n/a".to_string());
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["DURATION (ns)", "ENERGY (uJ)", "ENERGY (J)", "AVG POWER (W)"],
            vec![
                out.duration_ns.to_string(),
                out.energy_uj.to_string(),
                format!("{:.6}", out.energy_j),
                watts,
            ],
        ),
        OutputFormat::Pretty => {
            println!(
                "duration={}ns energy={}uJ ({:.6}J) power={}W",
                out.duration_ns, out.energy_uj, out.energy_j, watts
            );
        }
    }
}

pub fn print_sensor(attrs: Attributes, sensor: &ResolvedSensor, format: OutputFormat) {
    let out = SensorOutput {
        domain: attrs.domain.to_string(),
        socket: attrs.socket,
        path: &sensor.path,
        max_energy_uj: sensor.max_energy.as_u64(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["DOMAIN", "SOCKET", "PATH", "MAX (uJ)"],
            vec![
                out.domain.clone(),
                out.socket.to_string(),
                out.path.display().to_string(),
                out.max_energy_uj.to_string(),
            ],
        ),
        OutputFormat::Pretty => {
            println!(
                "{} socket={} path={} max={}uJ",
                out.domain,
                out.socket,
                out.path.display(),
                out.max_energy_uj
            );
        }
    }
}
