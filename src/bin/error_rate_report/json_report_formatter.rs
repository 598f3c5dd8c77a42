use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use asr_metrics::alignment::report::Report;

pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report output directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create report file '{}': {err}", path.display()))?;
    write_pretty(&mut file, report)
        .map_err(|err| format!("Failed to write report file '{}': {err}", path.display()))
}

pub fn print_report(report: &Report) -> Result<(), String> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_pretty(&mut lock, report).map_err(|err| format!("Failed to write report to stdout: {err}"))
}

fn write_pretty(writer: &mut impl Write, report: &Report) -> Result<(), String> {
    serde_json::to_writer_pretty(&mut *writer, report)
        .map_err(|err| format!("serialize report JSON: {err}"))?;
    writer
        .write_all(b"\n")
        .map_err(|err| format!("finalize report: {err}"))?;
    writer.flush().map_err(|err| format!("flush report: {err}"))
}
