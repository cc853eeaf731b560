mod progress;
mod styling;
mod tables;

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::config::OutputFormat;
use crate::teamcity::MutedTests;

pub use progress::RequestProgress;
use styling::Tone;

/// Prints the `tcrest` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        Tone::Heading.paint("🏗️ tcrest"),
        Tone::Muted.paint(env!("CARGO_PKG_VERSION")),
        Tone::Muted.paint("TeamCity REST client")
    );
}

pub fn write_json<T: Serialize + ?Sized>(
    value: &T,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(output, "{}", json)?;
    Ok(())
}

/// Writes muted tests either as a table or as a JSON object keyed by test name.
pub fn write_muted_tests(
    muted: &MutedTests,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Table if muted.is_empty() => {
            writeln!(output, "No muted tests")?;
        }
        OutputFormat::Table => {
            writeln!(output, "{}", tables::muted_tests_table(muted))?;
        }
        OutputFormat::Json => {
            write_json(muted, pretty, output)?;
        }
    }
    Ok(())
}
