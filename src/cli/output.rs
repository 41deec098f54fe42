//! Output formats and human-readable report rendering.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::bench::{ComparisonReport, RunReport};

/// Printed between the two runs of a comparison.
pub const SEPARATOR: &str = "=========================================";

/// Printed first when the binary was built without optimizations.
pub const UNOPTIMIZED_BUILD_WARNING: &str =
    "WARNING: It's probably better to run this test in an optimized release build...";

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Plain text, one field per line.
    #[default]
    Human,
    /// Compact JSON, one document per invocation.
    Json,
    /// Indented JSON.
    JsonPretty,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            _ => Err(format!(
                "unknown output format '{s}' (expected human, json, json-pretty)"
            )),
        }
    }
}

/// Parser suitable for clap's `value_parser`.
pub fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

/// Renders one run the way the comparison tool has always printed it.
#[must_use]
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Starting test with a {} critical section:",
        report.lock.description()
    );
    if let Some(backend) = report.backend {
        let _ = writeln!(out, "Backend: {backend}");
    }
    let _ = writeln!(out, "Threads: {}", report.workers);
    let _ = writeln!(out, "Iterations per thread: {}", report.iterations_per_worker);
    let _ = writeln!(out, "Runtime: {} ms", report.elapsed.as_millis());
    out
}

/// Renders both runs separated by [`SEPARATOR`].
#[must_use]
pub fn render_comparison(report: &ComparisonReport) -> String {
    let mut out = render_run(&report.native);
    let _ = writeln!(out, "{SEPARATOR}\n");
    out.push_str(&render_run(&report.custom));
    let _ = writeln!(out, "\nSlowdown: {:.2}x", report.slowdown());
    out
}
