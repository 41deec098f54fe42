//! Support code for the `critsect` binary.
//!
//! - [`ExitCode`]: semantic process exit codes
//! - [`CliError`]: structured errors with an exit code attached
//! - [`OutputFormat`] and the human renderers for driver reports

mod error;
mod exit;
mod output;

pub use error::CliError;
pub use exit::ExitCode;
pub use output::{
    OutputFormat, SEPARATOR, UNOPTIMIZED_BUILD_WARNING, parse_output_format, render_comparison,
    render_run,
};
