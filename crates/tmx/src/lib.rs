//! `tmx`: file metrics, dispatched through a `face-dispatch` command tree.
//!
//! ```text
//! tmx file-metrics line-count [opts] [PATH [PATH [...]]]
//! ```

pub mod file_metrics;

use face_dispatch::{BuildError, Cli, ColorMode};

/// Builds the `tmx` command tree.
pub fn cli(colors: ColorMode) -> Result<Cli, BuildError> {
    Cli::builder()
        .program_name("tmx")
        .version(env!("CARGO_PKG_VERSION"))
        .colors(colors)
        .namespace("file-metrics", file_metrics::namespace)
        .build()
}
