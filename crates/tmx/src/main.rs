use std::process::ExitCode;

use anyhow::Result;
use face_dispatch::ColorMode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TMX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = tmx::cli(ColorMode::Auto)?;
    let result = cli.run(std::env::args().skip(1))?;
    Ok(ExitCode::from(u8::try_from(result.exit_code()).unwrap_or(1)))
}
