//! healthlink - Health account registration and wearable provider linking.
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use healthlink::cli::{self, Cli, CommandContext, OutputFormat};
use healthlink::core::logging::{self, LogSettings};
use healthlink::error::HealthLinkError;
use healthlink::storage::config::{ENV_VERBOSE, ResolvedConfig, is_env_truthy};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = cli.verbose || is_env_truthy(ENV_VERBOSE);
    logging::init(&LogSettings::resolve(
        cli.log_level.as_deref(),
        cli.json_output,
        verbose,
    ));
    tracing::debug!(command = cli.command.name(), version = env!("CARGO_PKG_VERSION"), "Starting");

    let config = match ResolvedConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => return fail(&e, cli.effective_format(), cli.no_color, cli.pretty),
    };

    let ctx = CommandContext::new(&cli, config);
    match cli::dispatch(&cli.command, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e, ctx.output.format, ctx.output.no_color, ctx.output.pretty),
    }
}

fn fail(error: &HealthLinkError, format: OutputFormat, no_color: bool, pretty: bool) -> ExitCode {
    tracing::debug!(error = %error, error_code = error.error_code(), "Command failed");
    let rendered = healthlink::render::error::render_error(error, format, no_color, pretty);
    eprintln!("{rendered}");
    ExitCode::from(error.exit_code() as u8)
}
