//! CLI argument parsing and command dispatch.

pub mod args;
pub mod connect;
pub mod context;
pub mod login;
pub mod providers;
pub mod setup;
pub mod status;

pub use args::{Cli, Commands, OutputFormat};
pub use context::CommandContext;

use crate::error::Result;

/// Run the parsed command.
///
/// # Errors
///
/// Returns the command's failure.
pub async fn dispatch(command: &Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Setup => setup::execute(ctx).await,
        Commands::Status => status::execute(ctx).await,
        Commands::Providers(args) => providers::execute(args, ctx).await,
        Commands::Connect(args) => connect::execute(args, ctx).await,
        Commands::Login => login::execute_login(ctx),
        Commands::Logout => login::execute_logout(ctx),
    }
}
