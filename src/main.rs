use anyhow::Result;
use clap::Parser;
use karaoke_studio::{
    app,
    cli::{handle_favorites_command, handle_mix_command, Cli, CliCommand},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("karaoke-studio {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Mix(args)) => handle_mix_command(args).await,
        Some(CliCommand::Favorites) => handle_favorites_command().await,
        Some(CliCommand::Serve(args)) => app::run_service(args.into()).await,
        None => {
            eprintln!("Nothing to do. Try: karaoke-studio serve --track <url|path>");
            Ok(())
        }
    }
}
