use clap::Parser;
use tailorgen::cli::{Args, Commands, commands};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tailorgen=info")),
        )
        .init();

    let args = Args::parse();
    info!("Starting tailorgen");

    match args.command {
        Commands::Generate {
            prompt_file,
            provider,
            format,
            timeout_ms,
            out,
            config,
        } => commands::generate(prompt_file, provider, format, timeout_ms, out, config).await,
        Commands::Status { config } => commands::status(config).await,
        Commands::ShowConfig => {
            tailorgen::settings::Settings::show_discovery_info();
            Ok(())
        }
    }
}
