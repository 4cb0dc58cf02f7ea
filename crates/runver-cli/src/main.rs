mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "runver",
    about = "Deploy a versioned Next.js app to its own Cloud Run service"
)]
#[command(version)]
struct Cli {
    /// Version to deploy, usually the branch name (e.g. feature-x)
    #[arg(value_name = "VERSION")]
    app_version: String,

    /// Log verbosity
    #[arg(
        long,
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&cli.log_level)?)
        .with_writer(std::io::stderr)
        .init();

    commands::deploy(&cli.app_version).await
}
