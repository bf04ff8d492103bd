use anyhow::Context;
use clap::Parser;

use accountd::{app, config, dynamo, state::AppState, telemetry};

/// Account registration and login service
#[derive(Debug, Parser)]
#[command(name = "accountd", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,

    /// Create the users and nickname tables if they are missing
    CreateTables,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("accountd=debug,tower_http=info");

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = config::AppConfig::from_env().context("load configuration")?;
            let (host, port) = (config.host.clone(), config.port);
            let app_state = AppState::init(config).await?;
            app::serve(app::build_app(app_state), &host, port).await
        }
        Command::CreateTables => {
            let aws = dynamo::AwsConfig::default();
            let tables = config::TableNames::from_env();
            tracing::info!(target_db = %aws.target_display(), "provisioning tables");
            let client = dynamo::create_client(&aws).await;
            accountd::accounts::repo::provision_tables(&client, &tables).await
        }
    }
}
