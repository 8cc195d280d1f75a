use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spapi::config::{Loader, Overrides};
use spapi::{Broker, Settings, db, server};

#[derive(Parser)]
#[command(name = "spapi")]
#[command(about = "Expose tagged database procedures over a single POST endpoint", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long)]
    database_url: Option<String>,

    /// HS256 secret for Bearer tokens; omit to treat every caller as anonymous
    #[arg(long)]
    jwt_secret: Option<String>,

    /// Path the broker answers on
    #[arg(long)]
    endpoint: Option<String>,

    /// Accept plain HTTP requests on the broker endpoint
    #[arg(long)]
    allow_http: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            database_url: self.database_url.clone(),
            jwt_secret: self.jwt_secret.clone(),
            endpoint: self.endpoint.clone(),
            require_https: self.allow_http.then_some(false),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spapi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Loader::default().load(cli.config.as_deref(), &cli.overrides())?;

    tracing::info!(database = %config.database.url, "Connecting to database");
    let database = db::connect(&config.database.url).await?;
    db::install_catalog(&db::connection(&database)?).await?;

    if config.auth.jwt_secret.is_empty() {
        tracing::info!("No JWT secret configured, all callers are anonymous");
    }

    let broker = Broker::new(Settings::from(&config.broker), Arc::new(database));
    server::run(config, Arc::new(broker)).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
