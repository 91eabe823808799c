use anyhow::Result;
use cinc_monitor::{
    config::Config,
    server::{self, RunMode},
};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// PostgreSQL connection string of the CINC server database (overrides config)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Graphite host (overrides config)
    #[arg(long, env = "GRAPHITE_HOST")]
    graphite_host: Option<String>,

    /// Metric name prefix (overrides config)
    #[arg(long, env = "GRAPHITE_PREFIX")]
    graphite_prefix: Option<String>,

    /// Host label used in service metric names (overrides config)
    #[arg(long, env = "HOSTNAME")]
    hostname: Option<String>,

    /// Run a single polling cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CINC server monitor v{}", env!("CARGO_PKG_VERSION"));

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(url) = args.database_url {
        config.database.url = secrecy::SecretString::from(url);
    }
    if let Some(host) = args.graphite_host {
        config.graphite.host = host;
    }
    if let Some(prefix) = args.graphite_prefix {
        config.graphite.prefix = prefix;
    }
    if let Some(hostname) = args.hostname {
        config.graphite.hostname = Some(hostname);
    }

    info!("Configuration loaded successfully");
    info!("Graphite: {}:{}", config.graphite.host, config.graphite.port);

    let mode = if args.once {
        RunMode::Once
    } else {
        RunMode::Continuous
    };

    if let Err(e) = server::start(config, mode).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
