use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use blasterd::api;
use blasterd::engine::DiscoveredDevice;
use blasterd::settings::Protocol;
use blasterd::BridgeHub;
use blasterd::Engine;
use blasterd::LogLevel;
use blasterd::Settings;
use blasterd::SettingsError;
use blasterd_catalogue::Store;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Parser)]
#[command(name = "blasterd", version, about = "IR/RF remote-control service")]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, global = true, env = "BLASTERD_SETTINGS")]
    settings: Option<PathBuf>,

    /// Device catalogue (JSON)
    #[arg(short, long, global = true, env = "BLASTERD_CATALOGUE")]
    catalogue: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = "BLASTERD_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Write logs to this file instead of stdout
    #[arg(long, global = true, env = "BLASTERD_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),

    /// Execute a command or scenario and exit
    Run {
        #[command(subcommand)]
        target: RunTarget,
    },

    /// List devices on the network and optionally add them to the catalogue
    Discover {
        /// Add new devices and update changed ones
        #[arg(long)]
        add: bool,
    },

    /// Forward voice intents from MQTT to the API server
    #[cfg(feature = "relay_mqtt")]
    Relay(RelayArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "BLASTERD_ADDRESS")]
    address: Option<String>,

    #[arg(long, env = "BLASTERD_PORT")]
    port: Option<u16>,

    /// http or https
    #[arg(long, env = "BLASTERD_PROTO")]
    proto: Option<Protocol>,

    #[arg(long, env = "BLASTERD_TLS_CERT")]
    tls_cert: Option<PathBuf>,

    #[arg(long, env = "BLASTERD_TLS_KEY")]
    tls_key: Option<PathBuf>,

    /// Bearer token required on every request
    #[arg(long, env = "BLASTERD_TOKEN")]
    token: Option<String>,
}

#[derive(Debug, Subcommand)]
enum RunTarget {
    /// Execute a command by id
    Cmd { id: String },

    /// Execute a scenario by id
    Scenario { id: String },
}

#[cfg(feature = "relay_mqtt")]
#[derive(Debug, Args)]
struct RelayArgs {
    /// MQTT broker host
    #[arg(long, env = "BLASTERD_RELAY_BROKER")]
    broker: Option<String>,

    #[arg(long, env = "BLASTERD_RELAY_PORT")]
    port: Option<u16>,

    /// Topic carrying voice intent requests
    #[arg(long, env = "BLASTERD_RELAY_TOPIC")]
    topic: Option<String>,

    /// Intent endpoint of the API server
    #[arg(long, env = "BLASTERD_RELAY_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token sent to the endpoint
    #[arg(long, env = "BLASTERD_RELAY_TOKEN")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    if let Some(file) = &cli.log_file {
        settings.logging.file = Some(file.clone());
    }
    if let Some(catalogue) = &cli.catalogue {
        settings.catalogue = Some(catalogue.clone());
    }

    let _log_guard = blasterd::logging::init(&settings.logging)?;
    tracing::info!("blasterd {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve(args) => serve(settings, args).await,
        Commands::Run { target } => run(settings, target).await,
        Commands::Discover { add } => discover(settings, add).await,
        #[cfg(feature = "relay_mqtt")]
        Commands::Relay(args) => relay(settings, args).await,
    }
}

fn catalogue_path(settings: &Settings) -> anyhow::Result<PathBuf> {
    settings
        .catalogue
        .clone()
        .ok_or_else(|| SettingsError::MissingCatalogue.into())
}

fn engine(settings: &Settings, store: Store) -> Arc<Engine> {
    let hub = BridgeHub::new(settings.bridge.clone());
    Arc::new(Engine::new(Arc::new(store), Box::new(hub)))
}

async fn serve(mut settings: Settings, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(address) = args.address {
        settings.server.listen = address;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(proto) = args.proto {
        settings.server.protocol = proto;
    }
    if args.tls_cert.is_some() {
        settings.server.tls_cert = args.tls_cert;
    }
    if args.tls_key.is_some() {
        settings.server.tls_key = args.tls_key;
    }
    if args.token.is_some() {
        settings.server.token = args.token;
    }
    settings.server.validate()?;

    let path = catalogue_path(&settings)?;
    let store = Store::load(&path).context("Failed to load catalogue")?;
    let engine = engine(&settings, store);
    engine.init_devices().await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut server = tokio::spawn(api::serve(
        engine.clone(),
        settings.server.clone(),
        shutdown_rx,
    ));

    tracing::info!("Press Ctrl+C to exit");
    let result = tokio::select! {
        result = &mut server => result.context("API server task failed")?,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("Received shutdown signal"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
            let _ = shutdown_tx.send(());
            server.await.context("API server task failed")?
        }
    };

    engine.shutdown().await;
    tracing::info!("blasterd shutdown complete");
    result
}

async fn run(settings: Settings, target: RunTarget) -> anyhow::Result<()> {
    let path = catalogue_path(&settings)?;
    let store = Store::load(&path).context("Failed to load catalogue")?;
    let engine = engine(&settings, store);
    engine.init_devices().await?;

    let result = match &target {
        RunTarget::Cmd { id } => engine.exec_command(id).await,
        RunTarget::Scenario { id } => engine.exec_scenario_id(id).await,
    };
    engine.shutdown().await;

    result.with_context(|| format!("Failed to run {:?}", target))?;
    println!("done");
    Ok(())
}

async fn discover(settings: Settings, add: bool) -> anyhow::Result<()> {
    let path = catalogue_path(&settings)?;
    let store = Store::load_or_create(&path).context("Failed to load catalogue")?;
    let engine = engine(&settings, store);

    let discovered = engine.discover().await;
    engine.shutdown().await;
    let discovered = discovered.context("Discovery failed")?;

    print_discovered(&discovered);

    if add && !discovered.is_empty() {
        let devices: Vec<_> = discovered.into_iter().map(|d| d.info).collect();
        let added = engine.add_discovered(&devices)?;
        println!(
            "Saved {} devices ({} new) to {}",
            devices.len(),
            added,
            path.display()
        );
    }

    Ok(())
}

fn print_discovered(devices: &[DiscoveredDevice]) {
    if devices.is_empty() {
        println!("No devices found");
        return;
    }

    println!(
        "{:<18} {:<16} {:<10} {:<11} NAME",
        "MAC", "IP", "TYPE", "STATUS"
    );
    for device in devices {
        println!(
            "{:<18} {:<16} {:<10} {:<11} {}",
            device.info.mac,
            device.info.ip,
            device.info.device_type,
            device.status.to_string(),
            device.info.name
        );
    }
}

#[cfg(feature = "relay_mqtt")]
async fn relay(mut settings: Settings, args: RelayArgs) -> anyhow::Result<()> {
    use blasterd::relay::IntentRelay;
    use blasterd::relay::RumqttcClient;

    if let Some(broker) = args.broker {
        settings.relay.broker = broker;
    }
    if let Some(port) = args.port {
        settings.relay.port = port;
    }
    if let Some(topic) = args.topic {
        settings.relay.topic = topic;
    }
    if let Some(endpoint) = args.endpoint {
        settings.relay.endpoint = endpoint;
    }
    if args.token.is_some() {
        settings.relay.token = args.token;
    }

    let client = RumqttcClient::new(&settings.relay);
    let mut relay = IntentRelay::new(client, settings.relay);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
        }
        let _ = shutdown_tx.send(());
    });

    relay.run(shutdown_rx).await?;
    Ok(())
}
