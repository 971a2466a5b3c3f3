use clap::Parser;
use menuflow::application::engine::{Collaborators, ConversationEngine};
use menuflow::config::EngineConfig;
use menuflow::domain::ports::{ConversationStoreBox, OrderStoreBox};
use menuflow::domain::settlement::SettlementMethod;
use menuflow::infrastructure::in_memory::{
    InMemoryConversationStore, InMemoryOrderStore, LogMessenger, RecordingSettlementGateway,
};
#[cfg(feature = "storage-rocksdb")]
use menuflow::infrastructure::rocksdb::RocksDBStore;
use menuflow::infrastructure::sample;
use menuflow::interfaces::csv::event_reader::EventReader;
use menuflow::interfaces::csv::order_writer::OrderWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Inbound events CSV file (`identity,kind,payload`)
    input: PathBuf,

    /// Engine configuration JSON file (optional). Defaults apply otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "menuflow=info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(io::stderr)))
        .init();
}

fn in_memory_stores() -> (OrderStoreBox, ConversationStoreBox) {
    (
        Box::new(InMemoryOrderStore::new()),
        Box::new(InMemoryConversationStore::new()),
    )
}

#[cfg(feature = "storage-rocksdb")]
fn stores(db_path: Option<&Path>) -> Result<(OrderStoreBox, ConversationStoreBox)> {
    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            info!(path = %path.display(), "Using RocksDB storage");
            Ok((Box::new(store.clone()), Box::new(store)))
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn stores(db_path: Option<&Path>) -> Result<(OrderStoreBox, ConversationStoreBox)> {
    if let Some(path) = db_path {
        warn!(
            path = %path.display(),
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    let (orders, conversations) = stores(cli.db_path.as_deref())?;

    let engine = ConversationEngine::new(
        config,
        Collaborators {
            catalog: Box::new(sample::catalog()),
            orders,
            conversations,
            messenger: Box::new(LogMessenger),
            geocoder: Box::new(sample::geocoder()),
        },
    )
    .with_courier_pool(Box::new(sample::couriers()))
    .with_settlement_gateway(
        SettlementMethod::OrangeMoney,
        Box::new(RecordingSettlementGateway::accepting("OM")),
    )
    .with_settlement_gateway(
        SettlementMethod::MtnMobileMoney,
        Box::new(RecordingSettlementGateway::accepting("MOMO")),
    );

    // Replay events
    let file = File::open(&cli.input).into_diagnostic()?;
    for event in EventReader::new(file).events() {
        match event {
            Ok(event) => {
                if let Err(e) = engine.handle_event(event).await {
                    error!(error = %e, "Error processing event");
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed event row"),
        }
    }

    let orders = engine.into_orders().await.into_diagnostic()?;
    info!(orders = orders.len(), "Replay finished");

    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(&orders).into_diagnostic()?;

    Ok(())
}
