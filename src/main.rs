use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use usaepay_gateway::application::events::OrderEvents;
use usaepay_gateway::application::lifecycle::PaymentLifecycle;
use usaepay_gateway::config::GatewayConfig;
use usaepay_gateway::domain::order::Order;
use usaepay_gateway::domain::ports::SharedOrderStore;
use usaepay_gateway::infrastructure::in_memory::{
    InMemoryInventory, InMemoryOrderStore, InMemoryStorefront,
};
#[cfg(feature = "storage-rocksdb")]
use usaepay_gateway::infrastructure::rocksdb::RocksDBStore;
use usaepay_gateway::infrastructure::usaepay::UsaepayClient;
use usaepay_gateway::interfaces::csv::event_reader::{EventReader, OrderEvent};
use usaepay_gateway::interfaces::csv::order_reader::OrderReader;
use usaepay_gateway::interfaces::csv::report_writer::ReportWriter;
use usaepay_gateway::telemetry::init_tracing;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Orders CSV file
    orders: PathBuf,

    /// Order events CSV file: charges, status changes and refunds, in order
    events: PathBuf,

    /// Gateway settings (YAML). Falls back to USAEPAY_CONFIG, then ./usaepay.yaml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<SharedOrderStore> {
    match db_path {
        Some(db_path) => Ok(Arc::new(RocksDBStore::open(db_path).into_diagnostic()?)),
        None => Ok(Arc::new(InMemoryOrderStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<SharedOrderStore> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryOrderStore::new()))
}

/// Stores the order unless an earlier run already did.
async fn seed_order(orders: &SharedOrderStore, order: Order) -> usaepay_gateway::error::Result<()> {
    if orders.get(order.id).await?.is_none() {
        orders.save(order).await?;
    }
    Ok(())
}

async fn apply_event(
    lifecycle: &PaymentLifecycle,
    events: &OrderEvents,
    event: OrderEvent,
) -> usaepay_gateway::error::Result<()> {
    match event {
        OrderEvent::Charge { order_id, card } => {
            lifecycle.process_payment(order_id, &card).await?;
        }
        OrderEvent::Status { order_id, status } => {
            events.update_status(order_id, status).await?;
        }
        OrderEvent::Refund {
            order_id,
            amount,
            reason,
        } => {
            lifecycle.refund(order_id, amount, &reason).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Arc::new(GatewayConfig::load(cli.config.as_deref()).into_diagnostic()?);
    let orders = open_store(cli.db_path)?;
    let gateway = Arc::new(UsaepayClient::new(&config).into_diagnostic()?);
    let storefront = InMemoryStorefront::new();

    let lifecycle = Arc::new(PaymentLifecycle::new(
        config,
        gateway,
        orders.clone(),
        Arc::new(storefront.clone()),
        Arc::new(InMemoryInventory::new()),
    ));
    let events = OrderEvents::new(orders.clone(), lifecycle.order_locks());
    events.subscribe(lifecycle.clone());

    let file = File::open(&cli.orders).into_diagnostic()?;
    for order in OrderReader::new(file).orders() {
        match order {
            Ok(order) => {
                if let Err(e) = seed_order(&orders, order).await {
                    eprintln!("Error storing order: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading order: {}", e);
            }
        }
    }

    let file = File::open(&cli.events).into_diagnostic()?;
    for event in EventReader::new(file).events() {
        match event {
            Ok(event) => {
                let order_id = event.order_id();
                if let Err(e) = apply_event(&lifecycle, &events, event).await {
                    eprintln!("Error processing event for order {}: {}", order_id, e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
        for (_, notice) in storefront.take_notices().await {
            eprintln!("Notice: {}", notice);
        }
    }

    let all = orders.all_orders().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_orders(&all).into_diagnostic()?;

    Ok(())
}
