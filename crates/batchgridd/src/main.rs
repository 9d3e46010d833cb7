//! batchgridd: the batchgrid daemon.
//!
//! Connects to the message bus and the record store, then runs the batch
//! pipeline until interrupted:
//! - Bus (NATS, or Redis pub/sub)
//! - Record store (Redis, or an embedded redb file)
//! - Pipeline (subscription loop + per-key lanes)
//!
//! # Usage
//!
//! ```text
//! batchgridd run --bus-uri nats://localhost:4222 --store redis --redis-addr localhost:6379
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use batchgrid_bus::{NatsBus, RedisBus};
use batchgrid_engine::Pipeline;
use batchgrid_state::{KvStore, RedisStore, StateStore};

use config::{BusTransport, DaemonConfig, LogFormat, Overrides, StoreBackend};

const DEFAULT_FILTER: &str = "info,batchgrid=debug,batchgridd=debug";

#[derive(Parser)]
#[command(name = "batchgridd", about = "batchgrid daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe to the bus and coordinate batches until interrupted.
    Run {
        /// TOML configuration file.
        #[arg(long, env = "BATCHGRID_CONFIG")]
        config: Option<PathBuf>,

        /// Message bus URI (`nats://` or `redis://`).
        #[arg(long, env = "BUS_URI")]
        bus_uri: Option<String>,

        /// Record store backend.
        #[arg(long, env = "BATCHGRID_STORE", value_enum)]
        store: Option<StoreBackend>,

        /// Redis address for the record store.
        #[arg(long, env = "REDIS_ADDR")]
        redis_addr: Option<String>,

        /// Data directory for the redb store.
        #[arg(long, env = "BATCHGRID_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Number of per-key lanes.
        #[arg(long, env = "BATCHGRID_LANES")]
        lanes: Option<usize>,

        /// Deliveries buffered per lane.
        #[arg(long, env = "BATCHGRID_LANE_CAPACITY")]
        lane_capacity: Option<usize>,

        /// Log output format.
        #[arg(long, env = "BATCHGRID_LOG_FORMAT", value_enum)]
        log_format: Option<LogFormat>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            bus_uri,
            store,
            redis_addr,
            data_dir,
            lanes,
            lane_capacity,
            log_format,
        } => {
            let overrides = Overrides {
                bus_uri,
                store,
                redis_addr,
                data_dir,
                lanes,
                lane_capacity,
                log_format,
            };
            let config = DaemonConfig::load(config.as_deref(), overrides)?;
            init_tracing(config.log_format);
            run(config).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    info!(store = ?config.store, lanes = config.lanes, "batchgrid daemon starting");

    // ── Connect ────────────────────────────────────────────────

    let transport = config.bus_transport()?;
    let store = open_store(&config).await?;

    // ── Start pipeline ─────────────────────────────────────────

    let pipeline = match transport {
        BusTransport::Nats => {
            let bus = NatsBus::connect(&config.bus_uri).await?;
            info!(uri = %config.bus_uri, "nats bus connected");
            Pipeline::start(&bus, Arc::new(bus.clone()), store, config.pipeline()).await?
        }
        BusTransport::Redis => {
            let bus = RedisBus::connect(&config.bus_uri).await?;
            info!(uri = %config.bus_uri, "redis bus connected");
            Pipeline::start(&bus, Arc::new(bus.clone()), store, config.pipeline()).await?
        }
    };

    // ── Wait for shutdown ──────────────────────────────────────

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    pipeline.shutdown().await;

    info!("batchgrid daemon stopped");
    Ok(())
}

async fn open_store(config: &DaemonConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    match config.store {
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.redis_addr).await?;
            info!(addr = %config.redis_addr, "redis record store connected");
            Ok(Arc::new(store))
        }
        StoreBackend::Redb => {
            std::fs::create_dir_all(&config.data_dir)?;
            let path = config.redb_path();
            let store = StateStore::open(&path)?;
            info!(path = ?path, "redb record store opened");
            Ok(Arc::new(store))
        }
    }
}
