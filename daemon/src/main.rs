//! Tally daemon — entry point for the index pipeline and the attestation
//! service.

mod config;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use config::DaemonConfig;
use tally_chain::{JsonRpcLedger, LedgerSource};
use tally_indexer::{
    DownstreamPusher, EntityStore, MemoryMetadataSource, MetadataSource, Pipeline, ScanConfig,
    WebMetadataSource,
};
use tally_rpc::{AppState, RpcServer};
use tally_signer::EligibilitySigner;
use tally_store_json::JsonStore;

#[derive(Parser)]
#[command(name = "tally-daemon", about = "Tally survey indexer and attestation service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Ledger JSON-RPC endpoint.
    #[arg(long, env = "TALLY_LEDGER_ENDPOINT")]
    ledger_endpoint: Option<String>,

    /// Factory/registry contract address.
    #[arg(long, env = "TALLY_FACTORY")]
    factory: Option<String>,

    /// Treasury address for funding verification.
    #[arg(long, env = "TALLY_TREASURY")]
    treasury: Option<String>,

    /// Data directory for the JSON store.
    #[arg(long, env = "TALLY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Base URL for metadata documents.
    #[arg(long, env = "TALLY_METADATA_BASE_URL")]
    metadata_base_url: Option<String>,

    /// Downstream admin API to push snapshots to.
    #[arg(long, env = "TALLY_DOWNSTREAM_URL")]
    downstream_url: Option<String>,

    /// Hex-encoded Ed25519 signer seed.
    #[arg(long, env = "TALLY_SIGNER_KEY", hide_env_values = true)]
    signer_key: Option<String>,

    /// Attestation service port.
    #[arg(long, env = "TALLY_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the indexing pipeline.
    Index {
        /// Repeat every N seconds instead of exiting after one cycle.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run the attestation + eligibility HTTP service.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tally_utils::init_tracing();

    let cli = Cli::parse();

    let mut config = if let Some(ref path) = cli.config {
        let loaded = DaemonConfig::from_toml_file(path)?;
        tracing::info!("loaded config from {}", path.display());
        loaded
    } else {
        DaemonConfig::default()
    };

    // CLI flags and env vars override the file.
    if let Some(endpoint) = cli.ledger_endpoint {
        config.ledger_endpoint = endpoint;
    }
    if cli.factory.is_some() {
        config.factory = cli.factory;
    }
    if cli.treasury.is_some() {
        config.treasury = cli.treasury;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if cli.metadata_base_url.is_some() {
        config.metadata_base_url = cli.metadata_base_url;
    }
    if cli.downstream_url.is_some() {
        config.downstream_url = cli.downstream_url;
    }
    if cli.signer_key.is_some() {
        config.signer_key = cli.signer_key;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command {
        Command::Index { interval } => run_index(config, interval).await,
        Command::Serve => run_serve(config).await,
    }
}

async fn run_index(config: DaemonConfig, interval: Option<u64>) -> anyhow::Result<()> {
    // Required values are checked before the store is opened.
    let factory = config.factory_address()?;
    let treasury = config.treasury_address()?;
    let signing_domain = config.signing_domain()?;

    let mut scan = ScanConfig::new(factory, treasury);
    scan.start_floor = config.start_floor;
    scan.tail_window = config.tail_window;
    scan.batch_size = config.batch_size;
    scan.min_confirmations = config.min_confirmations;

    let store = JsonStore::open(&config.data_dir)?;
    let ledger = JsonRpcLedger::new(&config.ledger_endpoint);
    let pusher = config.downstream_url.as_deref().map(DownstreamPusher::new);

    tracing::info!(
        endpoint = %config.ledger_endpoint,
        factory = %scan.factory,
        data_dir = %config.data_dir.display(),
        "starting index pipeline"
    );

    match config.metadata_base_url.as_deref() {
        Some(base) => {
            let pipeline = Pipeline::new(
                ledger,
                WebMetadataSource::new(base),
                store,
                scan,
                signing_domain,
            );
            drive(with_pusher(pipeline, pusher), interval).await
        }
        None => {
            tracing::warn!("no metadata_base_url configured; records get placeholder display fields");
            let pipeline = Pipeline::new(
                ledger,
                MemoryMetadataSource::new(),
                store,
                scan,
                signing_domain,
            );
            drive(with_pusher(pipeline, pusher), interval).await
        }
    }
}

fn with_pusher<L, M, S>(
    pipeline: Pipeline<L, M, S>,
    pusher: Option<DownstreamPusher>,
) -> Pipeline<L, M, S>
where
    L: LedgerSource,
    M: MetadataSource,
    S: EntityStore,
{
    match pusher {
        Some(pusher) => pipeline.with_pusher(pusher),
        None => pipeline,
    }
}

async fn drive<L, M, S>(pipeline: Pipeline<L, M, S>, interval: Option<u64>) -> anyhow::Result<()>
where
    L: LedgerSource,
    M: MetadataSource,
    S: EntityStore,
{
    loop {
        match pipeline.run_cycle().await {
            Ok(report) => {
                tracing::info!(
                    scanned_to = ?report.scanned_to,
                    events = report.events_applied,
                    surveys = report.survey_count,
                    "cycle finished"
                );
            }
            Err(e) => {
                // In loop mode a failed cycle is retried on the next tick.
                match interval {
                    Some(_) => tracing::warn!(error = %e, "cycle failed"),
                    None => return Err(e.into()),
                }
            }
        }
        match interval {
            Some(secs) => {
                tracing::debug!("next cycle in {}", tally_utils::format_duration(secs));
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
            }
            None => return Ok(()),
        }
    }
}

async fn run_serve(config: DaemonConfig) -> anyhow::Result<()> {
    let key_hex = config
        .signer_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing required config value: signer_key"))?;
    let private = tally_crypto::private_key_from_hex(key_hex)?;
    let keypair = tally_crypto::keypair_from_private(private);
    let signing_domain = config.signing_domain()?;

    let store = Arc::new(JsonStore::open(&config.data_dir)?);
    let signer = EligibilitySigner::new(keypair, signing_domain);
    let state = Arc::new(AppState::new(store, signer, config.k_anonymity));

    tracing::info!(port = config.port, "starting attestation service");
    RpcServer::new(config.port).start(state).await?;

    tracing::info!("tally daemon exited cleanly");
    Ok(())
}
