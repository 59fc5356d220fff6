//! Workhub employee record service host.
//!
//! Wires the system of record, the search index and the change-event sink,
//! then runs one maintenance command.

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use workhub_persistence::backends::memory::InMemorySearchIndex;
use workhub_persistence::messaging::{DeliveryMode, MessageSink, OutboxRelay, TracingSink};
use workhub_persistence::{
    ChangeDelivery, EmployeeService, FilterEmployee, OutboxStore, SearchIndex, ServiceConfig,
};

#[cfg(feature = "sqlite")]
use workhub_persistence::backends::sqlite::{SqliteBackend, SqliteBackendConfig};

use config::{Command, ServerConfig};

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` overrides `level` when set.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "workhub_persistence={},workhub={}",
            level, level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Creates and initializes a SQLite backend from the server configuration.
#[cfg(feature = "sqlite")]
fn create_sqlite_backend(config: &ServerConfig) -> anyhow::Result<SqliteBackend> {
    info!(database = %config.database_url, "Initializing SQLite backend");

    let backend = SqliteBackend::with_config(&config.database_url, SqliteBackendConfig::default())?;
    backend.init_schema()?;

    Ok(backend)
}

/// Connects to Elasticsearch when nodes are configured, otherwise falls
/// back to a process-local index.
async fn create_search_index(
    config: &ServerConfig,
) -> anyhow::Result<(Arc<dyn SearchIndex>, bool)> {
    let nodes = config.elasticsearch_nodes();
    if nodes.is_empty() {
        info!("No Elasticsearch nodes configured, using in-memory search index");
        return Ok((Arc::new(InMemorySearchIndex::new()), true));
    }
    Ok((create_elasticsearch_index(config, nodes).await?, false))
}

#[cfg(feature = "elasticsearch")]
async fn create_elasticsearch_index(
    config: &ServerConfig,
    nodes: Vec<String>,
) -> anyhow::Result<Arc<dyn SearchIndex>> {
    use workhub_persistence::Backend;
    use workhub_persistence::backends::elasticsearch::{
        ElasticsearchAuth, ElasticsearchBackend, ElasticsearchConfig, IndexSettings,
    };

    let auth = match (
        &config.elasticsearch_username,
        &config.elasticsearch_password,
    ) {
        (Some(username), Some(password)) => Some(ElasticsearchAuth::Basic {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    let es_config = ElasticsearchConfig {
        nodes: nodes.clone(),
        auth,
        index: IndexSettings {
            max_result_window: config.max_results.max(1),
            ..Default::default()
        },
        ..Default::default()
    };

    info!(nodes = ?nodes, index = %config.index_name, "Initializing Elasticsearch backend");

    let backend = ElasticsearchBackend::new(es_config)?;
    backend.initialize().await?;
    Ok(Arc::new(backend))
}

/// Fallback when the elasticsearch feature is not enabled.
#[cfg(not(feature = "elasticsearch"))]
async fn create_elasticsearch_index(
    _config: &ServerConfig,
    _nodes: Vec<String>,
) -> anyhow::Result<Arc<dyn SearchIndex>> {
    anyhow::bail!(
        "Elasticsearch nodes are configured but the 'elasticsearch' feature is disabled. \
         Build with: cargo build -p workhub-server --features elasticsearch"
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let service_config = config.service_config();

    info!(
        database = %config.database_url,
        index = %service_config.index_name,
        topic = %service_config.messaging.topic,
        delivery = ?service_config.messaging.delivery,
        "Starting Workhub"
    );

    let backend = Arc::new(create_sqlite_backend(&config)?);

    match &config.command {
        Command::Relay => run_relay(backend, &service_config).await,
        Command::Reindex => {
            let service = create_service(&config, backend, &service_config).await?.0;
            let indexed = service.reindex_all().await?;
            info!(documents = indexed, "Reindex complete");
            service.shutdown().await;
            Ok(())
        }
        Command::Search { filter } => {
            let filter: FilterEmployee = serde_json::from_str(filter)
                .map_err(|e| anyhow::anyhow!("Invalid filter: {}", e))?;

            let (service, in_memory) = create_service(&config, backend, &service_config).await?;
            if in_memory {
                service.reindex_all().await?;
            }

            for document in service.search(&filter).await? {
                println!("{}", serde_json::to_string(&document)?);
            }
            service.shutdown().await;
            Ok(())
        }
    }
}

async fn create_service(
    config: &ServerConfig,
    backend: Arc<SqliteBackend>,
    service_config: &ServiceConfig,
) -> anyhow::Result<(EmployeeService<SqliteBackend>, bool)> {
    let (index, in_memory) = create_search_index(config).await?;
    let sink: Arc<dyn MessageSink> = Arc::new(TracingSink);
    let delivery = ChangeDelivery::from_config(&service_config.messaging, sink);
    Ok((
        EmployeeService::new(backend, index, delivery, service_config),
        in_memory,
    ))
}

/// Delivers outbox entries to the change-event sink until Ctrl-C.
async fn run_relay(
    backend: Arc<SqliteBackend>,
    service_config: &ServiceConfig,
) -> anyhow::Result<()> {
    if service_config.messaging.delivery == DeliveryMode::Direct {
        warn!("Delivery mode is direct; the relay only drains entries already in the outbox");
    }

    let pending = backend.pending_count().await?;
    info!(pending = pending, "Outbox relay starting");

    let store: Arc<dyn OutboxStore> = backend;
    let relay = OutboxRelay::new(store, Arc::new(TracingSink), &service_config.messaging);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        let _ = shutdown_tx.send(true);
    });

    relay.run(shutdown_rx).await?;
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
compile_error!("The sqlite backend feature must be enabled");
