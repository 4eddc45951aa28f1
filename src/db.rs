use mongodb::{
    bson::{doc, Bson, Document},
    error::{Error as MongoError, ErrorKind},
    options::ClientOptions,
    Client, Collection, Database,
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::{
    config::DbConfig,
    error::DbError,
    health::{self, HealthStatus},
    models::{Model, ModelRegistry},
};

/// Owns the pooled MongoDB client for the lifetime of the application.
///
/// Built unconnected; `init` opens the client and `close` releases it. At
/// most one client is live at a time.
pub struct DbManager {
    config: DbConfig,
    registry: ModelRegistry,
    client: RwLock<Option<Client>>,
}

impl DbManager {
    pub fn new(config: DbConfig) -> Self {
        Self::with_registry(config, ModelRegistry::default_models())
    }

    pub fn with_registry(config: DbConfig, registry: ModelRegistry) -> Self {
        Self {
            config,
            registry,
            client: RwLock::new(None),
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Connects, pings the server and registers the document models.
    /// A single attempt; failures are returned to the caller.
    pub async fn init(&self) -> Result<(), DbError> {
        let cfg = &self.config;
        info!(host = %cfg.host, port = cfg.port, "connecting to MongoDB");

        if let Err(e) = cfg.validate() {
            error!(error = %e, "MongoDB configuration error");
            return Err(e);
        }

        let options = self.client_options().await?;
        let client = Client::with_options(options).map_err(|e| self.classify(e))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| self.classify(e))?;
        info!("successfully connected to MongoDB");

        let database = client.database(&cfg.name);
        self.registry
            .apply(&database)
            .await
            .map_err(|e| self.classify(e))?;
        info!(
            database = %cfg.name,
            models = ?self.registry.names(),
            "registered document models"
        );

        let previous = self.client.write().await.replace(client);
        if let Some(previous) = previous {
            warn!("replacing an existing MongoDB connection");
            previous.shutdown().await;
        }
        Ok(())
    }

    /// Releases the client. Safe to call repeatedly.
    pub async fn close(&self) {
        let Some(client) = self.client.write().await.take() else {
            warn!("no MongoDB connection to close");
            return;
        };
        info!("closing MongoDB connection");
        client.shutdown().await;
        info!("MongoDB connection closed");
    }

    /// Handle to the configured database.
    pub async fn database(&self) -> Result<Database, DbError> {
        self.client
            .read()
            .await
            .as_ref()
            .map(|client| client.database(&self.config.name))
            .ok_or(DbError::NotInitialized)
    }

    pub async fn collection<T: Model>(&self) -> Result<Collection<T>, DbError> {
        Ok(T::collection(&self.database().await?))
    }

    /// Never fails; problems are logged and reported as unhealthy.
    pub async fn health_check(&self) -> HealthStatus {
        let Some(client) = self.client.read().await.clone() else {
            warn!("database health check failed: no database connection");
            return HealthStatus::unhealthy(health::NOT_ESTABLISHED);
        };

        match self.probe(&client).await {
            Ok(stats) => {
                info!(
                    database = %self.config.name,
                    host = %self.config.host,
                    port = self.config.port,
                    collections = stat(&stats, "collections"),
                    data_size = stat(&stats, "dataSize"),
                    "database health check successful"
                );
                HealthStatus::healthy(health::ESTABLISHED)
            }
            Err(e) => {
                error!(error = %e, "database health check failed");
                HealthStatus::unhealthy(health::FAILED)
            }
        }
    }

    async fn probe(&self, client: &Client) -> mongodb::error::Result<Document> {
        client.database("admin").run_command(doc! { "ping": 1 }).await?;
        client
            .database(&self.config.name)
            .run_command(doc! { "dbStats": 1 })
            .await
    }

    async fn client_options(&self) -> Result<ClientOptions, DbError> {
        let cfg = &self.config;
        let mut options = ClientOptions::parse(&cfg.url)
            .await
            .map_err(|e| self.classify(e))?;

        options.app_name = Some(cfg.app_name.clone());
        options.min_pool_size = Some(cfg.min_pool_size);
        options.max_pool_size = Some(cfg.max_pool_size);
        options.connect_timeout = Some(cfg.connect_timeout);
        options.server_selection_timeout = Some(cfg.server_selection_timeout);
        options.max_idle_time = Some(cfg.max_idle_time);

        if let Some(user) = &cfg.user {
            let mut credential = options.credential.take().unwrap_or_default();
            credential.username = Some(user.clone());
            credential.password = cfg.password.clone();
            options.credential = Some(credential);
        }
        Ok(options)
    }

    fn classify(&self, err: MongoError) -> DbError {
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. } => {
                error!(error = %err, "failed to connect to MongoDB");
                DbError::Connectivity {
                    host: self.config.host.clone(),
                    port: self.config.port,
                }
            }
            ErrorKind::InvalidArgument { .. } | ErrorKind::DnsResolve { .. } => {
                error!(error = %err, "MongoDB configuration error");
                DbError::Configuration(err.to_string())
            }
            _ => {
                error!(error = %err, "failed to initialize database");
                DbError::Initialization(err.to_string())
            }
        }
    }
}

fn stat(stats: &Document, key: &str) -> i64 {
    match stats.get(key) {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}
