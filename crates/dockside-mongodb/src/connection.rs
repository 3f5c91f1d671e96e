//! MongoDB connection management with pool configuration

use bson::{doc, Document};
use dockside_common::{DocksideError, Result};
use mongodb::{
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database,
};
use std::time::Duration;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool
    pub min_pool_size: Option<u32>,
    /// Maximum number of connections in the pool
    pub max_pool_size: Option<u32>,
    /// Maximum time a connection can remain idle before being closed
    pub max_idle_time: Option<Duration>,
    /// Connection timeout
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout
    pub server_selection_timeout: Option<Duration>,
    /// Application name for server logs
    pub app_name: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: Some(2),
            max_pool_size: Some(10),
            max_idle_time: None,
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            app_name: Some("dockside".to_string()),
        }
    }
}

/// MongoDB connection handle owning the driver client
pub struct Connection {
    client: Client,
    database: Database,
    database_name: String,
}

impl Connection {
    /// Open a connection with default pool settings
    pub async fn new(connection_string: &str) -> Result<Self> {
        Self::with_config(connection_string, PoolConfig::default()).await
    }

    /// Open a connection with custom pool configuration
    pub async fn with_config(connection_string: &str, config: PoolConfig) -> Result<Self> {
        let mut client_options = ClientOptions::parse(connection_string).await?;

        if let Some(min) = config.min_pool_size {
            client_options.min_pool_size = Some(min);
        }
        if let Some(max) = config.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(idle) = config.max_idle_time {
            client_options.max_idle_time = Some(idle);
        }
        if let Some(connect) = config.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = config.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if let Some(app) = config.app_name {
            client_options.app_name = Some(app);
        }

        // Pin the stable server API so behavior does not drift across server
        // upgrades.
        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);

        let client = Client::with_options(client_options)?;

        let database = client.default_database().ok_or_else(|| {
            DocksideError::Connection(
                "No database specified in connection string".to_string(),
            )
        })?;

        let database_name = database.name().to_string();

        Ok(Self {
            client,
            database,
            database_name,
        })
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the database name
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Get a collection handle by name
    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Check connection health by pinging the server
    pub async fn ping(&self) -> Result<bool> {
        match self.database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => Ok(true),
            Err(e) => Err(DocksideError::Connection(format!("Ping failed: {}", e))),
        }
    }

    /// Release the client and its connection pool
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}
