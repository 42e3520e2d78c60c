//! OrientDB connection management over the REST API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use strata_core::document::DatabaseSpec;

use crate::server::{ClassInfo, Credentials, Result, SchemaServer, SchemaSession};

/// Errors from server operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("OrientDB connection error: {0}")]
    Connection(String),

    #[error("OrientDB request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("OrientDB returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Server connection is closed")]
    Closed,

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration for connecting to OrientDB.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: bool,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2480,
            username: "root".to_string(),
            password: String::new(),
            tls: false,
            timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Shared HTTP plumbing for the server handle and its sessions.
#[derive(Clone)]
struct Transport {
    http: Client,
    base_url: String,
    closed: Arc<AtomicBool>,
}

impl Transport {
    fn request(&self, method: Method, path: &str, credentials: &Credentials) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .basic_auth(&credentials.username, Some(&credentials.password))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GraphError::Closed);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GraphError::Server {
                status: status.as_u16(),
                message: server_message(&body),
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| GraphError::Serialization(e.to_string()))
    }
}

/// Pull the human-readable reason out of an error body.
fn server_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("errors")?
                .get(0)?
                .get("content")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Connection pool to one OrientDB server.
///
/// Opened once per batch and released with [`SchemaServer::close`]. Clone is
/// cheap and clones share the same closed flag.
#[derive(Clone)]
pub struct OrientClient {
    transport: Transport,
    credentials: Credentials,
}

impl OrientClient {
    /// Connect to OrientDB with the given configuration.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let client = Self {
            transport: Transport {
                http,
                base_url: config.base_url(),
                closed: Arc::new(AtomicBool::new(false)),
            },
            credentials: config.credentials(),
        };

        client
            .list_databases()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(url = %client.transport.base_url, "Connected to OrientDB");
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }
}

#[async_trait]
impl SchemaServer for OrientClient {
    async fn list_databases(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Databases {
            databases: Vec<String>,
        }

        let request = self
            .transport
            .request(Method::GET, "/listDatabases", &self.credentials);
        let body = self.transport.send(request).await?;
        let parsed: Databases =
            serde_json::from_value(body).map_err(|e| GraphError::Serialization(e.to_string()))?;
        Ok(parsed.databases)
    }

    async fn create_database(&self, name: &str, spec: &DatabaseSpec) -> Result<()> {
        let path = format!(
            "/database/{name}/{}/{}",
            spec.storage.as_str(),
            spec.database_type.as_str()
        );
        let request = self.transport.request(Method::POST, &path, &self.credentials);
        self.transport.send(request).await?;
        tracing::debug!(database = %name, "Database created");
        Ok(())
    }

    async fn drop_database(&self, name: &str) -> Result<()> {
        let path = format!("/database/{name}");
        let request = self
            .transport
            .request(Method::DELETE, &path, &self.credentials);
        match self.transport.send(request).await {
            Err(GraphError::Server { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(GraphError::DatabaseNotFound(name.to_string()))
            }
            other => other.map(|_| ()),
        }
    }

    fn open(
        &self,
        name: &str,
        credentials: Option<Credentials>,
    ) -> Result<Arc<dyn SchemaSession>> {
        if self.transport.closed.load(Ordering::SeqCst) {
            return Err(GraphError::Closed);
        }
        Ok(Arc::new(OrientSession {
            transport: self.transport.clone(),
            database: name.to_string(),
            credentials: credentials.unwrap_or_else(|| self.credentials.clone()),
            classes: Mutex::new(None),
        }))
    }

    async fn close(&self) {
        if !self.transport.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(url = %self.transport.base_url, "Closed OrientDB connection");
        }
    }
}

/// Schema session on one database.
pub struct OrientSession {
    transport: Transport,
    database: String,
    credentials: Credentials,
    pub(crate) classes: Mutex<Option<Vec<ClassInfo>>>,
}

impl OrientSession {
    pub(crate) fn name(&self) -> &str {
        &self.database
    }

    /// `GET /database/{db}`: classes, clusters and other metadata.
    pub(crate) async fn metadata(&self) -> Result<Value> {
        let path = format!("/database/{}", self.database);
        let request = self
            .transport
            .request(Method::GET, &path, &self.credentials);
        self.transport.send(request).await
    }

    /// `POST /command/{db}/sql` with named parameters.
    pub(crate) async fn command(
        &self,
        sql: &str,
        params: &serde_json::Map<String, Value>,
    ) -> Result<Vec<Value>> {
        let path = format!("/command/{}/sql", self.database);
        let request = self
            .transport
            .request(Method::POST, &path, &self.credentials)
            .json(&json!({ "command": sql, "parameters": params }));
        let body = self.transport.send(request).await?;

        tracing::debug!(database = %self.database, sql = %sql, "Executed statement");
        Ok(match body.get("result") {
            Some(Value::Array(rows)) => rows.clone(),
            _ => Vec::new(),
        })
    }

    /// `POST /batch/{db}` with a non-transactional SQL script.
    pub(crate) async fn script(&self, statements: &[String]) -> Result<()> {
        let path = format!("/batch/{}", self.database);
        let request = self
            .transport
            .request(Method::POST, &path, &self.credentials)
            .json(&json!({
                "transaction": false,
                "operations": [{
                    "type": "script",
                    "language": "sql",
                    "script": statements,
                }],
            }));
        self.transport.send(request).await?;

        tracing::debug!(
            database = %self.database,
            statements = statements.len(),
            "Executed script"
        );
        Ok(())
    }

    pub(crate) async fn invalidate_classes(&self) {
        *self.classes.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.base_url(), "http://localhost:2480");
        assert_eq!(config.username, "root");
    }

    #[test]
    fn test_tls_base_url() {
        let config = ServerConfig {
            host: "db.internal".into(),
            port: 2443,
            tls: true,
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://db.internal:2443");
    }

    #[test]
    fn test_server_message_extracts_content() {
        let body = r#"{"errors":[{"code":500,"reason":500,"content":"Class Person already exists"}]}"#;
        assert_eq!(server_message(body), "Class Person already exists");
        assert_eq!(server_message("  plain failure \n"), "plain failure");
    }
}
