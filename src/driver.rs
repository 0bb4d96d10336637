use crate::collector::{QueryResult, collect_rows};
use crate::config::{DEFAULT_MAX_CONCURRENCY, DriverConfig};
use crate::error::DriverError;
use crate::protocol::{ProtocolClient, Row};
use crate::stream::{RowStream, stream_rows_holding};
use crate::template::{Value, format_query};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// SQL dialect that queries for this driver must be compiled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Prestodb,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Prestodb => "prestodb",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadOptions {
    /// Hand rows back as a stream instead of a collected result.
    pub stream_import: bool,
}

/// Result of `download_query_results`, shaped by `DownloadOptions::stream_import`.
pub enum Download {
    Rows(QueryResult),
    Stream(RowStream),
}

/// Query driver over a shared protocol client.
///
/// Holds an immutable configuration and caps the number of queries running at once at
/// `DriverConfig::max_concurrency`.
pub struct TrinoDriver<C: ProtocolClient> {
    config: DriverConfig,
    client: Arc<C>,
    limiter: Arc<Semaphore>,
}

impl<C: ProtocolClient> TrinoDriver<C> {
    pub fn new(config: DriverConfig, client: C) -> Self {
        Self::with_shared_client(config, Arc::new(client))
    }

    /// Build a driver around a client that other drivers may also use.
    pub fn with_shared_client(config: DriverConfig, client: Arc<C>) -> Self {
        debug!(config = %config.summary(false), "creating trino driver");
        let limiter = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            config,
            client,
            limiter,
        }
    }

    /// Parallel queries the remote engine handles safely when nothing else is configured.
    pub fn default_concurrency() -> usize {
        DEFAULT_MAX_CONCURRENCY
    }

    pub fn dialect() -> Dialect {
        Dialect::Prestodb
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Produce the final query text sent to the server.
    pub fn prepare_query(&self, template: &str, values: &[Value]) -> String {
        format_query(template, values)
    }

    async fn submit(
        &self,
        template: &str,
        values: &[Value],
    ) -> Result<(C::Pages, OwnedSemaphorePermit), DriverError> {
        let sql = self.prepare_query(template, values);
        let permit = Arc::clone(&self.limiter)
            .acquire_owned()
            .await
            .map_err(|e| DriverError::Connection {
                message: format!("query limiter closed: {}", e),
            })?;
        debug!(data_source = %self.config.data_source, sql = %sql, "submitting query");
        let pages = self.client.submit(&sql).await?;
        Ok((pages, permit))
    }

    /// Run a query and collect every row together with the column metadata.
    pub async fn query(&self, template: &str, values: &[Value]) -> Result<QueryResult, DriverError> {
        let start = Instant::now();
        let (pages, _permit) = self.submit(template, values).await?;
        let result = collect_rows(pages).await?;
        info!(
            rows = result.rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "query complete"
        );
        Ok(result)
    }

    /// Run a query and return its rows in page order.
    pub async fn execute_query(&self, template: &str, values: &[Value]) -> Result<Vec<Row>, DriverError> {
        Ok(self.query(template, values).await?.rows)
    }

    /// Run a query and read its rows through a `RowStream`.
    ///
    /// The stream mode comes from `DriverConfig::stream`. A stream keeps its concurrency slot
    /// until the last page has been fetched or the stream is dropped.
    pub async fn execute_streaming_query(
        &self,
        template: &str,
        values: &[Value],
    ) -> Result<RowStream, DriverError> {
        let (pages, permit) = self.submit(template, values).await?;
        debug!(mode = ?self.config.stream.mode, "opening row stream");
        stream_rows_holding(pages, self.config.stream, Some(permit)).await
    }

    /// Check that the configured catalog exists by listing its schemas.
    pub async fn test_connection(&self) -> Result<(), DriverError> {
        let catalog = self.config.catalog.clone().ok_or_else(|| DriverError::Config {
            message: "no catalog configured for connection test".to_string(),
        })?;

        let schemas = self
            .execute_query("SHOW SCHEMAS FROM ??", &[Value::Identifier(catalog.clone())])
            .await?;
        if schemas.is_empty() {
            warn!(catalog = %catalog, "connection test found no schemas");
            return Err(DriverError::CatalogNotFound { catalog });
        }
        info!(catalog = %catalog, schemas = schemas.len(), "connection test passed");
        Ok(())
    }

    /// Run a query for export, streaming rows when `stream_import` is set.
    pub async fn download_query_results(
        &self,
        template: &str,
        values: &[Value],
        options: DownloadOptions,
    ) -> Result<Download, DriverError> {
        if options.stream_import {
            return Ok(Download::Stream(
                self.execute_streaming_query(template, values).await?,
            ));
        }
        Ok(Download::Rows(self.query(template, values).await?))
    }
}
