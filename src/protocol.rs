use crate::error::DriverError;
use serde::{Deserialize, Serialize};

/// A single result row, passed through exactly as the server sent it.
pub type Row = Vec<serde_json::Value>;

/// Metadata for a single result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One round-trip worth of results from the statement protocol.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Option<String>,
    pub next_uri: Option<String>,
    pub columns: Option<Vec<Column>>,
    pub data: Option<Vec<Row>>,
    pub stats: Option<PageStats>,
    pub error: Option<PageError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub state: Option<String>,
    pub processed_rows: Option<u64>,
}

/// Failure reported by the server inside a page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageError {
    pub message: Option<String>,
    pub error_code: Option<i64>,
    pub error_name: Option<String>,
}

impl Page {
    /// A page carrying only rows.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            data: Some(rows),
            ..Default::default()
        }
    }

    /// Number of rows carried by this page.
    pub fn row_count(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// Convert an embedded server error into a `DriverError::Query`.
    pub fn check(&self) -> Result<(), DriverError> {
        match &self.error {
            Some(err) => {
                let message = err
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                let message = match &err.error_name {
                    Some(name) => format!("{}: {}", name, message),
                    None => message,
                };
                Err(DriverError::Query { message })
            }
            None => Ok(()),
        }
    }
}

/// Pull-based cursor over the pages of one submitted query.
pub trait PageIterator: Send {
    /// Fetch the next page, or `None` once the query is exhausted.
    fn next_page(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<Page>, DriverError>> + Send;
}

/// Client for the remote statement protocol.
///
/// Implementations own transport concerns (sockets, authentication, retries) and must be
/// safe to share between concurrent queries.
pub trait ProtocolClient: Send + Sync + 'static {
    type Pages: PageIterator + 'static;

    fn submit(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Self::Pages, DriverError>> + Send;
}
