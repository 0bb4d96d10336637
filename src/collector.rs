use crate::error::DriverError;
use crate::protocol::{Column, PageIterator, Row};
use tracing::debug;

/// Every row of a query, in page arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

/// Drain `pages` to exhaustion and concatenate their rows.
///
/// The first error aborts the whole collection; rows gathered so far are discarded.
pub async fn collect_rows<P: PageIterator>(mut pages: P) -> Result<QueryResult, DriverError> {
    let mut result = QueryResult::default();
    let mut page_count = 0usize;

    while let Some(page) = pages.next_page().await? {
        page.check()?;
        page_count += 1;

        if result.columns.is_empty()
            && let Some(columns) = page.columns
        {
            result.columns = columns;
        }
        if let Some(data) = page.data {
            debug!(page = page_count, rows = data.len(), "collected page");
            result.rows.extend(data);
        }
    }

    debug!(pages = page_count, rows = result.rows.len(), "page iterator exhausted");
    Ok(result)
}
