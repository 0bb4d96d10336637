use crate::collector::collect_rows;
use crate::error::DriverError;
use crate::protocol::{PageIterator, Row};
use futures::Stream;
use futures::stream::FusedStream;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// How a streaming query hands rows to its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Rows are pushed as each page arrives, through a bounded buffer.
    #[default]
    Incremental,
    /// The whole result is fetched into memory first, then replayed.
    ///
    /// Kept for callers that depend on failures surfacing before the first row. Memory use
    /// grows with the result size; prefer `Incremental` for large results.
    Materialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub mode: StreamMode,
    /// Rows that may sit in the buffer before the page fetcher waits for the consumer.
    pub buffer_rows: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            mode: StreamMode::Incremental,
            buffer_rows: 1024,
        }
    }
}

enum Source {
    Buffered(std::vec::IntoIter<Row>),
    Channel {
        rows: ReceiverStream<Result<Row, DriverError>>,
        task: Option<JoinHandle<()>>,
    },
}

/// Handle through which the rows of one query are read.
///
/// Yields every row in page order, then ends. A failure is yielded once as the final item.
/// Dropping or closing the handle stops any further page requests.
pub struct RowStream {
    source: Source,
    finished: bool,
}

impl RowStream {
    fn buffered(rows: Vec<Row>) -> Self {
        Self {
            source: Source::Buffered(rows.into_iter()),
            finished: false,
        }
    }

    /// Stop reading. Pending rows are discarded and the page fetcher shuts down.
    pub fn close(&mut self) {
        match &mut self.source {
            Source::Buffered(rows) => *rows = Vec::new().into_iter(),
            Source::Channel { rows, .. } => rows.close(),
        }
        self.finished = true;
    }
}

impl Stream for RowStream {
    type Item = Result<Row, DriverError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        let item = match &mut this.source {
            Source::Buffered(rows) => rows.next().map(Ok),
            Source::Channel { rows, task } => match ready!(Pin::new(rows).poll_next(cx)) {
                Some(item) => Some(item),
                // Channel drained; a panicked fetcher must not look like a complete result.
                None => match task {
                    Some(handle) => {
                        let joined = ready!(Pin::new(handle).poll(cx));
                        *task = None;
                        joined.err().map(|e| {
                            Err(DriverError::Stream {
                                message: format!("row fetcher failed: {}", e),
                            })
                        })
                    }
                    None => None,
                },
            },
        };

        if !matches!(item, Some(Ok(_))) {
            this.finished = true;
        }
        Poll::Ready(item)
    }
}

impl FusedStream for RowStream {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

/// Expose the rows behind `pages` as a `RowStream`.
///
/// In `Materialized` mode this drains the iterator before returning and fails the same way
/// `collect_rows` does. In `Incremental` mode it returns immediately and a background task
/// feeds the stream.
pub async fn stream_rows<P: PageIterator + 'static>(
    pages: P,
    options: StreamOptions,
) -> Result<RowStream, DriverError> {
    stream_rows_holding(pages, options, None).await
}

/// Same as `stream_rows`, keeping `permit` alive until no more pages will be requested.
pub(crate) async fn stream_rows_holding<P: PageIterator + 'static>(
    pages: P,
    options: StreamOptions,
    permit: Option<OwnedSemaphorePermit>,
) -> Result<RowStream, DriverError> {
    match options.mode {
        StreamMode::Materialized => {
            let result = collect_rows(pages).await?;
            drop(permit);
            debug!(rows = result.rows.len(), "replaying materialized result");
            Ok(RowStream::buffered(result.rows))
        }
        StreamMode::Incremental => {
            let (tx, rx) = mpsc::channel(options.buffer_rows.max(1));
            let task = tokio::spawn(pump(pages, tx, permit));
            Ok(RowStream {
                source: Source::Channel {
                    rows: ReceiverStream::new(rx),
                    task: Some(task),
                },
                finished: false,
            })
        }
    }
}

async fn pump<P: PageIterator>(
    mut pages: P,
    tx: mpsc::Sender<Result<Row, DriverError>>,
    _permit: Option<OwnedSemaphorePermit>,
) {
    let start = Instant::now();
    let mut page_count = 0usize;
    let mut row_count = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                warn!(pages = page_count, rows = row_count, "row stream closed by consumer, abandoning query");
                return;
            }
            next = pages.next_page() => next,
        };

        let page = match next.and_then(|page| match page {
            Some(page) => page.check().map(|()| Some(page)),
            None => Ok(None),
        }) {
            Ok(Some(page)) => page,
            Ok(None) => break,
            Err(err) => {
                error!(pages = page_count, rows = row_count, error = %err, "row stream failed");
                let _ = tx.send(Err(err)).await;
                return;
            }
        };

        page_count += 1;
        for row in page.data.unwrap_or_default() {
            if tx.send(Ok(row)).await.is_err() {
                warn!(pages = page_count, rows = row_count, "row stream closed by consumer, abandoning query");
                return;
            }
            row_count += 1;
        }
        debug!(page = page_count, rows = row_count, "streamed page");
    }

    info!(
        pages = page_count,
        rows = row_count,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "row stream complete"
    );
}
