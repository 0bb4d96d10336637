pub mod collector;
pub mod config;
pub mod driver;
pub mod error;
pub mod masking;
pub mod protocol;
pub mod stream;
pub mod template;

pub use collector::QueryResult;
pub use config::{ConfigOverrides, DriverConfig};
pub use driver::{Dialect, Download, DownloadOptions, TrinoDriver};
pub use error::{DriverError, Result};
pub use protocol::{Column, Page, PageIterator, ProtocolClient, Row};
pub use stream::{RowStream, StreamMode, StreamOptions};
pub use template::Value;
