//! Read-only access to the host's live part and stock data.

pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stockhistory_history::StockSnapshot;

pub use postgres::PostgresStockSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Host data that cannot be represented (bad currency code, ...).
    #[error("host data is invalid: {0}")]
    Invalid(String),

    #[error("stock source unavailable: {0}")]
    Unavailable(String),
}

/// Reads everything a snapshot needs in one go.
#[async_trait]
pub trait StockSource: Send + Sync + 'static {
    async fn read_snapshot(&self) -> Result<StockSnapshot, SourceError>;
}

#[async_trait]
impl<S> StockSource for Arc<S>
where
    S: StockSource + ?Sized,
{
    async fn read_snapshot(&self) -> Result<StockSnapshot, SourceError> {
        (**self).read_snapshot().await
    }
}

/// In-memory stock source for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStockSource {
    snapshot: StockSnapshot,
}

impl InMemoryStockSource {
    pub fn new(snapshot: StockSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl StockSource for InMemoryStockSource {
    async fn read_snapshot(&self) -> Result<StockSnapshot, SourceError> {
        Ok(self.snapshot.clone())
    }
}
