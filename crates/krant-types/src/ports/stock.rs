//! The stock-quote port consumed by `krant-workers`'s batch coalescer (C10, §6).

use async_trait::async_trait;

use crate::article::StockQuote;
use crate::error::Result;

#[async_trait]
pub trait StockQuoteClient: Send + Sync {
    /// Fetch quotes for a batch of symbols in one round trip. Implementations
    /// should return whatever subset they could resolve rather than failing
    /// the whole batch over one bad symbol.
    async fn get_quotes_batch(&self, symbols: &[String]) -> Result<Vec<StockQuote>>;

    async fn get_quote(&self, symbol: &str) -> Result<StockQuote> {
        let mut quotes = self.get_quotes_batch(std::slice::from_ref(&symbol.to_string())).await?;
        quotes.pop().ok_or_else(|| crate::error::KrantError::NoContent)
    }
}
