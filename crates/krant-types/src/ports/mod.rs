//! Trait contracts separating this crate's data model from the concrete
//! adapters that implement storage, LLM access, and stock quotes.

pub mod cache;
pub mod llm;
pub mod repository;
pub mod stock;

pub use cache::CacheStorage;
pub use llm::LlmClient;
pub use repository::ArticleRepository;
pub use stock::StockQuoteClient;
