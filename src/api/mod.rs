//! Checkpointer REST API: typed adapters and the cached client built on them.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod resources;
pub mod types;

pub use cache::{ApiQueryKey, BrowseParams, PageParams, SortBy, SortOrder};
pub use cached_client::CachedClient;
pub use client::ApiClient;
pub use resources::{HistoryParams, Resource};
