//! NexusClin client layer: session store, API client, and query cache.
//!
//! Feature views read server resources through [`cache::QueryCache`] and
//! write through [`cache::Mutation`] impls; the cache calls the
//! [`api_client::ApiClient`], which reads credentials from the
//! [`session_store::SessionStore`]. Views never touch a cache entry
//! directly.

pub mod api_client;
pub mod cache;
pub mod error;
pub mod mutations;
pub mod session_store;

pub use api_client::ApiClient;
pub use cache::{CacheSnapshot, FetchOptions, Mutation, QueryCache, QueryKey, ResourceKind};
pub use error::ApiError;
pub use session_store::SessionStore;
