//! Networking utilities behind every search.
//!
//! - [`ResponseCache`]: file-backed cache of raw response bodies keyed by URL fingerprint
//! - [`Fetcher`]: cache-first fetch with per-attempt timeout and exponential backoff
//! - [`Transport`]: injectable request primitive, implemented by [`HttpTransport`]
//! - [`RetryConfig`]: retry count and backoff bounds
//!
//! # Fetching with retries
//!
//! ```rust,no_run
//! use kaken_client::utils::{Fetcher, HttpTransport, ResponseCache, RetryConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(
//!     Arc::new(HttpTransport::new()?),
//!     ResponseCache::new("/tmp/kaken-cache"),
//!     RetryConfig::default().max_retries(3),
//!     Duration::from_secs(30),
//! );
//! let response = fetcher.fetch("https://kaken.nii.ac.jp/opensearch/?kw=graphene").await?;
//! println!("{} bytes (cached: {})", response.body.len(), response.from_cache);
//! # Ok(())
//! # }
//! ```

mod cache;
mod fetch;
mod http;
mod retry;

pub use cache::{ResponseCache, CACHE_FILE_SUFFIX};
pub use fetch::{Fetcher, RawResponse, Transport, TransportError, TransportResponse};
pub use http::HttpTransport;
pub use retry::{RetryConfig, TransientError};

#[cfg(test)]
pub(crate) use fetch::mock;
