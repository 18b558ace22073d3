//! # KAKEN Client
//!
//! A client for the KAKEN research-grant database: grant project search (XML)
//! and researcher search (JSON), normalized into one typed model.
//!
//! ## Architecture
//!
//! - [`client`]: [`KakenClient`], request building through normalization
//! - [`models`]: Projects, researchers, search parameters and envelopes
//! - [`parsers`]: XML and JSON normalizers plus locale selection
//! - [`utils`]: Response cache, retrying fetcher and HTTP transport
//! - [`config`]: Configuration management
//! - [`error`]: The [`KakenError`] taxonomy
//!
//! ```rust,no_run
//! use kaken_client::{config::Config, models::ProjectSearchParams, KakenClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), kaken_client::KakenError> {
//! let client = KakenClient::new(Config::default())?;
//! let response = client
//!     .search_projects(&ProjectSearchParams::new("graphene").results_per_page(20))
//!     .await?;
//! for project in &response.items {
//!     println!("{}", project.title.as_deref().unwrap_or("-"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod parsers;
pub mod utils;

// Re-export commonly used types
pub use client::KakenClient;
pub use error::KakenError;
pub use models::{Project, Researcher, SearchResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
