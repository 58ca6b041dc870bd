//! HTTP client for the storefront catalog API
//!
//! Authenticates against the remote demo API and exposes the product and
//! profile endpoints. Expired access tokens are refreshed transparently:
//! concurrent 401s share a single refresh call and every affected request
//! is retried exactly once against the new token.

pub mod client;
pub mod error;
pub mod refresh;

pub use client::{DEFAULT_BASE_URL, StorefrontClient, StorefrontClientBuilder};
pub use error::ClientError;
pub use refresh::{RefreshCoordinator, RefreshError, RefreshRole};

// Re-export the core types callers handle directly.
pub use storefront_core::{
    FileStorage, KeyValueStorage, LoginRequest, LoginResponse, MemoryStorage, Product,
    ProductPage, TokenPair, TokenStore, User,
};
