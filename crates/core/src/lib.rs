//! Storefront core types and storage

pub mod storage;
pub mod token;
pub mod types;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use token::TokenStore;
pub use types::{
    LoginRequest, LoginResponse, Product, ProductPage, RefreshTokenRequest, TokenPair, User,
};
