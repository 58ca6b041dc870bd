//! Product catalog client methods

use super::StorefrontClient;
use crate::error::ClientError;
use storefront_core::{Product, ProductPage};

impl StorefrontClient {
    /// List the product catalog
    pub async fn list_products(&self) -> Result<ProductPage, ClientError> {
        self.get_json("/products", None).await
    }

    /// Get a single product by id
    pub async fn get_product(&self, id: u64) -> Result<Product, ClientError> {
        self.get_json(&format!("/products/{id}"), None).await
    }

    /// Search products by free-text query (public endpoint)
    pub async fn search_products(&self, query: &str) -> Result<ProductPage, ClientError> {
        self.get_json("/products/search", Some(&[("q", query)]))
            .await
    }
}
