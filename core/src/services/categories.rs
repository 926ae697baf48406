//! Category catalogue.

use super::listing_items;
use crate::adapters::{normalize_category, Category};
use crate::error::ApiError;
use crate::transport::{RequestOptions, Transport};

#[derive(Clone)]
pub struct CategoryService {
    transport: Transport,
}

impl CategoryService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Accepts a bare array or an `{items}` envelope; anything else is empty.
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let body = self.transport.get("/categories", RequestOptions::new()).await?;
        Ok(listing_items(&body).iter().filter_map(normalize_category).collect())
    }
}
