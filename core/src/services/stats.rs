//! Platform-wide counters.

use super::json_or_null;
use crate::adapters::{normalize_stats, PlatformStats};
use crate::error::ApiError;
use crate::transport::{RequestOptions, Transport};

#[derive(Clone)]
pub struct StatsService {
    transport: Transport,
}

impl StatsService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn fetch_platform_stats(&self) -> Result<PlatformStats, ApiError> {
        let body = self.transport.get("/stats", RequestOptions::new()).await?;
        Ok(normalize_stats(json_or_null(&body)))
    }
}
