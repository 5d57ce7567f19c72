//! Rate Limiting for the ingestion route
//!
//! Per-peer-IP limits via tower_governor (GCRA). Stations report on a fixed
//! schedule, so a misbehaving station or a replaying client hits the limit
//! long before the store feels it. Requires the service to be built with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use governor::middleware::StateInformationMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config with X-RateLimit-* response headers
pub type IngestGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request of quota
    #[serde(default = "default_per_second")]
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_per_second() -> u64 {
    2
}

fn default_burst_size() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Build the governor config for the ingestion route.
///
/// Returns `None` when the rate or the burst size is zero.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<IngestGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}
