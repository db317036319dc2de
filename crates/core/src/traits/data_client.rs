use async_trait::async_trait;

use crate::Result;

/// A single swap-history record (§4.2 `GetSwapHistory`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SwapRecord {
    pub station_name: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Nearest-station lookup result (§4.2 `FindNearestStation`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StationInfo {
    pub name: String,
    pub address: String,
}

/// Subscription status lookup result (§4.2 `CheckSubscription`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SubscriptionStatus {
    pub status: String,
    pub expiry: chrono::DateTime<chrono::Utc>,
}

/// Fetches the domain data an intent handler needs.
///
/// One method per data-backed intent; the remaining intents in the closed
/// set are stubbed or escalated by their handlers without a dedicated
/// `DataClient` method (documented per handler).
#[async_trait]
pub trait DataClient: Send + Sync + 'static {
    async fn find_nearest_station(&self, location: &str) -> Result<StationInfo>;

    async fn get_swap_history(
        &self,
        driver_id: Option<&str>,
        date_range: &str,
    ) -> Result<Vec<SwapRecord>>;

    async fn check_subscription(&self, driver_id: Option<&str>) -> Result<SubscriptionStatus>;
}
