use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use voice_agent_core::{DataClient, Result, StationInfo, SubscriptionStatus, SwapRecord};

/// Canned-data `DataClient`. Every lookup returns a deterministic, synthetic
/// record derived from its input so the orchestrator's intent handlers can
/// be exercised and tested without a real backend.
#[derive(Default)]
pub struct StubDataClient;

impl StubDataClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataClient for StubDataClient {
    async fn find_nearest_station(&self, location: &str) -> Result<StationInfo> {
        Ok(StationInfo {
            name: format!("Station {location}"),
            address: format!("Main Road, {location}"),
        })
    }

    async fn get_swap_history(
        &self,
        _driver_id: Option<&str>,
        _date_range: &str,
    ) -> Result<Vec<SwapRecord>> {
        let timestamp = NaiveDate::from_ymd_opt(2026, 1, 22)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .expect("valid fixed calendar date");
        Ok(vec![SwapRecord {
            station_name: "Station Connaught Place".to_string(),
            timestamp: Utc.from_utc_datetime(&timestamp),
        }])
    }

    async fn check_subscription(&self, _driver_id: Option<&str>) -> Result<SubscriptionStatus> {
        let expiry = NaiveDate::from_ymd_opt(2026, 12, 31)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid fixed calendar date");
        Ok(SubscriptionStatus {
            status: "active".to_string(),
            expiry: Utc.from_utc_datetime(&expiry),
        })
    }
}
