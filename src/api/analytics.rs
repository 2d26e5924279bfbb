use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::DriverId;

use super::error::ApiError;

// ============================================================================
// Analytics Client
// ============================================================================
//
// Read-only reporting surface: one detailed report per trailing window plus
// export links the operator opens directly. Charts themselves are rendered
// elsewhere; this client only fetches the numbers and builds URLs.
//
// ============================================================================

/// Trailing windows the report supports, in days.
pub const REPORT_WINDOWS: [u32; 4] = [7, 30, 90, 365];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Daily,
    Status,
    Drivers,
    Customers,
    Master,
}

impl ReportKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReportKind::Daily => "/api/export/daily-report",
            ReportKind::Status => "/api/export/status-report",
            ReportKind::Drivers => "/api/export/drivers-report",
            ReportKind::Customers => "/api/export/customers-report",
            ReportKind::Master => "/api/export/master-report",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsReport {
    pub total_money: f64,
    /// Orders per note denomination; keys are "100", "200", "300".
    pub birr_counts: BTreeMap<String, u64>,
    pub status_counts: StatusCounts,
    pub total_users: u64,
    /// Orders per calendar day, keyed by date string.
    pub daily_counts: BTreeMap<String, u64>,
    /// Successful trips per driver name.
    pub driver_performance: BTreeMap<String, u64>,
    pub customer_stats: Vec<CustomerActivity>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusCounts {
    pub successful: u64,
    pub unsuccessful: u64,
    pub pending: u64,
}

impl StatusCounts {
    /// Share of finished deliveries that succeeded, as a percentage. A
    /// window with no finished deliveries reads as zero.
    pub fn success_rate(&self) -> f64 {
        let finished = (self.successful + self.unsuccessful).max(1);
        self.successful as f64 / finished as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerActivity {
    pub phone: String,
    pub location: Option<String>,
    pub sent: u64,
    pub received: u64,
    pub total: u64,
}

pub struct AnalyticsApi {
    http: reqwest::Client,
    base_url: String,
}

impl AnalyticsApi {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn detailed(&self, days: u32) -> Result<AnalyticsReport, ApiError> {
        let url = format!("{}/api/analytics/detailed", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("days", days)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                op: "analytics_detailed",
                status,
            });
        }
        let report: AnalyticsReport = response.json().await?;
        tracing::debug!(days, customers = report.customer_stats.len(), "analytics fetched");
        Ok(report)
    }

    /// Link the operator opens to download a report. The driver filter only
    /// applies to the drivers report.
    pub fn export_url(
        &self,
        kind: ReportKind,
        days: u32,
        driver_filter: Option<&DriverId>,
    ) -> String {
        let mut url = format!("{}{}?days={}", self.base_url, kind.endpoint(), days);
        if kind == ReportKind::Drivers {
            if let Some(driver) = driver_filter {
                url.push_str(&format!("&driverId={driver}"));
            }
        }
        url
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
