use std::sync::Arc;
use serde::Serialize;
use svckit::database::CqlSession;
use svckit::types::ColumnValue;

const RELEASE_VERSION_QUERY: &str = "SELECT release_version FROM system.local";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub driver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Store reachability through the shared session
pub struct HealthChecker {
    session: Arc<dyn CqlSession>,
}

impl HealthChecker {
    pub fn new(session: Arc<dyn CqlSession>) -> Self {
        Self { session }
    }

    pub async fn check(&self) -> HealthReport {
        let driver = self.session.driver_name().to_string();
        match self.session.query(RELEASE_VERSION_QUERY, vec![]).await {
            Ok(rows) => HealthReport {
                status: HealthStatus::Healthy,
                driver,
                version: rows
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_iter().next())
                    .and_then(ColumnValue::into_text),
                error: None,
            },
            Err(e) => HealthReport {
                status: HealthStatus::Unhealthy,
                driver,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }
}
