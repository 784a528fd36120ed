//! Cost schedule persistence
//!
//! Every successful write creates a new version of the issuance's schedule;
//! earlier versions stay in the backend for audit. The engine only ever
//! reads the current version.

use crate::totals::CostScheduleTotals;
use crate::types::{CostLine, IssuanceId};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Current schedule of an issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSchedule {
    /// Owning issuance
    pub issuance_id: IssuanceId,

    /// Version number, starting at 1
    pub version: u32,

    /// Cost lines
    pub lines: Vec<CostLine>,

    /// Totals as written
    pub totals: CostScheduleTotals,

    /// Write timestamp
    pub saved_at: DateTime<Utc>,
}

/// Write request for the persistence function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistRequest {
    /// Owning issuance
    pub issuance_id: IssuanceId,

    /// Complete line set for the new version
    pub lines: Vec<CostLine>,

    /// Totals over `lines`
    pub totals: CostScheduleTotals,
}

/// Response of the persistence function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistResponse {
    /// Whether the write succeeded
    pub success: bool,

    /// Version created by the write
    #[serde(default)]
    pub version: Option<u32>,

    /// Error message, present on failure
    #[serde(default)]
    pub error: Option<String>,
}

impl PersistResponse {
    /// Successful write
    pub fn ok(version: u32) -> Self {
        Self {
            success: true,
            version: Some(version),
            error: None,
        }
    }

    /// Failed write
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            version: None,
            error: Some(message.into()),
        }
    }

    /// Version of a successful write, or `PersistenceFailure`
    pub fn into_version(self) -> Result<Option<u32>> {
        if !self.success {
            return Err(Error::PersistenceFailure(
                self.error
                    .unwrap_or_else(|| "Persistence function reported failure".to_string()),
            ));
        }
        Ok(self.version)
    }
}

/// Backend holding cost schedules
#[async_trait]
pub trait CostStore: Send + Sync {
    /// Current schedule, `None` if the issuance has never been priced
    async fn load(&self, issuance_id: IssuanceId) -> Result<Option<StoredSchedule>>;

    /// Write a new version
    async fn save(&self, request: &PersistRequest) -> Result<PersistResponse>;
}

/// In-memory versioned store with full history
#[derive(Debug, Default)]
pub struct InMemoryCostStore {
    history: RwLock<HashMap<IssuanceId, Vec<StoredSchedule>>>,
}

impl InMemoryCostStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an issuance with an existing schedule as version 1
    pub async fn seed(&self, issuance_id: IssuanceId, lines: Vec<CostLine>) {
        let totals = CostScheduleTotals::from_lines(&lines);
        let snapshot = StoredSchedule {
            issuance_id,
            version: 1,
            lines,
            totals,
            saved_at: Utc::now(),
        };
        self.history.write().await.insert(issuance_id, vec![snapshot]);
    }

    /// Every version written for an issuance, oldest first
    pub async fn history(&self, issuance_id: IssuanceId) -> Vec<StoredSchedule> {
        self.history
            .read()
            .await
            .get(&issuance_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CostStore for InMemoryCostStore {
    async fn load(&self, issuance_id: IssuanceId) -> Result<Option<StoredSchedule>> {
        Ok(self
            .history
            .read()
            .await
            .get(&issuance_id)
            .and_then(|versions| versions.last().cloned()))
    }

    async fn save(&self, request: &PersistRequest) -> Result<PersistResponse> {
        // Line ids are primary keys in the backend
        let mut seen = HashSet::with_capacity(request.lines.len());
        if let Some(dup) = request.lines.iter().find(|l| !seen.insert(l.id)) {
            warn!("Rejecting schedule for {}: duplicate line id {}", request.issuance_id, dup.id);
            return Ok(PersistResponse::failed(format!("Duplicate line id {}", dup.id)));
        }

        let mut history = self.history.write().await;
        let versions = history.entry(request.issuance_id).or_default();
        let version = versions.last().map(|s| s.version).unwrap_or(0) + 1;

        versions.push(StoredSchedule {
            issuance_id: request.issuance_id,
            version,
            lines: request.lines.clone(),
            totals: request.totals,
            saved_at: Utc::now(),
        });

        info!(
            "Stored cost schedule v{} for issuance {} ({} lines)",
            version,
            request.issuance_id,
            request.lines.len()
        );

        Ok(PersistResponse::ok(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricingType;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn request(issuance_id: IssuanceId, lines: Vec<CostLine>) -> PersistRequest {
        let totals = CostScheduleTotals::from_lines(&lines);
        PersistRequest {
            issuance_id,
            lines,
            totals,
        }
    }

    #[tokio::test]
    async fn test_versions_increment_and_history_is_kept() {
        let store = InMemoryCostStore::new();
        let issuance = IssuanceId::new(Uuid::new_v4());

        assert!(store.load(issuance).await.unwrap().is_none());

        let first = vec![CostLine::automatic_upfront("Trustee", None, PricingType::Fixed, Decimal::from(1))];
        let v1 = store.save(&request(issuance, first)).await.unwrap();
        assert_eq!(v1, PersistResponse::ok(1));

        let v2 = store.save(&request(issuance, vec![])).await.unwrap();
        assert_eq!(v2.into_version().unwrap(), Some(2));

        let current = store.load(issuance).await.unwrap().unwrap();
        assert_eq!(current.version, 2);
        assert!(current.lines.is_empty());
        assert_eq!(store.history(issuance).await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let store = InMemoryCostStore::new();
        let issuance = IssuanceId::new(Uuid::new_v4());

        let a = CostLine::automatic_upfront("Trustee", None, PricingType::Fixed, Decimal::from(1));
        let mut b = CostLine::automatic_upfront("Auditor", None, PricingType::Fixed, Decimal::from(2));
        b.id = a.id;

        let response = store.save(&request(issuance, vec![a, b])).await.unwrap();
        assert!(!response.success);
        assert!(matches!(response.into_version(), Err(Error::PersistenceFailure(_))));
        assert!(store.load(issuance).await.unwrap().is_none());
    }
}
