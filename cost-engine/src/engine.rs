//! Cost engine
//!
//! Orchestrates classification resolution, pricing, reconciliation and
//! persistence for one issuance. Each call is a one-shot sequence of
//! backend calls with no retry; concurrent calls for the same issuance are
//! not coordinated and the backend's last write wins.

use crate::{
    classification::{ClassificationIds, ClassificationResolver, LookupSource},
    config::Config,
    editor::ScheduleEditor,
    pricing::{expand_fees, PricingClient, PricingRequest},
    reconcile::reconcile,
    store::{CostStore, PersistRequest},
    totals::CostScheduleTotals,
    types::{CostLine, IssuanceId, Series},
    Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Input of a recalculation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationRequest {
    /// Issuance being recalculated
    pub issuance_id: IssuanceId,

    /// Classification currently stored on the issuance
    #[serde(default)]
    pub current: ClassificationIds,

    /// New classification values; unset fields keep the current value
    #[serde(default)]
    pub change: ClassificationIds,

    /// Explicit total volume, overriding the series sum
    #[serde(default)]
    pub volume: Option<Decimal>,

    /// Current series of the issuance
    #[serde(default)]
    pub series: Vec<Series>,
}

impl RecalculationRequest {
    /// Volume sent to pricing: explicit value, else the sum of series nominals
    pub fn total_volume(&self) -> Decimal {
        self.volume
            .unwrap_or_else(|| self.series.iter().map(|s| s.nominal_value).sum())
    }
}

/// Result of a successful recalculation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationOutcome {
    /// Issuance recalculated
    pub issuance_id: IssuanceId,

    /// Version written by the backend
    pub version: Option<u32>,

    /// Persisted lines
    pub lines: Vec<CostLine>,

    /// Persisted totals
    pub totals: CostScheduleTotals,

    /// Stored automatic lines dropped
    pub discarded_automatic: usize,

    /// Completion timestamp
    pub recalculated_at: DateTime<Utc>,
}

/// Cost engine
pub struct CostEngine {
    /// Lookup tables
    lookups: Arc<dyn LookupSource>,

    /// Pricing function
    pricing: Arc<dyn PricingClient>,

    /// Schedule store
    store: Arc<dyn CostStore>,

    /// Label resolution
    resolver: ClassificationResolver,
}

impl CostEngine {
    /// Create new cost engine
    pub fn new(
        lookups: Arc<dyn LookupSource>,
        pricing: Arc<dyn PricingClient>,
        store: Arc<dyn CostStore>,
        config: &Config,
    ) -> Self {
        Self {
            lookups,
            pricing,
            store,
            resolver: ClassificationResolver::new(config.classification.offer_type_prefix.clone()),
        }
    }

    /// Recompute, merge and persist the fee schedule of an issuance.
    ///
    /// Callers must invalidate any cached view of the schedule on success.
    pub async fn recalculate(&self, request: &RecalculationRequest) -> Result<RecalculationOutcome> {
        let issuance_id = request.issuance_id;
        info!("Recalculating cost schedule for issuance {}", issuance_id);

        // Step 1: Resolve classification labels
        let ids = request.current.overlay(&request.change);
        let classification = self.resolver.resolve(self.lookups.as_ref(), &ids).await?;

        // Step 2: Price
        let pricing_request = PricingRequest {
            category: classification.category.as_str().to_string(),
            offer_type: classification.offer_type,
            vehicle: classification.vehicle,
            backing_type: classification.backing_type,
            volume: request.total_volume(),
            series: request.series.clone(),
        };
        let fees = self
            .pricing
            .price(&pricing_request)
            .await
            .and_then(|response| response.into_fees())
            .map_err(|e| {
                error!("Pricing failed for issuance {}: {}", issuance_id, e);
                e
            })?;

        let candidates = expand_fees(&fees);
        info!(
            "Pricing returned {} fees → {} automatic lines",
            fees.len(),
            candidates.len()
        );

        // Step 3: Merge with the stored schedule
        let existing = self
            .store
            .load(issuance_id)
            .await?
            .map(|schedule| schedule.lines)
            .unwrap_or_default();
        let reconciled = reconcile(existing, candidates);

        // Step 4: Persist
        let totals = CostScheduleTotals::from_lines(&reconciled.lines);
        let version = self.persist(issuance_id, &reconciled.lines, totals).await?;

        info!(
            "Cost schedule for issuance {} saved as v{:?}: {} lines, first year {}",
            issuance_id,
            version,
            reconciled.lines.len(),
            totals.total_first_year
        );

        Ok(RecalculationOutcome {
            issuance_id,
            version,
            lines: reconciled.lines,
            totals,
            discarded_automatic: reconciled.discarded_automatic,
            recalculated_at: Utc::now(),
        })
    }

    /// Open the stored schedule for manual editing
    pub async fn editor(&self, issuance_id: IssuanceId) -> Result<ScheduleEditor> {
        let lines = self
            .store
            .load(issuance_id)
            .await?
            .map(|schedule| schedule.lines)
            .unwrap_or_default();
        Ok(ScheduleEditor::new(lines))
    }

    /// Persist a manually edited schedule as a new version
    pub async fn save_schedule(&self, issuance_id: IssuanceId, lines: Vec<CostLine>) -> Result<Option<u32>> {
        let totals = CostScheduleTotals::from_lines(&lines);
        let version = self.persist(issuance_id, &lines, totals).await?;
        info!(
            "Manual cost schedule for issuance {} saved as v{:?} ({} lines)",
            issuance_id,
            version,
            lines.len()
        );
        Ok(version)
    }

    async fn persist(
        &self,
        issuance_id: IssuanceId,
        lines: &[CostLine],
        totals: CostScheduleTotals,
    ) -> Result<Option<u32>> {
        let request = PersistRequest {
            issuance_id,
            lines: lines.to_vec(),
            totals,
        };

        self.store
            .save(&request)
            .await
            .and_then(|response| response.into_version())
            .map_err(|e| {
                error!("Failed to persist cost schedule for {}: {}", issuance_id, e);
                e
            })
    }
}

impl std::fmt::Debug for CostEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostEngine")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{LookupEntry, LookupKind, StaticLookups};
    use crate::pricing::{PricedFee, PricingResponse};
    use crate::store::InMemoryCostStore;
    use crate::types::{Origin, PricingType};
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Returns a fixed response and records every request
    struct FixedPricing {
        response: PricingResponse,
        requests: Mutex<Vec<PricingRequest>>,
    }

    impl FixedPricing {
        fn new(response: PricingResponse) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PricingClient for FixedPricing {
        async fn price(&self, request: &PricingRequest) -> Result<PricingResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn lookups() -> Arc<StaticLookups> {
        Arc::new(
            StaticLookups::new()
                .with_entries(LookupKind::Category, vec![LookupEntry::new("cat-cri", "CRI", "CRI")])
                .with_entries(
                    LookupKind::OfferType,
                    vec![LookupEntry::new("of-1", "Privada Pura", "PP")],
                ),
        )
    }

    fn request(issuance_id: IssuanceId) -> RecalculationRequest {
        RecalculationRequest {
            issuance_id,
            current: ClassificationIds {
                category_id: Some("cat-cri".into()),
                ..Default::default()
            },
            change: ClassificationIds {
                offer_type_id: Some("of-1".into()),
                ..Default::default()
            },
            volume: None,
            series: vec![
                Series { number: 1, nominal_value: Decimal::from(6_000_000), term: Some(60) },
                Series { number: 2, nominal_value: Decimal::from(4_000_000), term: None },
            ],
        }
    }

    fn trustee_fee() -> PricedFee {
        PricedFee {
            role: "Trustee".into(),
            provider_id: None,
            pricing_type: PricingType::Fixed,
            computed_upfront_amount: Some(Decimal::from(15000)),
            computed_recurring_amount: None,
            periodicity: None,
        }
    }

    #[test]
    fn test_total_volume() {
        let mut req = request(IssuanceId::new(Uuid::new_v4()));
        assert_eq!(req.total_volume(), Decimal::from(10_000_000));

        req.volume = Some(Decimal::from(12_000_000));
        assert_eq!(req.total_volume(), Decimal::from(12_000_000));
    }

    #[tokio::test]
    async fn test_pricing_request_shape() {
        let pricing = Arc::new(FixedPricing::new(PricingResponse::ok(vec![trustee_fee()])));
        let store = Arc::new(InMemoryCostStore::new());
        let engine = CostEngine::new(lookups(), pricing.clone(), store, &Config::default());

        engine.recalculate(&request(IssuanceId::new(Uuid::new_v4()))).await.unwrap();

        let sent = pricing.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.category, "CRI");
        assert_eq!(sent.offer_type, "Oferta Privada Pura");
        assert_eq!(sent.vehicle, "");
        assert_eq!(sent.volume, Decimal::from(10_000_000));
        assert_eq!(sent.series.len(), 2);
    }

    #[tokio::test]
    async fn test_recalculate_persists_new_version() {
        let pricing = Arc::new(FixedPricing::new(PricingResponse::ok(vec![trustee_fee()])));
        let store = Arc::new(InMemoryCostStore::new());
        let engine = CostEngine::new(lookups(), pricing, store.clone(), &Config::default());
        let issuance = IssuanceId::new(Uuid::new_v4());

        let first = engine.recalculate(&request(issuance)).await.unwrap();
        let second = engine.recalculate(&request(issuance)).await.unwrap();

        assert_eq!(first.version, Some(1));
        assert_eq!(second.version, Some(2));
        assert_eq!(second.discarded_automatic, 1);
        // Carried over from the first run
        assert_eq!(first.lines[0].id, second.lines[0].id);
        assert_eq!(store.history(issuance).await.len(), 2);
    }

    #[tokio::test]
    async fn test_pricing_failure_leaves_store_untouched() {
        let pricing = Arc::new(FixedPricing::new(PricingResponse::failed("no combination")));
        let store = Arc::new(InMemoryCostStore::new());
        let engine = CostEngine::new(lookups(), pricing, store.clone(), &Config::default());
        let issuance = IssuanceId::new(Uuid::new_v4());

        let result = engine.recalculate(&request(issuance)).await;

        assert!(matches!(result, Err(Error::PricingFailure(msg)) if msg == "no combination"));
        assert!(store.history(issuance).await.is_empty());
    }

    #[tokio::test]
    async fn test_manual_save_path() {
        let pricing = Arc::new(FixedPricing::new(PricingResponse::ok(vec![trustee_fee()])));
        let store = Arc::new(InMemoryCostStore::new());
        let engine = CostEngine::new(lookups(), pricing, store.clone(), &Config::default());
        let issuance = IssuanceId::new(Uuid::new_v4());

        engine.recalculate(&request(issuance)).await.unwrap();

        let mut editor = engine.editor(issuance).await.unwrap();
        let id = editor.lines()[0].id;
        editor.begin_edit(id).unwrap();
        editor.set_amount(id, Decimal::from(20000)).unwrap();
        editor.save(id).unwrap();

        let version = engine.save_schedule(issuance, editor.into_lines()).await.unwrap();
        assert_eq!(version, Some(2));

        // The edited line now survives recalculation
        let outcome = engine.recalculate(&request(issuance)).await.unwrap();
        assert_eq!(outcome.lines.len(), 1);
        assert_eq!(outcome.lines[0].origin, Origin::Manual);
        assert_eq!(outcome.lines[0].upfront_price, Decimal::from(20000));
        assert_eq!(outcome.discarded_automatic, 0);
    }
}
