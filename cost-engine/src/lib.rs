//! Cost Reconciliation Engine
//!
//! Recomputes the provider fee schedule of a structured-finance issuance
//! (CRI, CRA, FIDC, debentures) whenever its classification or volume
//! changes, and persists the result as a new schedule version.
//!
//! # Pipeline
//!
//! 1. **Resolve**: map classification ids to labels through lookup tables
//! 2. **Price**: ask the external pricing function which fees apply
//! 3. **Expand**: turn each priced fee into upfront/recurring cost lines
//! 4. **Reconcile**: drop stale automatic lines, keep manual overrides,
//!    carry identifiers, dedupe
//! 5. **Persist**: write lines and totals as a new version
//!
//! # Invariants
//!
//! - No two lines share an identity key `(role, periodicity)` after a pass
//! - Manual lines always win a key collision and keep their identifier
//! - Every line carries a distinct identifier
//! - Nothing is written unless the whole pass succeeds
//!
//! # Example
//!
//! ```no_run
//! use cost_engine::{BackendClient, Config, CostEngine, RecalculationRequest};
//! use std::sync::Arc;
//!
//! # async fn run(request: RecalculationRequest) -> cost_engine::Result<()> {
//! let config = Config::from_env()?;
//! let backend = Arc::new(BackendClient::new(config.backend.clone(), config.lookups.clone())?);
//! let engine = CostEngine::new(backend.clone(), backend.clone(), backend, &config);
//!
//! let outcome = engine.recalculate(&request).await?;
//! println!("version {:?}: {} lines", outcome.version, outcome.lines.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod classification;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod gross_up;
pub mod http;
pub mod pricing;
pub mod reconcile;
pub mod store;
pub mod totals;
pub mod types;

// Re-exports
pub use classification::{CategoryCode, LookupEntry, LookupKind, LookupSource, LookupTable, StaticLookups};
pub use config::Config;
pub use editor::{ScheduleEditor, Section};
pub use engine::{CostEngine, RecalculationOutcome, RecalculationRequest};
pub use error::{Error, Result};
pub use gross_up::gross_up;
pub use http::BackendClient;
pub use pricing::{PricingClient, PricingRequest, PricingResponse};
pub use reconcile::reconcile;
pub use store::{CostStore, InMemoryCostStore, PersistRequest, PersistResponse, StoredSchedule};
pub use totals::CostScheduleTotals;
pub use types::*;
