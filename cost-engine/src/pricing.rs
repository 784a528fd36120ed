//! Pricing function interface
//!
//! The external pricing function is the only source of which automatic fees
//! apply to an issuance and at what price. This module holds its wire types
//! and the expansion of priced fees into automatic cost line candidates.

use crate::types::{CostLine, Periodicity, PricingType, ProviderId, Series};
use crate::{Error, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request sent to the pricing function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRequest {
    /// Category code
    pub category: String,
    /// Normalized offer type phrase
    pub offer_type: String,
    /// Vehicle name
    pub vehicle: String,
    /// Backing type name
    pub backing_type: String,
    /// Total issuance volume
    pub volume: Decimal,
    /// Series breakdown
    pub series: Vec<Series>,
}

/// One fee returned by the pricing function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedFee {
    /// Provider role
    pub role: String,

    /// Suggested provider
    #[serde(default)]
    pub provider_id: Option<ProviderId>,

    /// Fixed or percentage pricing
    pub pricing_type: PricingType,

    /// One-time amount
    #[serde(default)]
    pub computed_upfront_amount: Option<Decimal>,

    /// Periodic amount
    #[serde(default)]
    pub computed_recurring_amount: Option<Decimal>,

    /// Periodicity of the recurring amount
    #[serde(default)]
    pub periodicity: Option<Periodicity>,
}

/// Payload of a successful pricing response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingData {
    /// Applicable fees
    #[serde(default)]
    pub costs: Vec<PricedFee>,
}

/// Response of the pricing function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResponse {
    /// Whether pricing succeeded
    pub success: bool,

    /// Fees, present on success
    #[serde(default)]
    pub data: Option<PricingData>,

    /// Error message, present on failure
    #[serde(default)]
    pub error: Option<String>,
}

impl PricingResponse {
    /// Successful response carrying `costs`
    pub fn ok(costs: Vec<PricedFee>) -> Self {
        Self {
            success: true,
            data: Some(PricingData { costs }),
            error: None,
        }
    }

    /// Failed response
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Fees of a successful response, or `PricingFailure`
    pub fn into_fees(self) -> Result<Vec<PricedFee>> {
        if !self.success {
            return Err(Error::PricingFailure(
                self.error
                    .unwrap_or_else(|| "Pricing function reported failure".to_string()),
            ));
        }
        Ok(self.data.map(|d| d.costs).unwrap_or_default())
    }
}

/// Client for the external pricing function
#[async_trait]
pub trait PricingClient: Send + Sync {
    /// Price an issuance
    async fn price(&self, request: &PricingRequest) -> Result<PricingResponse>;
}

/// Expand priced fees into automatic cost line candidates.
///
/// A fee yields an upfront line when its upfront amount is positive and a
/// recurring line when its recurring amount is positive, so one fee becomes
/// zero, one or two lines. Recurring lines default to monthly when the fee
/// states no periodicity (or states `none`, which would collide with the
/// upfront slot).
pub fn expand_fees(fees: &[PricedFee]) -> Vec<CostLine> {
    let mut candidates = Vec::with_capacity(fees.len() * 2);

    for fee in fees {
        if let Some(amount) = fee.computed_upfront_amount.filter(|a| *a > Decimal::ZERO) {
            candidates.push(CostLine::automatic_upfront(
                fee.role.clone(),
                fee.provider_id.clone(),
                fee.pricing_type,
                amount,
            ));
        }

        if let Some(amount) = fee.computed_recurring_amount.filter(|a| *a > Decimal::ZERO) {
            let periodicity = match fee.periodicity {
                Some(p) if p.is_recurring() => p,
                _ => Periodicity::Monthly,
            };
            candidates.push(CostLine::automatic_recurring(
                fee.role.clone(),
                fee.provider_id.clone(),
                fee.pricing_type,
                amount,
                periodicity,
            ));
        }
    }

    candidates
}
