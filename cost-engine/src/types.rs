//! Core types for cost schedules

use crate::gross_up::gross_up;
use crate::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Issuance identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuanceId(Uuid);

impl IssuanceId {
    /// Wrap an existing UUID
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for IssuanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted identifier of a cost line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

impl LineId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider entity reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create new provider ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where a cost line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Generated from the pricing table, replaced on every recalculation
    Auto,
    /// Entered by a user, never replaced by recalculation
    #[default]
    Manual,
}

/// How the provider prices the obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingType {
    /// Flat amount
    #[serde(alias = "fixo")]
    Fixed,
    /// Share of the issuance volume
    #[serde(alias = "percentual")]
    Percentage,
}

/// Payment periodicity of a cost line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    /// One-time upfront payment
    #[serde(alias = "upfront")]
    None,
    /// Paid every month
    #[serde(alias = "mensal")]
    Monthly,
    /// Paid every year
    #[serde(alias = "anual")]
    Annual,
}

impl Periodicity {
    /// Whether the line recurs
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Periodicity::None)
    }

    fn slot_label(&self) -> &'static str {
        match self {
            Periodicity::None => "upfront",
            Periodicity::Monthly => "monthly",
            Periodicity::Annual => "annual",
        }
    }
}

/// Accepts `null` (or a missing field) as an upfront-only line
fn periodicity_or_none<'de, D>(deserializer: D) -> std::result::Result<Periodicity, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Periodicity>::deserialize(deserializer)?.unwrap_or(Periodicity::None))
}

/// Merge key: two lines with the same key occupy the same obligation slot.
///
/// The provider is deliberately not part of the key, so two providers
/// filling one role on one periodicity cannot coexist in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    /// Provider role
    pub role: String,
    /// Periodicity slot (`None` is the upfront slot)
    pub slot: Periodicity,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.role, self.slot.slot_label())
    }
}

/// One fee obligation for a single provider role on an issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLine {
    /// Persisted identifier
    pub id: LineId,

    /// Provider role, e.g. "Trustee"
    pub role: String,

    /// Provider being paid, absent for generic lines
    #[serde(default)]
    pub provider_id: Option<ProviderId>,

    /// Automatic or manual
    #[serde(default)]
    pub origin: Origin,

    /// Fixed or percentage pricing
    pub pricing_type: PricingType,

    /// One-time net amount
    #[serde(default)]
    pub upfront_price: Decimal,

    /// Periodic net amount
    #[serde(default)]
    pub recurring_price: Decimal,

    /// Periodicity of the recurring amount
    #[serde(default = "default_periodicity", deserialize_with = "periodicity_or_none")]
    pub periodicity: Periodicity,

    /// Gross-up percentage (0-100)
    #[serde(default)]
    pub gross_up: Decimal,

    /// Upfront amount after gross-up
    #[serde(default)]
    pub gross_upfront_amount: Decimal,

    /// Recurring amount after gross-up
    #[serde(default)]
    pub gross_recurring_amount: Decimal,
}

fn default_periodicity() -> Periodicity {
    Periodicity::None
}

impl CostLine {
    /// Create an automatic upfront line with no gross-up
    pub fn automatic_upfront(
        role: impl Into<String>,
        provider_id: Option<ProviderId>,
        pricing_type: PricingType,
        amount: Decimal,
    ) -> Self {
        Self {
            id: LineId::generate(),
            role: role.into(),
            provider_id,
            origin: Origin::Auto,
            pricing_type,
            upfront_price: amount,
            recurring_price: Decimal::ZERO,
            periodicity: Periodicity::None,
            gross_up: Decimal::ZERO,
            gross_upfront_amount: amount,
            gross_recurring_amount: Decimal::ZERO,
        }
    }

    /// Create an automatic recurring line with no gross-up
    pub fn automatic_recurring(
        role: impl Into<String>,
        provider_id: Option<ProviderId>,
        pricing_type: PricingType,
        amount: Decimal,
        periodicity: Periodicity,
    ) -> Self {
        Self {
            id: LineId::generate(),
            role: role.into(),
            provider_id,
            origin: Origin::Auto,
            pricing_type,
            upfront_price: Decimal::ZERO,
            recurring_price: amount,
            periodicity,
            gross_up: Decimal::ZERO,
            gross_upfront_amount: Decimal::ZERO,
            gross_recurring_amount: amount,
        }
    }

    /// Merge key of this line
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            role: self.role.clone(),
            slot: self.periodicity,
        }
    }

    /// Check if the line was entered by a user
    pub fn is_manual(&self) -> bool {
        self.origin != Origin::Auto
    }

    /// Refresh both gross amounts from the net prices and gross-up.
    ///
    /// Leaves the line unchanged when either amount cannot be grossed up.
    pub fn recompute_gross(&mut self) -> Result<()> {
        let upfront = gross_up(self.upfront_price, self.gross_up)?;
        let recurring = gross_up(self.recurring_price, self.gross_up)?;
        self.gross_upfront_amount = upfront;
        self.gross_recurring_amount = recurring;
        Ok(())
    }
}

/// A tranche of an issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    /// Series number within the issuance
    pub number: u32,

    /// Nominal value
    pub nominal_value: Decimal,

    /// Term in months, if defined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<u32>,
}
