//! Issuance classification: lookup tables and label resolution
//!
//! Category, vehicle, backing type and offer type are stored on an issuance
//! as opaque identifiers. The pricing function expects human-readable
//! labels, so each identifier is resolved through its lookup table before
//! pricing. The category is the only mandatory field and must resolve to a
//! known [`CategoryCode`].

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Lookup table kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    /// Security category (CRI, CRA, ...)
    Category,
    /// Legal vehicle
    Vehicle,
    /// Backing type
    BackingType,
    /// Offer type
    OfferType,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Category => write!(f, "category"),
            LookupKind::Vehicle => write!(f, "vehicle"),
            LookupKind::BackingType => write!(f, "backing_type"),
            LookupKind::OfferType => write!(f, "offer_type"),
        }
    }
}

/// One row of a lookup table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    /// Opaque identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Short code, used for categories
    #[serde(default)]
    pub code: String,

    /// Whether the entry may be picked for new issuances
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl LookupEntry {
    /// Create an active entry
    pub fn new(id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: code.into(),
            active: true,
        }
    }
}

/// Identifier → entry table for one [`LookupKind`]
#[derive(Debug, Clone)]
pub struct LookupTable {
    kind: LookupKind,
    entries: HashMap<String, LookupEntry>,
}

impl LookupTable {
    /// Build a table from rows
    pub fn from_entries(kind: LookupKind, entries: Vec<LookupEntry>) -> Self {
        let entries = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self { kind, entries }
    }

    /// Table kind
    pub fn kind(&self) -> LookupKind {
        self.kind
    }

    /// Look up an entry by id, active or not
    pub fn get(&self, id: &str) -> Option<&LookupEntry> {
        self.entries.get(id)
    }

    /// Entries selectable for new issuances, sorted by name
    pub fn active_entries(&self) -> Vec<&LookupEntry> {
        let mut active: Vec<&LookupEntry> = self.entries.values().filter(|e| e.active).collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        active
    }
}

/// Source of lookup table rows
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Load every row of a table
    async fn load(&self, kind: LookupKind) -> Result<Vec<LookupEntry>>;
}

/// Fixed in-memory lookup tables
#[derive(Debug, Clone, Default)]
pub struct StaticLookups {
    tables: HashMap<LookupKind, Vec<LookupEntry>>,
}

impl StaticLookups {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rows to a table
    pub fn with_entries(mut self, kind: LookupKind, entries: Vec<LookupEntry>) -> Self {
        self.tables.entry(kind).or_default().extend(entries);
        self
    }
}

#[async_trait]
impl LookupSource for StaticLookups {
    async fn load(&self, kind: LookupKind) -> Result<Vec<LookupEntry>> {
        Ok(self.tables.get(&kind).cloned().unwrap_or_default())
    }
}

/// Security category codes understood by the pricing function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryCode {
    /// Certificado de Recebíveis Imobiliários
    Cri,
    /// Certificado de Recebíveis do Agronegócio
    Cra,
    /// Certificado de Recebíveis
    Cr,
    /// Debenture
    Deb,
    /// Receivables investment fund
    Fidc,
}

impl CategoryCode {
    /// Code as sent to the pricing function
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryCode::Cri => "CRI",
            CategoryCode::Cra => "CRA",
            CategoryCode::Cr => "CR",
            CategoryCode::Deb => "DEB",
            CategoryCode::Fidc => "FIDC",
        }
    }
}

impl FromStr for CategoryCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRI" => Ok(CategoryCode::Cri),
            "CRA" => Ok(CategoryCode::Cra),
            "CR" => Ok(CategoryCode::Cr),
            "DEB" => Ok(CategoryCode::Deb),
            "FIDC" => Ok(CategoryCode::Fidc),
            other => Err(Error::InvalidClassification(format!(
                "Unknown category code '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification identifiers as stored on an issuance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationIds {
    /// Category id
    #[serde(default)]
    pub category_id: Option<String>,

    /// Legal vehicle id
    #[serde(default)]
    pub vehicle_id: Option<String>,

    /// Backing type id
    #[serde(default)]
    pub backing_type_id: Option<String>,

    /// Offer type id
    #[serde(default)]
    pub offer_type_id: Option<String>,
}

impl ClassificationIds {
    /// Apply a partial change; fields absent from `change` keep their current value
    pub fn overlay(&self, change: &ClassificationIds) -> ClassificationIds {
        ClassificationIds {
            category_id: change.category_id.clone().or_else(|| self.category_id.clone()),
            vehicle_id: change.vehicle_id.clone().or_else(|| self.vehicle_id.clone()),
            backing_type_id: change
                .backing_type_id
                .clone()
                .or_else(|| self.backing_type_id.clone()),
            offer_type_id: change.offer_type_id.clone().or_else(|| self.offer_type_id.clone()),
        }
    }
}

/// Labels ready for the pricing function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClassification {
    /// Category code
    pub category: CategoryCode,
    /// Vehicle name, empty when unset
    pub vehicle: String,
    /// Backing type name, empty when unset
    pub backing_type: String,
    /// Offer type phrase, empty when unset
    pub offer_type: String,
}

/// Prefix `label` with `prefix` unless its first word already is the prefix.
///
/// The pricing function matches offer types on the full phrase
/// ("Oferta Privada Pura"), while the lookup table stores the short form.
pub fn normalize_offer_type(label: &str, prefix: &str) -> String {
    let label = label.trim();
    if label.is_empty() || prefix.is_empty() {
        return label.to_string();
    }

    let first_word = label.split_whitespace().next().unwrap_or_default();
    if first_word.eq_ignore_ascii_case(prefix) {
        label.to_string()
    } else {
        format!("{} {}", prefix, label)
    }
}

/// Resolves classification ids to pricing labels
#[derive(Debug, Clone)]
pub struct ClassificationResolver {
    offer_type_prefix: String,
}

impl ClassificationResolver {
    /// Create resolver
    pub fn new(offer_type_prefix: impl Into<String>) -> Self {
        Self {
            offer_type_prefix: offer_type_prefix.into(),
        }
    }

    /// Resolve all four fields; fails only on the category
    pub async fn resolve(
        &self,
        source: &dyn LookupSource,
        ids: &ClassificationIds,
    ) -> Result<ResolvedClassification> {
        let category_id = ids.category_id.as_deref().ok_or_else(|| {
            Error::InvalidClassification("Issuance has no category".to_string())
        })?;

        let categories = LookupTable::from_entries(
            LookupKind::Category,
            source.load(LookupKind::Category).await?,
        );
        let entry = categories.get(category_id).ok_or_else(|| {
            Error::InvalidClassification(format!("Category '{}' not found", category_id))
        })?;
        let category = CategoryCode::from_str(&entry.code)?;

        let vehicle = Self::label(source, LookupKind::Vehicle, ids.vehicle_id.as_deref()).await?;
        let backing_type =
            Self::label(source, LookupKind::BackingType, ids.backing_type_id.as_deref()).await?;
        let offer_type =
            Self::label(source, LookupKind::OfferType, ids.offer_type_id.as_deref()).await?;
        let offer_type = normalize_offer_type(&offer_type, &self.offer_type_prefix);

        debug!(
            "Resolved classification: {} / {} / {} / {}",
            category, vehicle, backing_type, offer_type
        );

        Ok(ResolvedClassification {
            category,
            vehicle,
            backing_type,
            offer_type,
        })
    }

    async fn label(source: &dyn LookupSource, kind: LookupKind, id: Option<&str>) -> Result<String> {
        let Some(id) = id else {
            return Ok(String::new());
        };

        let table = LookupTable::from_entries(kind, source.load(kind).await?);
        match table.get(id) {
            Some(entry) => Ok(entry.name.clone()),
            None => {
                warn!("No {} entry for id {}, pricing without it", kind, id);
                Ok(String::new())
            }
        }
    }
}
