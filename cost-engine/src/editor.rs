//! Manual editing of a cost schedule
//!
//! Edits go to a per-line draft and only reach the committed schedule on
//! [`ScheduleEditor::save`]; [`ScheduleEditor::cancel`] throws the draft
//! away. Every saved line becomes `manual`, so recalculation will never
//! replace it.

use crate::totals::CostScheduleTotals;
use crate::types::{CostLine, LineId, Origin, Periodicity, PricingType, ProviderId};
use crate::{Error, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Schedule section a line is edited in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// One-time fees
    Upfront,
    /// Yearly fees
    Annual,
    /// Monthly fees
    Monthly,
}

impl Section {
    /// Periodicity of lines in this section
    pub fn periodicity(&self) -> Periodicity {
        match self {
            Section::Upfront => Periodicity::None,
            Section::Annual => Periodicity::Annual,
            Section::Monthly => Periodicity::Monthly,
        }
    }

    /// Section a line belongs to
    pub fn of(line: &CostLine) -> Self {
        match line.periodicity {
            Periodicity::None => Section::Upfront,
            Periodicity::Annual => Section::Annual,
            Periodicity::Monthly => Section::Monthly,
        }
    }
}

#[derive(Debug, Clone)]
struct Draft {
    line: CostLine,
    is_new: bool,
}

/// Committed schedule plus pending drafts
#[derive(Debug, Clone, Default)]
pub struct ScheduleEditor {
    lines: Vec<CostLine>,
    drafts: HashMap<LineId, Draft>,
}

impl ScheduleEditor {
    /// Start editing a stored schedule
    pub fn new(lines: Vec<CostLine>) -> Self {
        Self {
            lines,
            drafts: HashMap::new(),
        }
    }

    /// Open a draft for a new line; it is dropped if cancelled before saving
    pub fn add_line(&mut self, section: Section, role: impl Into<String>) -> LineId {
        let line = CostLine {
            id: LineId::generate(),
            role: role.into(),
            provider_id: None,
            origin: Origin::Manual,
            pricing_type: PricingType::Fixed,
            upfront_price: Decimal::ZERO,
            recurring_price: Decimal::ZERO,
            periodicity: section.periodicity(),
            gross_up: Decimal::ZERO,
            gross_upfront_amount: Decimal::ZERO,
            gross_recurring_amount: Decimal::ZERO,
        };
        let id = line.id;
        self.drafts.insert(id, Draft { line, is_new: true });
        id
    }

    /// Open a draft for a committed line
    pub fn begin_edit(&mut self, id: LineId) -> Result<()> {
        if self.drafts.contains_key(&id) {
            return Ok(());
        }
        let line = self.committed(id)?.clone();
        self.drafts.insert(id, Draft { line, is_new: false });
        Ok(())
    }

    /// Change the role of a draft
    pub fn set_role(&mut self, id: LineId, role: impl Into<String>) -> Result<()> {
        self.draft_mut(id)?.role = role.into();
        Ok(())
    }

    /// Change the provider of a draft
    pub fn set_provider(&mut self, id: LineId, provider_id: Option<ProviderId>) -> Result<()> {
        self.draft_mut(id)?.provider_id = provider_id;
        Ok(())
    }

    /// Set the net amount of a draft, in its section's price field
    pub fn set_amount(&mut self, id: LineId, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(Error::InvalidInput(format!("Negative amount {}", amount)));
        }
        let line = self.draft_mut(id)?;
        let mut updated = line.clone();
        if updated.periodicity.is_recurring() {
            updated.recurring_price = amount;
        } else {
            updated.upfront_price = amount;
        }
        updated.recompute_gross()?;
        *line = updated;
        Ok(())
    }

    /// Set the gross-up percentage of a draft
    pub fn set_gross_up(&mut self, id: LineId, percent: Decimal) -> Result<()> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(Error::InvalidInput(format!(
                "Gross-up {} outside 0-100",
                percent
            )));
        }
        let line = self.draft_mut(id)?;
        let mut updated = line.clone();
        updated.gross_up = percent;
        updated.recompute_gross()?;
        *line = updated;
        Ok(())
    }

    /// Current draft of a line, if one is open
    pub fn draft(&self, id: LineId) -> Option<&CostLine> {
        self.drafts.get(&id).map(|d| &d.line)
    }

    /// Commit a draft as a manual line
    pub fn save(&mut self, id: LineId) -> Result<&CostLine> {
        let draft = self
            .drafts
            .get(&id)
            .ok_or_else(|| Error::InvalidInput(format!("No open draft for line {}", id)))?;

        if draft.line.role.trim().is_empty() {
            return Err(Error::InvalidInput("Role must not be empty".to_string()));
        }

        let key = draft.line.identity_key();
        if let Some(other) = self.lines.iter().find(|l| l.id != id && l.identity_key() == key) {
            return Err(Error::InvalidInput(format!(
                "Slot {} is already taken by line {}",
                key, other.id
            )));
        }

        let mut line = draft.line.clone();
        let is_new = draft.is_new;
        line.origin = Origin::Manual;
        line.recompute_gross()?;
        self.drafts.remove(&id);

        let idx = if is_new {
            self.lines.push(line);
            self.lines.len() - 1
        } else {
            let idx = self.position(id)?;
            self.lines[idx] = line;
            idx
        };
        Ok(&self.lines[idx])
    }

    /// Discard a draft
    pub fn cancel(&mut self, id: LineId) -> Result<()> {
        self.drafts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidInput(format!("No open draft for line {}", id)))
    }

    /// Remove a committed line
    pub fn remove(&mut self, id: LineId) -> Result<CostLine> {
        let idx = self.position(id)?;
        self.drafts.remove(&id);
        Ok(self.lines.remove(idx))
    }

    /// Committed lines
    pub fn lines(&self) -> &[CostLine] {
        &self.lines
    }

    /// Committed lines of one section
    pub fn section(&self, section: Section) -> Vec<&CostLine> {
        self.lines.iter().filter(|l| Section::of(l) == section).collect()
    }

    /// Totals over committed lines
    pub fn totals(&self) -> CostScheduleTotals {
        CostScheduleTotals::from_lines(&self.lines)
    }

    /// Whether any draft is open
    pub fn has_open_drafts(&self) -> bool {
        !self.drafts.is_empty()
    }

    /// Committed lines, discarding open drafts
    pub fn into_lines(self) -> Vec<CostLine> {
        self.lines
    }

    fn committed(&self, id: LineId) -> Result<&CostLine> {
        self.lines
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown line {}", id)))
    }

    fn position(&self, id: LineId) -> Result<usize> {
        self.lines
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown line {}", id)))
    }

    fn draft_mut(&mut self, id: LineId) -> Result<&mut CostLine> {
        self.drafts
            .get_mut(&id)
            .map(|d| &mut d.line)
            .ok_or_else(|| Error::InvalidInput(format!("No open draft for line {}", id)))
    }
}
