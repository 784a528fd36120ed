//! Merge of automatic candidates with the stored schedule
//!
//! # Algorithm
//!
//! 1. Drop every stored automatic line; keep manual lines as the base
//! 2. Give each candidate the id of a stored line with the same key, if any
//! 3. Insert candidates, then manual lines, into a key → line map; a manual
//!    line replaces a candidate holding its key
//! 4. Regenerate ids that are already taken, manual lines claiming first
//!
//! # Example
//!
//! ```text
//! Stored:      Trustee|upfront (manual, 20000)   Rating|annual (auto, 30000)
//! Candidates:  Trustee|upfront (auto, 15000)     Auditor|monthly (auto, 500)
//!
//! Result:      Trustee|upfront (manual, 20000)   Auditor|monthly (auto, 500)
//! ```

use crate::types::{CostLine, IdentityKey, LineId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of a reconciliation pass
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Final schedule, at most one line per identity key
    pub lines: Vec<CostLine>,

    /// Stored automatic lines dropped by this pass
    pub discarded_automatic: usize,

    /// Candidates that lost to a manual line on the same key
    pub overridden: usize,

    /// Ids regenerated to resolve collisions
    pub regenerated_ids: usize,
}

/// Reconcile stored lines with fresh automatic candidates.
///
/// Duplicate ids are not resolved in plain first-occurrence order: every
/// manual line keeps its id ahead of any automatic line that appears
/// earlier in the merge, and only the later holders get a fresh id.
pub fn reconcile(existing: Vec<CostLine>, candidates: Vec<CostLine>) -> Reconciled {
    // Ids of every stored line by key, first occurrence wins
    let mut stored_ids: HashMap<IdentityKey, LineId> = HashMap::new();
    for line in &existing {
        stored_ids.entry(line.identity_key()).or_insert(line.id);
    }

    let (manual, automatic): (Vec<CostLine>, Vec<CostLine>) =
        existing.into_iter().partition(CostLine::is_manual);
    let discarded_automatic = automatic.len();

    let mut merged: Vec<CostLine> = Vec::with_capacity(candidates.len() + manual.len());
    let mut slots: HashMap<IdentityKey, usize> = HashMap::new();
    let mut overridden = 0;

    for mut candidate in candidates {
        let key = candidate.identity_key();
        if let Some(id) = stored_ids.get(&key) {
            candidate.id = *id;
        }
        upsert(&mut merged, &mut slots, key, candidate);
    }

    for line in manual {
        let key = line.identity_key();
        if let Some(&idx) = slots.get(&key) {
            if !merged[idx].is_manual() {
                overridden += 1;
            }
        }
        upsert(&mut merged, &mut slots, key, line);
    }

    let regenerated_ids = dedupe_ids(&mut merged);

    debug!(
        "Reconciled {} lines ({} stale automatic dropped, {} overridden, {} ids regenerated)",
        merged.len(),
        discarded_automatic,
        overridden,
        regenerated_ids
    );

    Reconciled {
        lines: merged,
        discarded_automatic,
        overridden,
        regenerated_ids,
    }
}

/// Insert or replace in place, keeping first-insertion order
fn upsert(
    merged: &mut Vec<CostLine>,
    slots: &mut HashMap<IdentityKey, usize>,
    key: IdentityKey,
    line: CostLine,
) {
    match slots.get(&key) {
        Some(&idx) => merged[idx] = line,
        None => {
            slots.insert(key, merged.len());
            merged.push(line);
        }
    }
}

/// Give a fresh id to every line whose id is already taken.
///
/// Manual lines claim their ids before automatic ones so a user-entered
/// line keeps its identifier.
fn dedupe_ids(lines: &mut [CostLine]) -> usize {
    let mut taken: HashSet<LineId> = HashSet::with_capacity(lines.len());
    let mut regenerated = 0;

    let (manual_first, auto_after): (Vec<usize>, Vec<usize>) =
        (0..lines.len()).partition(|&i| lines[i].is_manual());

    for idx in manual_first.into_iter().chain(auto_after) {
        let line = &mut lines[idx];
        if !taken.insert(line.id) {
            let mut fresh = LineId::generate();
            while !taken.insert(fresh) {
                fresh = LineId::generate();
            }
            line.id = fresh;
            regenerated += 1;
        }
    }

    regenerated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Origin, Periodicity, PricingType};
    use rust_decimal::Decimal;

    fn manual(role: &str, periodicity: Periodicity, amount: i64) -> CostLine {
        let mut line = if periodicity.is_recurring() {
            CostLine::automatic_recurring(role, None, PricingType::Fixed, Decimal::from(amount), periodicity)
        } else {
            CostLine::automatic_upfront(role, None, PricingType::Fixed, Decimal::from(amount))
        };
        line.origin = Origin::Manual;
        line
    }

    fn auto_upfront(role: &str, amount: i64) -> CostLine {
        CostLine::automatic_upfront(role, None, PricingType::Fixed, Decimal::from(amount))
    }

    #[test]
    fn test_empty_existing_keeps_candidates() {
        let candidates = vec![auto_upfront("Trustee", 15000)];
        let result = reconcile(vec![], candidates.clone());

        assert_eq!(result.lines, candidates);
        assert_eq!(result.discarded_automatic, 0);
    }

    #[test]
    fn test_manual_wins_collision() {
        let stored = manual("Trustee", Periodicity::None, 20000);
        let result = reconcile(vec![stored.clone()], vec![auto_upfront("Trustee", 15000)]);

        assert_eq!(result.lines, vec![stored]);
        assert_eq!(result.overridden, 1);
    }

    #[test]
    fn test_stale_automatic_lines_are_dropped() {
        let stale = auto_upfront("Rating", 30000);
        let result = reconcile(vec![stale], vec![auto_upfront("Auditor", 500)]);

        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].role, "Auditor");
        assert_eq!(result.discarded_automatic, 1);
    }

    #[test]
    fn test_candidate_carries_stored_id() {
        let stored = auto_upfront("Trustee", 12000);
        let result = reconcile(vec![stored.clone()], vec![auto_upfront("Trustee", 15000)]);

        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].id, stored.id);
        assert_eq!(result.lines[0].upfront_price, Decimal::from(15000));
    }

    #[test]
    fn test_later_candidate_wins_same_key() {
        let result = reconcile(
            vec![],
            vec![auto_upfront("Trustee", 1), auto_upfront("Trustee", 2)],
        );

        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].upfront_price, Decimal::from(2));
    }

    #[test]
    fn test_colliding_ids_are_regenerated_manual_kept() {
        // Corrupt stored data: a manual and an automatic line share an id
        let manual_line = manual("Legal", Periodicity::None, 7000);
        let mut stale = auto_upfront("Trustee", 12000);
        stale.id = manual_line.id;

        let result = reconcile(
            vec![stale, manual_line.clone()],
            vec![auto_upfront("Trustee", 15000)],
        );

        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.regenerated_ids, 1);
        let legal = result.lines.iter().find(|l| l.role == "Legal").unwrap();
        let trustee = result.lines.iter().find(|l| l.role == "Trustee").unwrap();
        assert_eq!(legal.id, manual_line.id);
        assert_ne!(trustee.id, manual_line.id);
    }
}
