//! Aggregate totals over a cost schedule

use crate::types::{CostLine, Periodicity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Schedule totals, computed over gross amounts
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostScheduleTotals {
    /// Sum of one-time payments
    pub total_upfront: Decimal,

    /// Sum of monthly payments
    pub total_monthly: Decimal,

    /// Sum of annual payments
    pub total_annual: Decimal,

    /// Upfront + annual + 12 × monthly
    pub total_first_year: Decimal,

    /// Annual + 12 × monthly
    pub total_subsequent_years: Decimal,
}

impl CostScheduleTotals {
    /// Compute totals for a set of lines
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a CostLine>) -> Self {
        let mut total_upfront = Decimal::ZERO;
        let mut total_monthly = Decimal::ZERO;
        let mut total_annual = Decimal::ZERO;

        for line in lines {
            total_upfront += line.gross_upfront_amount;
            match line.periodicity {
                Periodicity::Monthly => total_monthly += line.gross_recurring_amount,
                Periodicity::Annual => total_annual += line.gross_recurring_amount,
                Periodicity::None => {}
            }
        }

        let recurring_per_year = total_annual + total_monthly * Decimal::from(12);

        Self {
            total_upfront,
            total_monthly,
            total_annual,
            total_first_year: total_upfront + recurring_per_year,
            total_subsequent_years: recurring_per_year,
        }
    }
}
