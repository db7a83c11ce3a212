//! Customer lifecycle generation with censoring and injected churn.
//!
//! The timeline for generation looks like this:
//!
//! ```text
//! |--extended period--|--observation period--|--extended period--|
//! ```
//!
//! Left-censored customers start inside the first extended period and end
//! inside the observation period. Right-censored customers start inside the
//! observation period and end inside the second extended period. Everyone
//! else starts and ends inside the observation period.

use crate::{
    catalog::{ChurnReason, Country, Industry, Plan},
    config::PopulationConfig,
    error::{SimError, SimResult},
    rng::{RngBank, SimRng, StageSlot},
    types::EntityId,
};
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Churn can only land between these fractions of the observable overlap.
pub const EARLIEST_POSSIBLE_CHURN: f64 = 0.2;
pub const LATEST_POSSIBLE_CHURN: f64 = 0.8;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnEvent {
    pub date:   NaiveDate,
    pub reason: ChurnReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id:    EntityId,
    pub name:           String,
    pub industry:       Industry,
    pub country:        Country,
    pub plan:           Plan,
    pub contract_start: NaiveDate,
    pub contract_end:   NaiveDate,
    pub churn:          Option<ChurnEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Censoring {
    Left,
    Right,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub start:          NaiveDate,
    pub end:            NaiveDate,
    pub extended_start: NaiveDate,
    pub extended_end:   NaiveDate,
}

impl ObservationWindow {
    pub fn new(start: NaiveDate, years: u32, extended_years: u32) -> SimResult<Self> {
        let out_of_range = || SimError::config("observation window", format!("{start} + {years}y overflows the calendar"));
        let months = years.checked_mul(12).ok_or_else(out_of_range)?;
        let end = start
            .checked_add_months(Months::new(months))
            .ok_or_else(out_of_range)?;
        let extended = Months::new(extended_years.checked_mul(12).ok_or_else(out_of_range)?);
        let extended_start = start.checked_sub_months(extended).ok_or_else(out_of_range)?;
        let extended_end = end.checked_add_months(extended).ok_or_else(out_of_range)?;
        Ok(Self { start, end, extended_start, extended_end })
    }

    pub fn from_config(config: &PopulationConfig) -> SimResult<Self> {
        Self::new(
            config.observation_start,
            config.observation_period_years,
            config.extended_period_years,
        )
    }

    /// The part of `[start, end]` inside the observation window, if any.
    pub fn overlap(&self, start: NaiveDate, end: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let from = start.max(self.start);
        let to = end.min(self.end);
        (from <= to).then_some((from, to))
    }
}

// ── Generator ────────────────────────────────────────────────────────────────

pub struct LifecycleGenerator<'a> {
    config: &'a PopulationConfig,
    window: ObservationWindow,
}

impl<'a> LifecycleGenerator<'a> {
    /// Validates the whole population config up front; no partial state.
    pub fn new(config: &'a PopulationConfig) -> SimResult<Self> {
        config.validate()?;
        let window = ObservationWindow::from_config(config)?;
        Ok(Self { config, window })
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    pub fn left_censored_count(&self) -> usize {
        (self.config.number_of_customers as f64 * self.config.percent_left_censored).floor() as usize
    }

    pub fn right_censored_count(&self) -> usize {
        (self.config.number_of_customers as f64 * self.config.percent_right_censored).floor() as usize
    }

    /// Left-censored prefix, right-censored suffix, uncensored middle.
    pub fn censoring_of(&self, index: usize) -> Censoring {
        let n = self.config.number_of_customers;
        if index < self.left_censored_count() {
            Censoring::Left
        } else if index >= n - self.right_censored_count() {
            Censoring::Right
        } else {
            Censoring::None
        }
    }

    pub fn generate(&self, bank: &RngBank) -> SimResult<Vec<Customer>> {
        let n = self.config.number_of_customers;
        let mut customers = Vec::with_capacity(n);
        let mut churned = 0usize;

        for i in 0..n {
            let mut rng = bank.for_entity(StageSlot::Lifecycle, i as u64);
            let (contract_start, contract_end) = self.draw_contract(i, &mut rng);

            let churn = if self.config.churn_probability > 0.0 {
                let mut churn_rng = bank.for_entity(StageSlot::Churn, i as u64);
                self.simulate_churn(contract_start, contract_end, &mut churn_rng)?
            } else {
                None
            };
            if churn.is_some() {
                churned += 1;
            }

            customers.push(Customer {
                customer_id: format!("c-{i:06}"),
                name: format!("Customer {i}"),
                industry: Industry::cycled(i),
                country: Country::cycled(i),
                plan: Plan::cycled(i),
                contract_start,
                contract_end,
                churn,
            });
        }

        log::info!(
            "lifecycle: generated {n} customers ({} left-censored, {} right-censored, {churned} churned)",
            if self.config.all_customers_full_lifetime { 0 } else { self.left_censored_count() },
            if self.config.all_customers_full_lifetime { 0 } else { self.right_censored_count() },
        );
        Ok(customers)
    }

    fn draw_contract(&self, index: usize, rng: &mut SimRng) -> (NaiveDate, NaiveDate) {
        let w = &self.window;
        if self.config.all_customers_full_lifetime {
            return (w.start, w.end);
        }

        let one_day = Duration::days(1);
        match self.censoring_of(index) {
            Censoring::Left => {
                let start = random_day(rng, w.extended_start, w.start - one_day);
                let end = random_day(rng, w.start, w.end);
                (start, end)
            }
            Censoring::Right => {
                let start = random_day(rng, w.start + one_day, w.end);
                let end = random_day(rng, w.end + one_day, w.extended_end + one_day);
                (start, end)
            }
            Censoring::None => {
                let start = random_day(rng, w.start + one_day, w.end);
                let end = random_day(rng, start, w.end);
                (start, end)
            }
        }
    }

    /// Bernoulli gate, then a churn date uniformly inside the middle 60% of
    /// the contract's overlap with the observation window. Overlaps shorter
    /// than the minimum runway never churn.
    pub fn simulate_churn(
        &self,
        contract_start: NaiveDate,
        contract_end: NaiveDate,
        rng: &mut SimRng,
    ) -> SimResult<Option<ChurnEvent>> {
        if contract_start > contract_end {
            return Err(SimError::InvalidContract { start: contract_start, end: contract_end });
        }
        if !rng.chance(self.config.churn_probability) {
            return Ok(None);
        }

        let Some((from, to)) = self.window.overlap(contract_start, contract_end) else {
            return Ok(None);
        };
        let duration = (to - from).num_days();
        if duration < self.config.min_churn_runway_days {
            return Ok(None);
        }

        let earliest = (EARLIEST_POSSIBLE_CHURN * duration as f64).floor() as i64;
        let latest = (LATEST_POSSIBLE_CHURN * duration as f64).floor() as i64;
        if earliest < 1 || latest <= earliest {
            return Ok(None);
        }

        let offset = rng.range_i64(earliest, latest);
        let reason = ChurnReason::ALL[rng.next_u64_below(ChurnReason::ALL.len() as u64) as usize];

        Ok(Some(ChurnEvent { date: from + Duration::days(offset), reason }))
    }
}

/// Uniform day in `[from, until)`; `from` when the range is empty.
fn random_day(rng: &mut SimRng, from: NaiveDate, until: NaiveDate) -> NaiveDate {
    let span = (until - from).num_days();
    from + Duration::days(rng.range_i64(0, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_bounds_follow_calendar_years() {
        let w = ObservationWindow::new(ymd(2020, 1, 1), 3, 5).unwrap();
        assert_eq!(w.end, ymd(2023, 1, 1));
        assert_eq!(w.extended_start, ymd(2015, 1, 1));
        assert_eq!(w.extended_end, ymd(2028, 1, 1));
    }

    #[test]
    fn overlap_clips_to_window() {
        let w = ObservationWindow::new(ymd(2020, 1, 1), 1, 5).unwrap();
        assert_eq!(
            w.overlap(ymd(2019, 6, 1), ymd(2020, 6, 1)),
            Some((ymd(2020, 1, 1), ymd(2020, 6, 1)))
        );
        assert_eq!(w.overlap(ymd(2015, 1, 1), ymd(2016, 1, 1)), None);
    }

    #[test]
    fn short_overlap_never_churns() {
        let mut config = SimConfig::default_test().population;
        config.churn_probability = 1.0;
        let generator = LifecycleGenerator::new(&config).unwrap();
        let mut rng = RngBank::new(3).for_stage(StageSlot::Churn);
        let start = ymd(2020, 3, 1);
        let churn = generator
            .simulate_churn(start, start + Duration::days(100), &mut rng)
            .unwrap();
        assert!(churn.is_none());
    }

    #[test]
    fn inverted_contract_is_rejected() {
        let config = SimConfig::default_test().population;
        let generator = LifecycleGenerator::new(&config).unwrap();
        let mut rng = RngBank::new(3).for_stage(StageSlot::Churn);
        let err = generator
            .simulate_churn(ymd(2021, 1, 1), ymd(2020, 1, 1), &mut rng)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidContract { .. }));
    }
}
