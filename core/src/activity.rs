//! Weekly activity signal generation.
//!
//! For every customer, for every Monday of the contract, for every channel
//! the customer is active on, one count is drawn from a compound
//! distribution whose parameters come from the first matching rule.
//!
//! Depends on: lifecycle (customer set).

use crate::{
    catalog::{Channel, Country, Industry, Plan},
    config::ActivityConfig,
    distribution::{CompoundCountDistribution, DistributionParams},
    error::{SimError, SimResult},
    lifecycle::Customer,
    rng::{RngBank, SimRng, StageSlot},
    types::{mondays_between, EntityId, IsoWeekKey},
};
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

/// The attribute a rule keys on, together with the value it must equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSelector {
    Channel(Channel),
    Industry(Industry),
    Country(Country),
    Plan(Plan),
}

impl RuleSelector {
    pub fn matches(&self, customer: &Customer, channel: Channel) -> bool {
        match *self {
            RuleSelector::Channel(c) => c == channel,
            RuleSelector::Industry(i) => i == customer.industry,
            RuleSelector::Country(c) => c == customer.country,
            RuleSelector::Plan(p) => p == customer.plan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityRule {
    pub selector: RuleSelector,
    pub params: DistributionParams,
}

/// Which channels a customer posts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelection {
    Fixed(Vec<Channel>),
    /// Each channel kept independently with its popularity; never empty.
    PopularityWeighted,
}

/// Ranges used to synthesize parameters when no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackRanges {
    pub mean_min: f64,
    pub mean_max: f64,
    pub std_dev_ratio: f64,
    pub min_std_dev: f64,
    pub min_frequency: f64,
}

impl Default for FallbackRanges {
    fn default() -> Self {
        Self {
            mean_min: 1.0,
            mean_max: 20.0,
            std_dev_ratio: 0.3,
            min_std_dev: 0.5,
            min_frequency: 0.1,
        }
    }
}

impl FallbackRanges {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.mean_min > 0.0 && self.mean_min <= self.mean_max && self.mean_max.is_finite()) {
            return Err(SimError::config(
                "fallback.mean_min/mean_max",
                format!("need 0 < mean_min <= mean_max, got [{}, {}]", self.mean_min, self.mean_max),
            ));
        }
        if !(self.std_dev_ratio >= 0.0 && self.min_std_dev > 0.0) {
            return Err(SimError::config("fallback.std_dev", "ratio must be >= 0 and floor > 0"));
        }
        if !(self.min_frequency > 0.0 && self.min_frequency <= 1.0) {
            return Err(SimError::config("fallback.min_frequency", "must be in (0, 1]"));
        }
        Ok(())
    }

    /// Mean uniform in range; std_dev and frequency proportional to it,
    /// floored so neither collapses to zero.
    pub fn sample(&self, rng: &mut SimRng) -> DistributionParams {
        let mean = rng.range_f64(self.mean_min, self.mean_max);
        DistributionParams {
            mean,
            std_dev: (mean * self.std_dev_ratio).max(self.min_std_dev),
            frequency: (mean / self.mean_max).clamp(self.min_frequency, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyActivityPoint {
    pub customer_id: EntityId,
    pub channel:     Channel,
    pub iso_year:    i32,
    pub iso_week:    u32,
    pub post_count:  u32,
}

impl WeeklyActivityPoint {
    pub fn week(&self) -> IsoWeekKey {
        IsoWeekKey { year: self.iso_year, week: self.iso_week }
    }
}

// ── Generator ────────────────────────────────────────────────────────────────

pub struct ActivitySignalGenerator<'a> {
    config: &'a ActivityConfig,
}

impl<'a> ActivitySignalGenerator<'a> {
    pub fn new(config: &'a ActivityConfig) -> Self {
        Self { config }
    }

    /// First rule in list order whose selector matches; later rules never
    /// override an earlier match, however specific.
    pub fn find_rule(&self, customer: &Customer, channel: Channel) -> Option<&ActivityRule> {
        self.config
            .rules
            .iter()
            .find(|rule| rule.selector.matches(customer, channel))
    }

    pub fn select_channels(&self, rng: &mut SimRng) -> Vec<Channel> {
        match &self.config.channels {
            ChannelSelection::Fixed(channels) => channels.clone(),
            ChannelSelection::PopularityWeighted => {
                let picked: Vec<Channel> = Channel::ALL
                    .iter()
                    .copied()
                    .filter(|c| rng.chance(c.popularity()))
                    .collect();
                if picked.is_empty() {
                    vec![Channel::most_popular()]
                } else {
                    picked
                }
            }
        }
    }

    pub fn generate(&self, customers: &[Customer], bank: &RngBank) -> SimResult<Vec<WeeklyActivityPoint>> {
        self.config.validate()?;

        let mut points = Vec::new();
        for (index, customer) in customers.iter().enumerate() {
            let mut channel_rng = bank.for_entity(StageSlot::ChannelSelection, index as u64);
            let mut rng = bank.for_entity(StageSlot::Activity, index as u64);
            let channels = self.select_channels(&mut channel_rng);
            self.generate_customer(customer, &channels, &mut rng, &mut points)?;
        }

        log::info!(
            "activity: {} points for {} customers",
            points.len(),
            customers.len()
        );
        Ok(points)
    }

    fn generate_customer(
        &self,
        customer: &Customer,
        channels: &[Channel],
        rng: &mut SimRng,
        out: &mut Vec<WeeklyActivityPoint>,
    ) -> SimResult<()> {
        let model = self.config.count_model;

        for &channel in channels {
            let params = match self.find_rule(customer, channel) {
                Some(rule) => rule.params,
                None => self.config.fallback.sample(rng),
            };
            let active = CompoundCountDistribution::new(params, model)?;
            let churned = CompoundCountDistribution::new(
                params.scaled(self.config.post_churn_mean_factor),
                model,
            )?;
            let churn_date = customer.churn.as_ref().map(|c| c.date);

            for monday in mondays_between(customer.contract_start, customer.contract_end) {
                let dist = match churn_date {
                    Some(date) if monday >= date => &churned,
                    _ => &active,
                };
                let week = IsoWeekKey::of(monday);
                out.push(WeeklyActivityPoint {
                    customer_id: customer.customer_id.clone(),
                    channel,
                    iso_year: week.year,
                    iso_week: week.week,
                    post_count: dist.sample(rng),
                });
            }
        }

        log::debug!(
            "activity: {} on {} channel(s)",
            customer.customer_id,
            channels.len()
        );
        Ok(())
    }
}
