use crate::{
    activity::{ActivityRule, ChannelSelection, FallbackRanges, RuleSelector},
    catalog::Channel,
    distribution::{CountModel, DistributionParams},
    error::{SimError, SimResult},
    signal::{Shrinkage, SignalCleaningMode},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXTENDED_PERIOD_YEARS: u32 = 5;
pub const DEFAULT_MIN_CHURN_RUNWAY_DAYS: i64 = 360;
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 5;

pub fn default_observation_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

// ── Population ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub number_of_customers: usize,
    pub percent_left_censored: f64,
    pub percent_right_censored: f64,
    pub observation_period_years: u32,
    #[serde(default)]
    pub churn_probability: f64,
    /// Every contract spans the whole observation window.
    #[serde(default)]
    pub all_customers_full_lifetime: bool,
    #[serde(default = "default_observation_start")]
    pub observation_start: NaiveDate,
    #[serde(default = "default_extended_period_years")]
    pub extended_period_years: u32,
    /// Overlap with the observation window below this many days never churns.
    #[serde(default = "default_min_churn_runway_days")]
    pub min_churn_runway_days: i64,
}

fn default_extended_period_years() -> u32 {
    DEFAULT_EXTENDED_PERIOD_YEARS
}

fn default_min_churn_runway_days() -> i64 {
    DEFAULT_MIN_CHURN_RUNWAY_DAYS
}

impl PopulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.number_of_customers == 0 {
            return Err(SimError::config("number_of_customers", "must be > 0"));
        }
        let left = self.percent_left_censored;
        let right = self.percent_right_censored;
        if !(0.0..=1.0).contains(&left) {
            return Err(SimError::config("percent_left_censored", format!("must be in [0, 1], got {left}")));
        }
        if !(0.0..=1.0).contains(&right) {
            return Err(SimError::config("percent_right_censored", format!("must be in [0, 1], got {right}")));
        }
        if left + right > 1.0 {
            return Err(SimError::config(
                "percent_left_censored + percent_right_censored",
                format!("must not exceed 1, got {}", left + right),
            ));
        }
        if self.observation_period_years == 0 {
            return Err(SimError::config("observation_period_years", "must be > 0"));
        }
        if self.extended_period_years == 0 && left + right > 0.0 && !self.all_customers_full_lifetime {
            return Err(SimError::config(
                "extended_period_years",
                "must be > 0 when any customers are censored",
            ));
        }
        if !(0.0..=1.0).contains(&self.churn_probability) {
            return Err(SimError::config(
                "churn_probability",
                format!("must be in [0, 1], got {}", self.churn_probability),
            ));
        }
        if self.min_churn_runway_days < 0 {
            return Err(SimError::config(
                "min_churn_runway_days",
                format!("must be >= 0, got {}", self.min_churn_runway_days),
            ));
        }
        Ok(())
    }
}

// ── Activity ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Scanned in order; the first matching rule wins.
    pub rules: Vec<ActivityRule>,
    pub channels: ChannelSelection,
    #[serde(default)]
    pub count_model: CountModel,
    #[serde(default)]
    pub fallback: FallbackRanges,
    /// Mean and std_dev multiplier applied from the churn date onward.
    #[serde(default = "default_post_churn_mean_factor")]
    pub post_churn_mean_factor: f64,
}

fn default_post_churn_mean_factor() -> f64 {
    0.5
}

impl ActivityConfig {
    pub fn validate(&self) -> SimResult<()> {
        for rule in &self.rules {
            rule.params.validate()?;
            if self.count_model == CountModel::LogNormal
                && (rule.params.mean <= 0.0 || rule.params.std_dev <= 0.0)
            {
                return Err(SimError::config(
                    "rules",
                    format!("log-normal count model needs mean > 0 and std_dev > 0 in {rule:?}"),
                ));
            }
        }
        if let ChannelSelection::Fixed(channels) = &self.channels {
            if channels.is_empty() {
                return Err(SimError::config("channels", "fixed channel list must not be empty"));
            }
            if let Some(dup) = channels.iter().enumerate().find_map(|(i, c)| channels[..i].contains(c).then_some(c)) {
                return Err(SimError::config("channels", format!("{dup:?} listed more than once")));
            }
        }
        self.fallback.validate()?;
        let factor = self.post_churn_mean_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(SimError::config(
                "post_churn_mean_factor",
                format!("must be in (0, 1], got {factor}"),
            ));
        }
        Ok(())
    }
}

// ── Cleaning ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    pub mode: SignalCleaningMode,
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,
    #[serde(default)]
    pub shrinkage: Shrinkage,
}

fn default_moving_average_window() -> usize {
    DEFAULT_MOVING_AVERAGE_WINDOW
}

impl CleaningConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.moving_average_window == 0 {
            return Err(SimError::config("moving_average_window", "must be > 0"));
        }
        Ok(())
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            mode: SignalCleaningMode::None,
            moving_average_window: DEFAULT_MOVING_AVERAGE_WINDOW,
            shrinkage: Shrinkage::default(),
        }
    }
}

// ── Detector ───────────────────────────────────────────────────────

/// How the CUSUM alarm level is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Threshold {
    Absolute { value: f64 },
    /// `reference + k * std_dev`.
    Sigmas { std_dev: f64, k: f64 },
}

impl Threshold {
    pub fn resolve(&self, reference: f64) -> f64 {
        match *self {
            Threshold::Absolute { value } => value,
            Threshold::Sigmas { std_dev, k } => reference + k * std_dev,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// 0 = fully smoothed, 1 = raw cumulative sum.
    pub smoothing: f64,
    pub reference: f64,
    pub threshold: Threshold,
    #[serde(default)]
    pub ignore_zero_values: bool,
}

impl DetectorConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(SimError::config("smoothing", format!("must be in [0, 1], got {}", self.smoothing)));
        }
        if !self.reference.is_finite() {
            return Err(SimError::config("reference", "must be finite"));
        }
        let threshold = self.threshold.resolve(self.reference);
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SimError::config("threshold", format!("must resolve to a finite value >= 0, got {threshold}")));
        }
        Ok(())
    }

    pub fn resolved_threshold(&self) -> f64 {
        self.threshold.resolve(self.reference)
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub seed: u64,
    pub population: PopulationConfig,
    pub activity: ActivityConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    pub detector: DetectorConfig,
}

impl SimConfig {
    /// Load from a JSON file.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Every configuration check, run before any generation work.
    pub fn validate(&self) -> SimResult<()> {
        self.population.validate()?;
        self.activity.validate()?;
        self.cleaning.validate()?;
        self.detector.validate()?;
        Ok(())
    }

    /// Config with hardcoded defaults for use in tests: the controlled
    /// single-channel churn experiment at a small customer count.
    pub fn default_test() -> Self {
        Self {
            seed: 0x5EED_C0DE,
            population: PopulationConfig {
                number_of_customers: 200,
                percent_left_censored: 0.0,
                percent_right_censored: 0.0,
                observation_period_years: 10,
                churn_probability: 0.5,
                all_customers_full_lifetime: true,
                observation_start: default_observation_start(),
                extended_period_years: DEFAULT_EXTENDED_PERIOD_YEARS,
                min_churn_runway_days: DEFAULT_MIN_CHURN_RUNWAY_DAYS,
            },
            activity: ActivityConfig {
                rules: vec![ActivityRule {
                    selector: RuleSelector::Channel(Channel::Facebook),
                    params: DistributionParams { mean: 200.0, std_dev: 20.0, frequency: 0.8 },
                }],
                channels: ChannelSelection::Fixed(vec![Channel::Facebook]),
                count_model: CountModel::TruncatedNormal,
                fallback: FallbackRanges::default(),
                post_churn_mean_factor: default_post_churn_mean_factor(),
            },
            cleaning: CleaningConfig::default(),
            detector: DetectorConfig {
                smoothing: 0.16,
                reference: 200.0,
                threshold: Threshold::Sigmas { std_dev: 20.0, k: 5.0 },
                ignore_zero_values: true,
            },
        }
    }
}
