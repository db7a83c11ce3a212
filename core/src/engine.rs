//! The churn evaluation harness.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Lifecycle generation      (customers, censoring, ground-truth churn)
//!   2. Activity generation       (weekly counts per customer and channel)
//!   3. Weekly aggregation        (one total per ISO week, ascending)
//!   4. Signal cleaning
//!   5. CUSUM detection
//!   6. Classification against ground truth
//!
//! RULES:
//!   - All randomness flows through the RngBank; stages 3-6 draw nothing.
//!   - A customer whose evaluation fails is recorded as a failure, never
//!     counted as "no churn detected".

use crate::{
    activity::{ActivitySignalGenerator, WeeklyActivityPoint},
    catalog::ChurnReason,
    config::SimConfig,
    cusum::CusumDetector,
    error::{SimError, SimResult},
    lifecycle::{ChurnEvent, Customer, LifecycleGenerator},
    rng::RngBank,
    signal::SignalCleaner,
    types::{EntityId, IsoWeekKey, RunId},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfusionStatus {
    TruePositive,
    FalsePositive,
    TrueNegative,
    FalseNegative,
}

impl ConfusionStatus {
    pub const ALL: [ConfusionStatus; 4] = [
        Self::TruePositive,
        Self::FalsePositive,
        Self::TrueNegative,
        Self::FalseNegative,
    ];

    pub fn classify(actual: bool, detected: bool) -> Self {
        match (actual, detected) {
            (true, true) => Self::TruePositive,
            (false, true) => Self::FalsePositive,
            (true, false) => Self::FalseNegative,
            (false, false) => Self::TrueNegative,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TruePositive => "true_positive",
            Self::FalsePositive => "false_positive",
            Self::TrueNegative => "true_negative",
            Self::FalseNegative => "false_negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnDetectionResult {
    pub customer_id: EntityId,
    pub actual_churn: Option<ChurnEvent>,
    pub detected_churn: Option<ChurnEvent>,
    /// Detected minus actual, whole weeks. Only set for true positives.
    pub error_weeks: Option<i64>,
    pub status: ConfusionStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn record(&mut self, status: ConfusionStatus) {
        *self.slot(status) += 1;
    }

    pub fn count(&self, status: ConfusionStatus) -> usize {
        match status {
            ConfusionStatus::TruePositive => self.true_positive,
            ConfusionStatus::FalsePositive => self.false_positive,
            ConfusionStatus::TrueNegative => self.true_negative,
            ConfusionStatus::FalseNegative => self.false_negative,
        }
    }

    /// Share of evaluated customers with this label; 0 when nothing was evaluated.
    pub fn rate(&self, status: ConfusionStatus) -> f64 {
        match self.evaluated() {
            0 => 0.0,
            n => self.count(status) as f64 / n as f64,
        }
    }

    pub fn evaluated(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    fn slot(&mut self, status: ConfusionStatus) -> &mut usize {
        match status {
            ConfusionStatus::TruePositive => &mut self.true_positive,
            ConfusionStatus::FalsePositive => &mut self.false_positive,
            ConfusionStatus::TrueNegative => &mut self.true_negative,
            ConfusionStatus::FalseNegative => &mut self.false_negative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerFailure {
    pub customer_id: EntityId,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub results: Vec<ChurnDetectionResult>,
    pub counts: ConfusionCounts,
    pub failures: Vec<CustomerFailure>,
    /// Mean of |error_weeks| over true positives.
    pub mean_abs_error_weeks: Option<f64>,
}

/// Everything one run produced, ground truth included.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub customers: Vec<Customer>,
    pub activity: Vec<WeeklyActivityPoint>,
    pub summary: RunSummary,
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub struct ChurnEvaluationHarness {
    pub run_id: RunId,
    config: SimConfig,
    rng_bank: RngBank,
}

impl ChurnEvaluationHarness {
    pub fn new(config: SimConfig) -> SimResult<Self> {
        Self::with_run_id(uuid::Uuid::new_v4().to_string(), config)
    }

    pub fn with_run_id(run_id: RunId, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            run_id,
            rng_bank: RngBank::new(config.seed),
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Generate customers and activity, then evaluate them.
    pub fn run(&self) -> SimResult<SimulationRun> {
        log::info!("run {}: seed {}", self.run_id, self.rng_bank.seed());
        let customers = LifecycleGenerator::new(&self.config.population)?.generate(&self.rng_bank)?;
        let activity = ActivitySignalGenerator::new(&self.config.activity).generate(&customers, &self.rng_bank)?;
        let summary = self.evaluate(&customers, &activity)?;
        Ok(SimulationRun { customers, activity, summary })
    }

    /// Score the detector against externally supplied tables.
    pub fn evaluate(&self, customers: &[Customer], points: &[WeeklyActivityPoint]) -> SimResult<RunSummary> {
        let cleaner = SignalCleaner::from_config(&self.config.cleaning);
        let detector = CusumDetector::from_config(&self.config.detector)?;
        let weekly = weekly_totals(points);

        let mut results = Vec::with_capacity(customers.len());
        let mut failures = Vec::new();
        let mut counts = ConfusionCounts::default();

        for customer in customers {
            let weeks = weekly.get(customer.customer_id.as_str());
            match evaluate_customer(customer, weeks, &cleaner, &detector) {
                Ok(result) => {
                    counts.record(result.status);
                    results.push(result);
                }
                Err(e) => {
                    log::warn!("evaluation: {} skipped: {e}", customer.customer_id);
                    failures.push(CustomerFailure {
                        customer_id: customer.customer_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let errors: Vec<i64> = results.iter().filter_map(|r| r.error_weeks).collect();
        let mean_abs_error_weeks = (!errors.is_empty())
            .then(|| errors.iter().map(|e| e.abs() as f64).sum::<f64>() / errors.len() as f64);

        log::info!(
            "evaluation: {} evaluated, {} failed; TP={} FP={} TN={} FN={}",
            counts.evaluated(),
            failures.len(),
            counts.true_positive,
            counts.false_positive,
            counts.true_negative,
            counts.false_negative,
        );

        Ok(RunSummary {
            run_id: self.run_id.clone(),
            results,
            counts,
            failures,
            mean_abs_error_weeks,
        })
    }
}

/// Total count per ISO week for every customer, weeks ascending.
pub fn weekly_totals(points: &[WeeklyActivityPoint]) -> HashMap<&str, BTreeMap<IsoWeekKey, f64>> {
    let mut weekly: HashMap<&str, BTreeMap<IsoWeekKey, f64>> = HashMap::new();
    for point in points {
        *weekly
            .entry(point.customer_id.as_str())
            .or_default()
            .entry(point.week())
            .or_insert(0.0) += point.post_count as f64;
    }
    weekly
}

fn evaluate_customer(
    customer: &Customer,
    weeks: Option<&BTreeMap<IsoWeekKey, f64>>,
    cleaner: &SignalCleaner,
    detector: &CusumDetector,
) -> SimResult<ChurnDetectionResult> {
    let weeks = weeks
        .filter(|w| !w.is_empty())
        .ok_or_else(|| SimError::EmptySignal { context: format!("weekly activity of {}", customer.customer_id) })?;

    let keys: Vec<IsoWeekKey> = weeks.keys().copied().collect();
    let signal: Vec<f64> = weeks.values().copied().collect();
    let cleaned = cleaner.clean(&signal)?;
    let cusum = detector.detect(&cleaned);

    let detected_churn = match cusum.anomaly_index {
        Some(index) => {
            let key = keys[index];
            let date = key.monday().ok_or_else(|| {
                SimError::Other(anyhow::anyhow!("ISO week {}-W{:02} has no Monday", key.year, key.week))
            })?;
            Some(ChurnEvent { date, reason: ChurnReason::ActivityDrop })
        }
        None => None,
    };

    let actual_churn = customer.churn;
    let status = ConfusionStatus::classify(actual_churn.is_some(), detected_churn.is_some());
    let error_weeks = match (actual_churn, detected_churn) {
        (Some(actual), Some(detected)) => Some((detected.date - actual.date).num_weeks()),
        _ => None,
    };

    log::debug!(
        "evaluation: {} {} (anomaly index {:?})",
        customer.customer_id,
        status.as_str(),
        cusum.anomaly_index
    );

    Ok(ChurnDetectionResult {
        customer_id: customer.customer_id.clone(),
        actual_churn,
        detected_churn,
        error_weeks,
        status,
    })
}
