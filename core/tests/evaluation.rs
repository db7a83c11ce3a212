//! End-to-end evaluation: generation, cleaning, detection and scoring.

use chrono::NaiveDate;
use churnsim_core::{
    activity::WeeklyActivityPoint,
    catalog::{Channel, ChurnReason, Country, Industry, Plan},
    config::{SimConfig, Threshold},
    engine::{ChurnEvaluationHarness, ConfusionStatus},
    lifecycle::{ChurnEvent, Customer},
    signal::SignalCleaningMode,
    types::{mondays_between, IsoWeekKey},
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn customer(id: &str, start: NaiveDate, end: NaiveDate, churn: Option<NaiveDate>) -> Customer {
    Customer {
        customer_id: id.to_string(),
        name: id.to_string(),
        industry: Industry::Retail,
        country: Country::France,
        plan: Plan::Basic,
        contract_start: start,
        contract_end: end,
        churn: churn.map(|date| ChurnEvent { date, reason: ChurnReason::ActivityDrop }),
    }
}

/// One Facebook point per Monday, `before` until `drop_on`, `after` from then on.
fn weekly_points(c: &Customer, before: u32, after: u32, drop_on: Option<NaiveDate>) -> Vec<WeeklyActivityPoint> {
    mondays_between(c.contract_start, c.contract_end)
        .map(|monday| {
            let week = IsoWeekKey::of(monday);
            let dropped = drop_on.is_some_and(|d| monday >= d);
            WeeklyActivityPoint {
                customer_id: c.customer_id.clone(),
                channel: Channel::Facebook,
                iso_year: week.year,
                iso_week: week.week,
                post_count: if dropped { after } else { before },
            }
        })
        .collect()
}

#[test]
fn true_positives_far_outnumber_false_positives() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut config = SimConfig::default_test();
    config.population.number_of_customers = 10_000;
    let harness = ChurnEvaluationHarness::new(config).unwrap();
    let run = harness.run().unwrap();
    let summary = &run.summary;
    let counts = summary.counts;

    assert!(summary.failures.is_empty(), "failures: {:?}", &summary.failures[..summary.failures.len().min(3)]);
    assert_eq!(counts.evaluated(), 10_000);

    let tp = counts.rate(ConfusionStatus::TruePositive);
    let fp = counts.rate(ConfusionStatus::FalsePositive);
    assert!(tp > 0.4, "true-positive rate {tp}");
    assert!(tp > 10.0 * fp, "tp={tp} fp={fp}");

    let error = summary.mean_abs_error_weeks.unwrap();
    assert!(error < 52.0, "mean detection error {error} weeks");
}

#[test]
fn detections_follow_the_actual_churn() {
    let harness = ChurnEvaluationHarness::new(SimConfig::default_test()).unwrap();
    let run = harness.run().unwrap();
    for r in &run.summary.results {
        if r.status == ConfusionStatus::TruePositive {
            let weeks = r.error_weeks.unwrap();
            assert!(weeks >= 0, "{} detected {weeks} weeks before churn", r.customer_id);
            assert_eq!(r.detected_churn.unwrap().reason, ChurnReason::ActivityDrop);
        } else {
            assert!(r.error_weeks.is_none());
        }
    }
}

#[test]
fn interpolating_cleaning_modes_keep_detection_useful() {
    for mode in [
        SignalCleaningMode::None,
        SignalCleaningMode::InterpolateZeroes,
        SignalCleaningMode::InterpolatedMovingAverage,
        SignalCleaningMode::InterpolatedWaveletDenoise,
    ] {
        let mut config = SimConfig::default_test();
        config.population.number_of_customers = 300;
        config.cleaning.mode = mode;
        let run = ChurnEvaluationHarness::new(config).unwrap().run().unwrap();
        let counts = run.summary.counts;
        assert_eq!(counts.evaluated(), 300, "{mode:?}");
        assert!(
            counts.true_positive > 5 * counts.false_positive.max(1),
            "{mode:?}: {counts:?}"
        );
    }
}

#[test]
fn evaluate_scores_supplied_tables() {
    let start = ymd(2020, 1, 6);
    let end = ymd(2023, 12, 25);
    let churn_date = ymd(2022, 1, 3);

    let churned = customer("churned", start, end, Some(churn_date));
    let steady = customer("steady", start, end, None);
    let silent = customer("silent", start, end, None);

    let mut points = weekly_points(&churned, 200, 100, Some(churn_date));
    points.extend(weekly_points(&steady, 200, 200, None));

    let mut config = SimConfig::default_test();
    config.detector.threshold = Threshold::Absolute { value: 300.0 };
    let harness = ChurnEvaluationHarness::with_run_id("supplied".into(), config).unwrap();
    let summary = harness.evaluate(&[churned, steady, silent], &points).unwrap();

    assert_eq!(summary.run_id, "supplied");
    assert_eq!(summary.counts.true_positive, 1);
    assert_eq!(summary.counts.true_negative, 1);
    assert_eq!(summary.counts.evaluated(), 2);

    // No activity at all is a failure, not a negative.
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].customer_id, "silent");

    let tp = &summary.results[0];
    assert_eq!(tp.status, ConfusionStatus::TruePositive);
    // 19 weeks of -16 drift cross 300; the alarm lands on the 19th Monday.
    assert_eq!(tp.detected_churn.unwrap().date, ymd(2022, 5, 9));
    assert_eq!(tp.error_weeks, Some(18));
    assert_eq!(summary.mean_abs_error_weeks, Some(18.0));
}

#[test]
fn false_positive_when_activity_drops_without_churn() {
    let start = ymd(2021, 1, 4);
    let end = ymd(2022, 12, 26);
    let quiet = customer("quiet", start, end, None);
    let points = weekly_points(&quiet, 200, 50, Some(ymd(2022, 1, 3)));

    let harness = ChurnEvaluationHarness::new(SimConfig::default_test()).unwrap();
    let summary = harness.evaluate(&[quiet], &points).unwrap();
    assert_eq!(summary.counts.false_positive, 1);
    assert!(summary.results[0].detected_churn.is_some());
    assert_eq!(summary.mean_abs_error_weeks, None);
}

#[test]
fn false_negative_when_churn_leaves_no_trace() {
    let start = ymd(2021, 1, 4);
    let end = ymd(2022, 12, 26);
    let hidden = customer("hidden", start, end, Some(ymd(2022, 1, 3)));
    let points = weekly_points(&hidden, 200, 200, None);

    let harness = ChurnEvaluationHarness::new(SimConfig::default_test()).unwrap();
    let summary = harness.evaluate(&[hidden], &points).unwrap();
    assert_eq!(summary.counts.false_negative, 1);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = SimConfig::default_test();
    config.population.churn_probability = 2.0;
    assert!(ChurnEvaluationHarness::new(config).is_err());
}
