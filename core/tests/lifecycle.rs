//! Lifecycle generation: censoring partitions, bounds and injected churn.

use chrono::NaiveDate;
use churnsim_core::{
    catalog::{Country, Industry, Plan},
    config::{PopulationConfig, SimConfig},
    error::SimError,
    lifecycle::{Censoring, LifecycleGenerator},
    rng::RngBank,
};

fn censored_population(n: usize, left: f64, right: f64) -> PopulationConfig {
    let mut config = SimConfig::default_test().population;
    config.number_of_customers = n;
    config.percent_left_censored = left;
    config.percent_right_censored = right;
    config.observation_period_years = 5;
    config.all_customers_full_lifetime = false;
    config.churn_probability = 0.5;
    config
}

#[test]
fn censoring_counts_are_exact() {
    let config = censored_population(1_000, 0.2, 0.3);
    let generator = LifecycleGenerator::new(&config).unwrap();
    let window = *generator.window();
    let customers = generator.generate(&RngBank::new(42)).unwrap();

    assert_eq!(customers.len(), 1_000);
    let left = customers.iter().filter(|c| c.contract_start < window.start).count();
    let right = customers.iter().filter(|c| c.contract_end > window.end).count();
    assert_eq!(left, 200, "left-censored count");
    assert_eq!(right, 300, "right-censored count");
}

#[test]
fn censoring_partition_is_prefix_and_suffix() {
    let config = censored_population(10, 0.25, 0.25);
    let generator = LifecycleGenerator::new(&config).unwrap();
    let labels: Vec<Censoring> = (0..10).map(|i| generator.censoring_of(i)).collect();
    assert_eq!(&labels[..2], &[Censoring::Left, Censoring::Left]);
    assert!(labels[2..8].iter().all(|&c| c == Censoring::None), "{labels:?}");
    assert_eq!(&labels[8..], &[Censoring::Right, Censoring::Right]);
}

#[test]
fn contracts_stay_inside_extended_window() {
    let config = censored_population(2_000, 0.3, 0.3);
    let generator = LifecycleGenerator::new(&config).unwrap();
    let window = *generator.window();
    for c in generator.generate(&RngBank::new(7)).unwrap() {
        assert!(c.contract_start <= c.contract_end, "{} has inverted contract", c.customer_id);
        assert!(c.contract_start >= window.extended_start, "{} starts too early", c.customer_id);
        assert!(c.contract_end <= window.extended_end, "{} ends too late", c.customer_id);
    }
}

#[test]
fn churn_lands_strictly_inside_observed_overlap() {
    let mut config = censored_population(2_000, 0.2, 0.2);
    config.churn_probability = 1.0;
    let generator = LifecycleGenerator::new(&config).unwrap();
    let window = *generator.window();
    let customers = generator.generate(&RngBank::new(99)).unwrap();

    let mut churned = 0;
    for c in &customers {
        let Some(churn) = c.churn else { continue };
        churned += 1;
        let from = c.contract_start.max(window.start);
        let to = c.contract_end.min(window.end);
        assert!(churn.date > from, "{}: churn {} not after {from}", c.customer_id, churn.date);
        assert!(churn.date < to, "{}: churn {} not before {to}", c.customer_id, churn.date);
    }
    assert!(churned > 0, "no churn injected at probability 1");
}

#[test]
fn churn_rate_tracks_probability_for_full_lifetimes() {
    let mut config = SimConfig::default_test().population;
    config.number_of_customers = 4_000;
    let customers = LifecycleGenerator::new(&config)
        .unwrap()
        .generate(&RngBank::new(5))
        .unwrap();
    let share = customers.iter().filter(|c| c.churn.is_some()).count() as f64 / 4_000.0;
    assert!((share - 0.5).abs() < 0.03, "churn share {share}");
}

#[test]
fn zero_churn_probability_never_churns() {
    let mut config = censored_population(500, 0.1, 0.1);
    config.churn_probability = 0.0;
    let customers = LifecycleGenerator::new(&config)
        .unwrap()
        .generate(&RngBank::new(1))
        .unwrap();
    assert!(customers.iter().all(|c| c.churn.is_none()));
}

#[test]
fn full_lifetime_spans_the_observation_window() {
    let config = SimConfig::default_test().population;
    let customers = LifecycleGenerator::new(&config)
        .unwrap()
        .generate(&RngBank::new(3))
        .unwrap();
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    assert!(customers.iter().all(|c| c.contract_start == start && c.contract_end == end));
}

#[test]
fn identifiers_and_attributes_are_deterministic() {
    let config = censored_population(100, 0.0, 0.0);
    let customers = LifecycleGenerator::new(&config)
        .unwrap()
        .generate(&RngBank::new(11))
        .unwrap();
    assert_eq!(customers[0].customer_id, "c-000000");
    assert_eq!(customers[42].customer_id, "c-000042");
    assert_eq!(customers[42].name, "Customer 42");
    assert_eq!(customers[0].industry, Industry::Technology);
    assert_eq!(customers[11].industry, customers[0].industry);
    assert_eq!(customers[7].country, Country::UnitedStates);
    assert_eq!(customers[4].plan, Plan::Pro);
}

#[test]
fn invalid_population_config_is_rejected_before_generation() {
    let cases: [(&str, fn(&mut PopulationConfig)); 6] = [
        ("no customers", |c| c.number_of_customers = 0),
        ("censoring sum", |c| {
            c.percent_left_censored = 0.7;
            c.percent_right_censored = 0.4;
        }),
        ("negative left", |c| c.percent_left_censored = -0.1),
        ("zero years", |c| c.observation_period_years = 0),
        ("churn above one", |c| c.churn_probability = 1.5),
        ("years overflow", |c| c.observation_period_years = u32::MAX),
    ];
    for (name, mutate) in cases {
        let mut config = censored_population(10, 0.1, 0.1);
        mutate(&mut config);
        match LifecycleGenerator::new(&config) {
            Err(SimError::InvalidConfig { .. }) => {}
            Err(e) => panic!("{name}: unexpected error {e}"),
            Ok(_) => panic!("{name}: config accepted"),
        }
    }
}
