//! Run export into SQLite.

use churnsim_core::{
    config::SimConfig,
    engine::ChurnEvaluationHarness,
    store::SimStore,
};

fn exported_store(customers: usize) -> (SimStore, churnsim_core::engine::SimulationRun) {
    let mut config = SimConfig::default_test();
    config.population.number_of_customers = customers;
    let harness = ChurnEvaluationHarness::with_run_id("store-test".into(), config.clone()).unwrap();
    let run = harness.run().unwrap();

    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.save_run(&run, &config, "0.1.0-test").expect("save run");
    (store, run)
}

#[test]
fn exported_tables_match_the_run() {
    let (store, run) = exported_store(40);
    assert_eq!(store.customer_count("store-test").unwrap(), 40);
    assert_eq!(store.activity_count("store-test").unwrap(), run.activity.len() as i64);
    assert_eq!(store.confusion_counts("store-test").unwrap(), run.summary.counts);
    assert!(store.failed_customers("store-test").unwrap().is_empty());
}

#[test]
fn churn_dates_round_trip() {
    let (store, run) = exported_store(20);
    for c in &run.customers {
        let stored = store.churn_date("store-test", &c.customer_id).unwrap();
        assert_eq!(stored, c.churn.map(|e| e.date), "{}", c.customer_id);
    }
    assert_eq!(store.churn_date("store-test", "no-such-customer").unwrap(), None);
}

#[test]
fn run_ids_are_unique() {
    let (store, run) = exported_store(5);
    let config = SimConfig::default_test();
    assert!(store.save_run(&run, &config, "0.1.0-test").is_err(), "duplicate run id accepted");
}
