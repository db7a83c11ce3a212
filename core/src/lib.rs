//! Churn detection simulation: synthetic customer lifecycles, weekly activity
//! signals, signal cleaning, CUSUM change-point detection and scoring against
//! the injected ground truth.

pub mod activity;
pub mod catalog;
pub mod config;
pub mod cusum;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod rng;
pub mod signal;
pub mod store;
pub mod types;
