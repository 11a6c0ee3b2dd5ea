//! # incident-agent
//!
//! Cluster-resident agent that watches pods, classifies failures with a
//! root cause attached, and correlates the resulting events into incidents
//! with an ongoing/resolved lifecycle.
//!
//! The reconciliation engine ([`engine::Reconciler`]) reads the cluster
//! through [`cluster::ClusterReader`] and hands events to
//! [`dispatch::Dispatcher`]; the [`engine::Correlator`] folds queued events
//! into the incident store.

pub mod analyzer;
pub mod cluster;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod model;
pub mod owner;
pub mod telemetry;
