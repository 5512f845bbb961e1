//! Fleetwatch: polls game server build status across clusters and
//! aggregates it into fleet, cluster, build and title views.

pub mod adapters;
pub mod config;
pub mod discovery;
pub mod fleet;
pub mod server;
