//! mapharvest — incremental, resumable map-listing and review harvesting.
//!
//! The pipeline discovers place listings on a map search surface, routes
//! each through a dedup index keyed on `(name, coordinates, address)`, and
//! harvests paginated reviews under per-entity quotas. Two flat tabular
//! stores are the source of truth for what has already been done, so a run
//! can be interrupted at any point and resumed without re-fetching or
//! duplicating data.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod models;
pub mod scrape;
pub mod services;
pub mod store;
