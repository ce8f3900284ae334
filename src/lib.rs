//! Lead Sync API Library
//!
//! This library ingests leads from advertising platforms (Meta Lead Ads,
//! Google Ads lead forms), normalizes them into one canonical record,
//! deduplicates and persists them, and keeps an audit log of every sync run.
//!
//! # Modules
//!
//! - `app`: Wiring of store, adapters, orchestrator and router.
//! - `config`: Configuration management.
//! - `db`: Database connection and migrations.
//! - `db_storage`: PostgreSQL lead store.
//! - `dedup`: Atomic create-or-refresh of leads.
//! - `errors`: Error handling types.
//! - `google_ads_models`: Google Ads lead form models.
//! - `handlers`: HTTP request handlers.
//! - `memory_store`: In-memory lead store.
//! - `meta_models`: Meta Lead Ads models.
//! - `mock_providers`: Simulated provider feeds.
//! - `models`: Core data models.
//! - `normalize`: Field cleanup shared by providers.
//! - `orchestrator`: Sync runs and the run guard.
//! - `providers`: Fetch and normalize per platform.
//! - `scheduler`: Periodic auto-sync.
//! - `store`: Persistence trait.

pub mod app;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod dedup;
pub mod errors;
pub mod google_ads_models;
pub mod handlers;
pub mod memory_store;
pub mod meta_models;
pub mod mock_providers;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod providers;
pub mod scheduler;
pub mod store;
