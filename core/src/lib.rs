pub mod aggregation_engine;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod fallback;
pub mod ingest;
pub mod insight_engine;
pub mod job;
pub mod model;
pub mod outcome;
pub mod rfm_engine;
pub mod rng;
pub mod segment;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod types;
