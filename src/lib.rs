pub mod bench;
pub mod cli;
pub mod config;
pub mod queries;
pub mod record;
pub mod replicator;
pub mod seed;
pub mod store;
