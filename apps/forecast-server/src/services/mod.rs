pub mod ingest;
pub mod provider;
pub mod query;
pub mod retention;
pub mod scheduler;
