pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod metric_catalog;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod time;

#[cfg(test)]
pub mod test_support;
