pub mod models;
pub mod schema;

mod account;
pub use account::Account;

pub mod api;
pub mod config;
pub mod decoder;
pub mod ingest;
pub mod store;
