pub mod assistant;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod notify;
pub mod report;
pub mod simulation;
pub mod stats;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, ValidationError};
pub use store::CityDataStore;
