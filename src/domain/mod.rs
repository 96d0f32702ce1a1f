pub mod config;
pub mod error;

pub use config::ConfigModel;
pub use error::StoreError;
