// Service exports
pub mod data_source;
pub mod location;

pub use data_source::{DataSourceError, HttpDataSource, ServiceDataSource};
pub use location::{LocationError, LocationProvider, StaticLocation};
