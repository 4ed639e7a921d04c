// Model exports
pub mod criteria;
pub mod domain;

pub use criteria::{Criteria, CriteriaUpdate, SortKey, SortOrder, DEFAULT_MAX_DISTANCE_KM};
pub use domain::{Coordinate, LifecycleStatus, ProviderRef, RawProvider, RawServiceRecord, ResultSet, ServiceRecord};
