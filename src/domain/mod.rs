mod billing;
mod performance;

pub use billing::{BillingRecord, DerivedRecord};
pub use performance::BuildingPerformance;
