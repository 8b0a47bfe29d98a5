pub mod health;

pub use health::{AppStartTime, HealthMonitor, HealthService, HealthState};
