pub mod builder;
pub mod handler;
pub mod listener;

pub use builder::ServerBuilder;
pub use handler::{HealthHandler, HEALTH_PATH, METRICS_PATH};
