mod registry;
mod types;

pub use registry::{EventRegistry, RegistryStatsSnapshot, SubscriberId};
pub use types::ChangeEvent;
