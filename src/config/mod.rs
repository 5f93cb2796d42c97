mod loader;

pub use loader::{Config, OutputConfig, PublishConfig, DEFAULT_CONFIG_PATH};
