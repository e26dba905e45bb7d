pub mod context;
pub mod settings;

pub(crate) use settings::EnvSnapshot;
pub use settings::{CacheConfig, Config, GlobalOptions, NetworkConfig};
