//! Pure data and path logic for pyrig: target platforms, component
//! descriptors, download URL resolution, the `.deps` layout and the
//! persisted environment descriptor.

pub mod build_env;
pub mod component;
pub mod env_descriptor;
pub mod layout;
pub mod platform;
pub mod resolve;

pub use build_env::compose_build_env;
pub use component::{ComponentDescriptor, ComponentKind, ComponentVersions, VariantFlags};
pub use env_descriptor::{EnvDescriptor, ENV_FILE_NAME};
pub use layout::{ProjectLayout, DEPS_DIR};
pub use platform::TargetPlatform;
pub use resolve::{resolve, ArchiveFormat, ResolveError, ResolvedArtifact};
