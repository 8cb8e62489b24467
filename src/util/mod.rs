//! Utility modules for kubeshift

pub mod logging;
pub mod naming;

pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
pub use naming::{make_container_name_compliant, name_from_directory};
