pub mod loader;
pub mod schema;

pub use loader::{
    discover, find_config, load_from_path, load_from_str, ConfigError, ConfigOrigin,
    PROJECT_CONFIG_NAME,
};
pub use schema::{FormatConfig, ValidationError, ValidationIssue};
