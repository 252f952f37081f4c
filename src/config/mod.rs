pub mod loader;
pub mod schema;

pub use loader::{discover, load_from_path, load_from_str, ConfigError};
pub use schema::{
    AppConfig, ModelConfig, ReviewConfig, ValidationError, ValidationIssue, DEFAULT_SECTIONS,
};
