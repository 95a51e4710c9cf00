// Configuration management module
// Handles TOML configuration and environment-sourced credentials

pub mod settings;

pub use settings::{
    Config, ConfigError, DataConfig, GroqConfig, OllamaConfig, RetrievalConfig, ServerConfig,
};

/// Get the base directory where configuration and the vector index live
#[inline]
pub fn get_base_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_base_dir()
}
