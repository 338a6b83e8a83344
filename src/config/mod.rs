//! Configuration management for vmemo.
//!
//! Loads and saves the TOML configuration file in the user's config directory.

pub mod file;

pub use file::{
    get_config_path, AudioConfig, PlaybackConfig, SendConfig, VisualizationType, VmemoConfig,
};
