//! Settings
//!
//! [`PagesSettings`] collects the tunables of the toolkit. Every field has a
//! default, so a settings file only needs to name what it changes:
//!
//! ```toml
//! [channel]
//! max_pending = 64
//!
//! [bridge]
//! stop_propagation = false
//!
//! [router]
//! route_capacity = 1
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelConfig;
use crate::events::BridgeOptions;
use crate::router::RouterConfig;

/// Settings error
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	/// The settings file could not be read.
	#[error("File error: {0}")]
	FileError(String),

	/// The settings could not be deserialized.
	#[error("Parse error: {0}")]
	ParseError(String),

	/// The settings were parsed but are not usable.
	#[error("Validation error: {0}")]
	ValidationError(String),

	/// The file extension is neither `.toml` nor `.json`.
	#[error("Unsupported format: {0}")]
	UnsupportedFormat(String),
}

/// Toolkit settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesSettings {
	/// Defaults for every channel the toolkit creates.
	pub channel: ChannelConfig,
	/// Listener behavior of event bridges.
	pub bridge: BridgeOptions,
	/// Channel sizes of routers.
	pub router: RouterConfig,
}

impl PagesSettings {
	/// Create new settings with defaults
	pub fn new() -> Self {
		Self::default()
	}

	/// Validate settings
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.channel.max_pending == 0 {
			return Err(SettingsError::ValidationError(
				"channel.max_pending must be at least 1".to_string(),
			));
		}
		Ok(())
	}

	/// Parse and validate settings from TOML
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		let settings: PagesSettings = toml::from_str(source)
			.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Parse and validate settings from JSON
	pub fn from_json_str(source: &str) -> Result<Self, SettingsError> {
		let settings: PagesSettings = serde_json::from_str(source)
			.map_err(|e| SettingsError::ParseError(format!("JSON parse error: {}", e)))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Load settings from a `.toml` or `.json` file
	pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path).map_err(|e| {
			SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e))
		})?;

		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml_str(&contents),
			Some("json") => Self::from_json_str(&contents),
			_ => Err(SettingsError::UnsupportedFormat(
				"Supported formats: .toml, .json".to_string(),
			)),
		}
	}
}
