//! Configuration loading and parsing

use anyhow::{Context, Result};
use can_telemetry_decoder::{DecoderConfig, LiveProtocol, LogFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// Overrides `decoder.log_format` when set
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LiveConfig {
    /// Capture file, or "-" for stdin
    pub source: Option<PathBuf>,
    pub protocol: Option<LiveProtocol>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Destination for data points (default: stdout)
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Decoder settings with the input format applied
    pub fn effective_decoder_config(&self) -> DecoderConfig {
        let mut decoder = self.decoder.clone();
        if let Some(format) = self.input.format {
            decoder.log_format = format;
        }
        decoder
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.decoder.max_live_frame_len == 0 {
        anyhow::bail!("decoder.max_live_frame_len must be positive in {:?}", path);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            files = ["run-07.log", "run-08.log"]
            format = "textual1"

            [live]
            source = "-"
            protocol = "xbee"

            [decoder]
            max_errors = 50
            message_filter = [514, 3]

            [output]
            json = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.files.len(), 2);
        assert_eq!(config.live.protocol, Some(LiveProtocol::XBEE));
        assert_eq!(config.decoder.max_errors, 50);
        assert_eq!(config.decoder.max_live_frame_len, 128);
        assert!(config.output.json);

        let decoder = config.effective_decoder_config();
        assert_eq!(decoder.log_format, LogFormat::Textual1);
        assert!(decoder.should_process_message(514));
        assert!(!decoder.should_process_message(1));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.files.is_empty());
        assert!(config.live.source.is_none());
        assert_eq!(config.effective_decoder_config(), DecoderConfig::default());
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        let result: std::result::Result<AppConfig, _> = toml::from_str(
            r#"
            [live]
            protocol = "canbus"
        "#,
        );
        assert!(result.is_err());
    }
}
