//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$QUOTECHAIN_CONFIG` (environment variable)
//! 2. `~/.config/quotechain/config.toml` (Linux/macOS)
//!    `%APPDATA%\quotechain\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The library entry points that take no configuration use [`Config::default`].

use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// MIME decoding settings.
    pub decoder: DecoderConfig,
    /// Quote-chain reconstruction settings.
    pub quote: QuoteConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// MIME decoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// How many characters of the unparsed source to return when nothing decodes.
    pub fallback_preview_chars: usize,
}

/// Quote-chain reconstruction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// Number of trailing lines searched for a signature delimiter.
    pub signature_window: usize,
    /// A delimiter at or above this line index never cuts the text.
    pub signature_min_index: usize,
    /// Longest signature block accepted below a delimiter outside the window.
    pub max_signature_lines: usize,
    /// Lines inspected after a `>` line when no attribution header is present.
    pub sniff_lookahead: usize,
    /// How many of those lines must be quoted for the `>` line to start the chain.
    pub sniff_min_quoted: usize,
    /// Deepest quote level parsed as a separate message.
    pub max_quote_depth: usize,
    /// UTC offset (minutes) applied to attribution dates that carry no zone.
    pub local_utc_offset_minutes: i32,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            fallback_preview_chars: 500,
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            signature_window: 15,
            signature_min_index: 2,
            max_signature_lines: 25,
            sniff_lookahead: 5,
            sniff_min_quoted: 3,
            max_quote_depth: 64,
            local_utc_offset_minutes: 9 * 60, // JST
        }
    }
}

impl QuoteConfig {
    /// The zone used for attribution dates that carry no offset.
    ///
    /// Out-of-range values fall back to UTC.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.local_utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("QUOTECHAIN_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("quotechain").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quotechain")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.decoder.fallback_preview_chars, 500);
        assert_eq!(cfg.quote.signature_window, 15);
        assert_eq!(cfg.quote.signature_min_index, 2);
        assert_eq!(cfg.quote.sniff_lookahead, 5);
        assert_eq!(cfg.quote.sniff_min_quoted, 3);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.quote.max_quote_depth, cfg.quote.max_quote_depth);
        assert_eq!(
            parsed.decoder.fallback_preview_chars,
            cfg.decoder.fallback_preview_chars
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[quote]
signature_window = 20
local_utc_offset_minutes = 0
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.quote.signature_window, 20);
        assert_eq!(cfg.quote.local_offset().local_minus_utc(), 0);
        // Other fields use defaults
        assert_eq!(cfg.quote.max_signature_lines, 25);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_local_offset_out_of_range_is_utc() {
        let cfg = QuoteConfig {
            local_utc_offset_minutes: 100_000,
            ..QuoteConfig::default()
        };
        assert_eq!(cfg.local_offset().local_minus_utc(), 0);
        assert_eq!(QuoteConfig::default().local_offset().local_minus_utc(), 9 * 3600);
    }
}
