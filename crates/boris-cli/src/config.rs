//! Configuration loading and management.

use std::path::{Path, PathBuf};

use boris_core::{AgreementMethod, EventPolicy, Timestamp};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Decimal places times are rounded to before agreement is computed.
    /// Default: no rounding.
    pub decimal_places: Option<i32>,

    /// Weight of a point event in time-weighted Kappa. Default: 1.0
    pub event_weight: f64,

    /// Stop and restart a running state when it is re-coded with other
    /// modifiers. Default: false
    pub close_same_event: bool,

    /// How far before the triggering event a synthesized stop is placed.
    /// Default: 0.001 s
    pub stop_offset: Timestamp,

    /// Compare and display modifiers with behaviors. Default: false
    pub include_modifiers: bool,
}

impl Default for Config {
    fn default() -> Self {
        let policy = EventPolicy::default();
        Self {
            decimal_places: None,
            event_weight: 1.0,
            close_same_event: policy.close_same_event,
            stop_offset: policy.stop_offset,
            include_modifiers: false,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // BORIS_EVENT_WEIGHT, BORIS_CLOSE_SAME_EVENT, ...
        figment = figment.merge(Env::prefixed("BORIS_"));

        figment.extract()
    }

    #[must_use]
    pub const fn policy(&self) -> EventPolicy {
        EventPolicy {
            close_same_event: self.close_same_event,
            stop_offset: self.stop_offset,
        }
    }

    #[must_use]
    pub const fn agreement_method(&self, weighted: bool) -> AgreementMethod {
        if weighted {
            AgreementMethod::TimeWeighted {
                event_weight: self.event_weight,
            }
        } else {
            AgreementMethod::Unweighted
        }
    }
}

/// Returns the platform-specific config directory for boris.
///
/// On Linux: `~/.config/boris`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("boris"))
}
