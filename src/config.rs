//! Tracker configuration.

use crate::error::TrackerError;
use serde::Deserialize;

/// What a [`StepHandle`](crate::StepHandle) reports when a hook or body fails.
///
/// Failures are always caught, logged and rendered. The policy only decides
/// whether awaiting the handle yields them as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Resolve with `Ok`, failures listed in the report.
    #[default]
    Swallow,
    /// Resolve with [`TrackerError::StepFailed`] when anything failed.
    Propagate,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swallow" => Ok(FailurePolicy::Swallow),
            "propagate" => Ok(FailurePolicy::Propagate),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

/// Inclusive bounds for the random 256-color codes picked per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ColorRange {
    /// Lowest color code.
    pub min: u8,
    /// Highest color code.
    pub max: u8,
}

impl ColorRange {
    /// Creates a validated color range.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidColorRange`] when `min > max`.
    ///
    /// ```
    /// use devlog::ColorRange;
    ///
    /// assert!(ColorRange::new(1, 222).is_ok());
    /// assert!(ColorRange::new(10, 2).is_err());
    /// ```
    pub fn new(min: u8, max: u8) -> Result<Self, TrackerError> {
        if min > max {
            return Err(TrackerError::InvalidColorRange { min, max });
        }
        Ok(Self { min, max })
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self { min: 1, max: 222 }
    }
}

/// Configuration shared by every context of one root tree.
///
/// # Examples
///
/// ```
/// use devlog::{FailurePolicy, TrackerConfig};
///
/// let config = TrackerConfig {
///     failure_policy: FailurePolicy::Propagate,
///     color: false,
///     ..TrackerConfig::default()
/// };
/// assert_eq!(config.glyph, "⎆ ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Whether failures surface through step handles. Default: swallow.
    pub failure_policy: FailurePolicy,
    /// Emit ANSI colors on the console. Default: true.
    pub color: bool,
    /// Bounds for per-level colors. Default: 1..=222.
    pub color_range: ColorRange,
    /// Glyph repeated once per level in front of each line.
    pub glyph: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Swallow,
            color: true,
            color_range: ColorRange::default(),
            glyph: "⎆ ".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Defaults with environment overrides applied.
    ///
    /// - `NO_COLOR` (any value) disables colors.
    /// - `DEVLOG_FAILURE_POLICY` = `swallow` | `propagate`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if lookup("NO_COLOR").is_some() {
            self.color = false;
        }
        if let Some(raw) = lookup("DEVLOG_FAILURE_POLICY") {
            match raw.parse() {
                Ok(policy) => self.failure_policy = policy,
                Err(e) => tracing::warn!("Ignoring DEVLOG_FAILURE_POLICY: {}", e),
            }
        }
    }
}
