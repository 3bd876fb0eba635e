//! Semantic checks on a parsed configuration.

use std::fmt;

use crate::schema::CourierConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "script.start_steps[0].asset"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

/// Validate a parsed config. An empty result means the config is usable.
pub fn validate(config: &CourierConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if !config.telegram.has_token() {
        diagnostics.push(Diagnostic::error(
            "telegram.token",
            "bot token is empty (set TELEGRAM_TOKEN or telegram.token)",
        ));
    }
    if u64::from(config.telegram.poll_timeout_secs) >= config.telegram.request_timeout_secs {
        diagnostics.push(Diagnostic::warning(
            "telegram.request_timeout_secs",
            "request timeout should exceed the long-polling timeout",
        ));
    }

    if config.engine.retry.max_attempts == 0 {
        diagnostics.push(Diagnostic::error(
            "engine.retry.max_attempts",
            "must be at least 1",
        ));
    }
    if config.engine.cache_path.is_none() {
        diagnostics.push(Diagnostic::warning(
            "engine.cache_path",
            "not set; issued file ids will not survive a restart",
        ));
    }

    for (key, asset) in &config.assets {
        if !asset.to_asset(key).has_source() {
            diagnostics.push(Diagnostic::error(
                format!("assets.{key}"),
                "needs at least one of local_path, remote_url or override_id",
            ));
        }
        if let Some(ref path) = asset.local_path
            && !path.is_file()
        {
            diagnostics.push(Diagnostic::warning(
                format!("assets.{key}.local_path"),
                format!("{} does not exist", path.display()),
            ));
        }
    }

    for (i, step) in config.script.start_steps.iter().enumerate() {
        if !config.assets.contains_key(&step.asset) {
            diagnostics.push(Diagnostic::error(
                format!("script.start_steps[{i}].asset"),
                format!("unknown asset \"{}\"", step.asset),
            ));
        }
    }

    diagnostics
}
