//! Settings validation.
//!
//! Reports syntax errors, unknown or misspelled keys and settings that will
//! parse but behave surprisingly at runtime. Validation never blocks
//! loading; callers decide what to do with the diagnostics.

use std::path::{Path, PathBuf};

use crate::{
    loader::{Format, find_config_file, parse_value},
    schema::PluginSettings,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// One of "syntax", "unknown-field", "type-error", "empty-name",
    /// "mention", "file-ref".
    pub category: &'static str,
    /// Top-level key the diagnostic refers to; empty for the whole file.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a settings file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, case-insensitively.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let needle = needle.to_lowercase();
    candidates
        .iter()
        .map(|&c| (c, levenshtein(&needle, &c.to_lowercase())))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

/// Validate the settings file at `path`, or the discovered one when `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no settings file found; using defaults",
            )],
            config_path: None,
        };
    };

    let format = match Format::from_path(&actual_path) {
        Ok(format) => format,
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic::new(Severity::Error, "syntax", "", e.to_string())],
                config_path: Some(actual_path),
            };
        },
    };

    match std::fs::read_to_string(&actual_path) {
        Ok(content) => {
            let raw = crate::env_subst::substitute_env(&content);
            let mut result = validate_str(&raw, format);
            result.config_path = Some(actual_path);
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read settings file: {e}"),
            )],
            config_path: Some(actual_path),
        },
    }
}

/// Validate a settings document without touching the filesystem.
#[must_use]
pub fn validate_str(raw: &str, format: Format) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value = match parse_value(raw, format) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    match &value {
        serde_json::Value::Object(map) => {
            for key in map.keys() {
                if PluginSettings::is_known_key(key) {
                    continue;
                }
                let message = match suggest(key, PluginSettings::KEYS, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    key.clone(),
                    message,
                ));
            }
        },
        // An empty YAML document parses to null, which means all defaults.
        serde_json::Value::Null => {},
        _ => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "type-error",
                "",
                "settings must be a table of keys",
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    }

    let settings = if value.is_null() {
        Ok(PluginSettings::default())
    } else {
        serde_json::from_value::<PluginSettings>(value)
    };
    match settings {
        Ok(settings) => check_semantics(&settings, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_semantics(settings: &PluginSettings, diagnostics: &mut Vec<Diagnostic>) {
    if settings.identity_name.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "empty-name",
            "identity_name",
            "identity_name is empty; reconciliation will try to create a user with an empty name",
        ));
    } else if settings.identity_name.starts_with('@') {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "mention",
            "identity_name",
            "identity_name should not include the leading '@'; mentions would never match",
        ));
    } else if settings.identity_name.chars().any(char::is_whitespace) {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "mention",
            "identity_name",
            "identity_name contains whitespace; usernames cannot be mentioned with spaces",
        ));
    }

    if settings.channel_name.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "empty-name",
            "channel_name",
            "channel_name is empty; no team will have a read-only channel",
        ));
    }
}
