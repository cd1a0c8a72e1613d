use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::PluginSettings,
};

/// Standard settings file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "readonly.toml",
    "readonly.yaml",
    "readonly.yml",
    "readonly.json",
];

/// On-disk settings format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    /// Files without an extension are read as TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        match ext {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(Error::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }
}

/// Load settings from `path` (any supported format).
pub fn load_settings(path: &Path) -> Result<PluginSettings> {
    let format = Format::from_path(path)?;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_settings(&substitute_env(&raw), format)
}

/// Parse settings from an already substituted string.
pub fn parse_settings(raw: &str, format: Format) -> Result<PluginSettings> {
    match format {
        Format::Toml => Ok(toml::from_str(raw)?),
        Format::Yaml => Ok(serde_yaml::from_str(raw)?),
        Format::Json => Ok(serde_json::from_str(raw)?),
    }
}

/// Parse a settings document into a format-neutral tree.
pub(crate) fn parse_value(raw: &str, format: Format) -> Result<serde_json::Value> {
    match format {
        Format::Toml => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        Format::Yaml => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        Format::Json => Ok(serde_json::from_str(raw)?),
    }
}

/// Discover and load settings from standard locations.
///
/// Search order:
/// 1. `./readonly.{toml,yaml,yml,json}`
/// 2. `<user config dir>/readonly/readonly.{toml,yaml,yml,json}`
///
/// Falls back to `PluginSettings::default()` when nothing is found or the
/// file does not parse.
pub fn discover_and_load() -> PluginSettings {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading settings");
        match load_settings(&path) {
            Ok(settings) => return settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load settings, using defaults");
            },
        }
    } else {
        debug!("no settings file found, using defaults");
    }
    PluginSettings::default()
}

/// Find the first settings file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/readonly/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "readonly").map(|d| d.config_dir().to_path_buf())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::io::Write};

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "readonly.toml",
            "identity_name = \"robot\"\nchannel_name = \"announcements\"\n",
        );
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.identity_name, "robot");
        assert_eq!(settings.channel_name, "announcements");
        assert_eq!(settings.text_style, "");
    }

    #[test]
    fn loads_yaml_with_host_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "readonly.yaml",
            "Username: robot\nChannelName: news\nTextStyle: italic\n",
        );
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings, PluginSettings::new("robot", "news", "italic"));
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "readonly.json", r#"{"identity_name":"robot"}"#);
        assert_eq!(load_settings(&path).unwrap().identity_name, "robot");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = Format::from_path(Path::new("readonly.ini")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "ini"));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn parse_value_normalizes_formats() {
        let from_toml = parse_value("channel_name = \"x\"", Format::Toml).unwrap();
        let from_yaml = parse_value("channel_name: x", Format::Yaml).unwrap();
        assert_eq!(from_toml, from_yaml);
    }
}
