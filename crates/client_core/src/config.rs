use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

use crate::controller::DEFAULT_PAGE_SIZE;

pub const DEFAULT_SETTINGS_FILE: &str = "backoffice.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub json_placeholder_url: String,
    pub dummy_json_url: String,
    pub request_timeout_ms: u64,
    pub page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            json_placeholder_url: "https://jsonplaceholder.typicode.com".into(),
            dummy_json_url: "https://dummyjson.com".into(),
            request_timeout_ms: 10_000,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    json_placeholder_url: Option<String>,
    dummy_json_url: Option<String>,
    request_timeout_ms: Option<u64>,
    page_size: Option<usize>,
}

/// Parsed service roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub json_placeholder: Url,
    pub dummy_json: Url,
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn endpoints(&self) -> anyhow::Result<Endpoints> {
        Ok(Endpoints {
            json_placeholder: Url::parse(&self.json_placeholder_url).with_context(|| {
                format!("invalid json_placeholder_url '{}'", self.json_placeholder_url)
            })?,
            dummy_json: Url::parse(&self.dummy_json_url)
                .with_context(|| format!("invalid dummy_json_url '{}'", self.dummy_json_url))?,
        })
    }

    fn merge_file(&mut self, file: FileSettings) {
        if let Some(v) = file.json_placeholder_url {
            self.json_placeholder_url = v;
        }
        if let Some(v) = file.dummy_json_url {
            self.dummy_json_url = v;
        }
        if let Some(v) = file.request_timeout_ms {
            self.request_timeout_ms = v;
        }
        if let Some(v) = file.page_size {
            self.page_size = v;
        }
    }

    fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("APP__JSON_PLACEHOLDER_URL") {
            self.json_placeholder_url = v;
        }
        if let Some(v) = lookup("APP__DUMMY_JSON_URL") {
            self.dummy_json_url = v;
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS") {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.request_timeout_ms = parsed;
            }
        }
        if let Some(v) = lookup("APP__PAGE_SIZE") {
            if let Ok(parsed) = v.trim().parse::<usize>() {
                self.page_size = parsed;
            }
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be at least 1");
        }
        Ok(())
    }
}

/// Defaults, then `path` (or `backoffice.toml` when present), then `APP__*` variables.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (file, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
    };
    match fs::read_to_string(&file) {
        Ok(raw) => {
            let parsed: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse settings '{}'", file.display()))?;
            settings.merge_file(parsed);
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings '{}'", file.display()));
        }
    }

    settings.merge_env(lookup);
    settings.check()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_file(contents: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("backoffice_settings_test_{suffix}.toml"));
        fs::write(&path, contents).expect("write settings");
        path
    }

    #[test]
    fn file_values_override_defaults_and_env_overrides_file() {
        let path = temp_file("dummy_json_url = \"http://127.0.0.1:9000\"\npage_size = 25\n");
        let env: HashMap<&str, &str> = HashMap::from([("APP__PAGE_SIZE", "5")]);

        let settings =
            load_settings_with(Some(&path), |key| env.get(key).map(|v| v.to_string()))
                .expect("settings");

        assert_eq!(settings.dummy_json_url, "http://127.0.0.1:9000");
        assert_eq!(settings.page_size, 5);
        assert_eq!(settings.request_timeout_ms, 10_000);
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let missing = env::temp_dir().join("backoffice_settings_missing_for_test.toml");
        assert!(load_settings_with(Some(&missing), |_| None).is_err());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let path = temp_file("page_size = 0\n");
        let err = load_settings_with(Some(&path), |_| None).expect_err("zero page size");
        assert!(err.to_string().contains("page_size"));
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn endpoints_parse_default_roots() {
        let endpoints = Settings::default().endpoints().expect("endpoints");
        assert_eq!(endpoints.dummy_json.host_str(), Some("dummyjson.com"));
    }
}
