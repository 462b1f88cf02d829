use anyhow::{Context, Result};
use facerec_client::ApiConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration: defaults, then an optional TOML file, then `FACEREC_*`
/// environment variables. Command-line flags are applied last by `main`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the recognition service.
    pub api_url: String,
    /// Static key sent as `X-API-Key`.
    pub api_key: Option<String>,
    /// Timeout in seconds for recognition and enrollment calls.
    pub recognition_timeout_secs: u64,
    /// Timeout in seconds for every other call.
    pub request_timeout_secs: u64,
    /// V4L2 device path used when no image file is given.
    pub camera_device: String,
    /// Frames discarded after opening the camera.
    pub warmup_frames: usize,
    /// Where to keep a copy of the last camera capture, if anywhere.
    pub capture_save_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5001".to_string(),
            api_key: None,
            recognition_timeout_secs: 10,
            request_timeout_secs: 30,
            camera_device: "/dev/video0".to_string(),
            warmup_frames: facerec_capture::source::DEFAULT_WARMUP_FRAMES,
            capture_save_path: None,
        }
    }
}

impl Config {
    /// Load the file at `path` (if any) and overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load the file at `path` (if any) and overlay variables read through `lookup`.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(lookup);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay `FACEREC_*` variables read through `lookup`.
    ///
    /// Unparsable numbers keep the current value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("FACEREC_API_URL") {
            self.api_url = url;
        }
        if let Some(key) = lookup("FACEREC_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(device) = lookup("FACEREC_CAMERA_DEVICE") {
            self.camera_device = device;
        }
        if let Some(path) = lookup("FACEREC_CAPTURE_SAVE_PATH") {
            self.capture_save_path = Some(PathBuf::from(path));
        }
        self.recognition_timeout_secs = env_parse(
            &lookup,
            "FACEREC_RECOGNITION_TIMEOUT_SECS",
            self.recognition_timeout_secs,
        );
        self.request_timeout_secs =
            env_parse(&lookup, "FACEREC_REQUEST_TIMEOUT_SECS", self.request_timeout_secs);
        self.warmup_frames = env_parse(&lookup, "FACEREC_WARMUP_FRAMES", self.warmup_frames);
    }

    /// Build the client config. Fails if the key is missing or the URL is invalid.
    pub fn api_config(&self) -> Result<ApiConfig> {
        let api_key = self
            .api_key
            .as_deref()
            .context("no API key configured (set FACEREC_API_KEY or --api-key)")?;
        let config = ApiConfig::new(&self.api_url, api_key)?
            .with_recognition_timeout(Duration::from_secs(self.recognition_timeout_secs))?
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))?;
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.recognition_timeout_secs, 10);
        assert_eq!(config.warmup_frames, 10);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            api_url = "http://10.0.0.5:5001"
            api_key = "sk-file"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_url, "http://10.0.0.5:5001");
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.camera_device, "/dev/video0");
    }

    #[test]
    fn test_unknown_toml_key_rejected() {
        assert!(Config::from_toml("api_uri = \"typo\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml("api_key = \"sk-file\"\nwarmup_frames = 2").unwrap();
        config.apply_env(env(&[
            ("FACEREC_API_KEY", "sk-env"),
            ("FACEREC_RECOGNITION_TIMEOUT_SECS", "15"),
            ("FACEREC_CAMERA_DEVICE", "/dev/video2"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.recognition_timeout_secs, 15);
        assert_eq!(config.camera_device, "/dev/video2");
        assert_eq!(config.warmup_frames, 2);
    }

    #[test]
    fn test_bad_env_number_keeps_value() {
        let mut config = Config::default();
        config.apply_env(env(&[("FACEREC_WARMUP_FRAMES", "lots")]));
        assert_eq!(config.warmup_frames, 10);
    }

    #[test]
    fn test_api_config_requires_key() {
        let config = Config::default();
        let err = config.api_config().unwrap_err();
        assert!(err.to_string().contains("FACEREC_API_KEY"));
    }

    #[test]
    fn test_api_config_applies_timeouts() {
        let config = Config {
            api_key: Some("sk-test".into()),
            recognition_timeout_secs: 4,
            ..Config::default()
        };
        let api = config.api_config().unwrap();
        assert_eq!(api.recognition_timeout(), Duration::from_secs(4));
        assert_eq!(api.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_api_config_rejects_zero_timeout() {
        let config = Config {
            api_key: Some("sk-test".into()),
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.api_config().is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facerec.toml");
        std::fs::write(
            &path,
            "api_url = \"https://faces.example.com\"\nwarmup_frames = 4\n",
        )
        .unwrap();

        let config = Config::load_with(Some(&path), env(&[])).unwrap();
        assert_eq!(config.api_url, "https://faces.example.com");
        assert_eq!(config.warmup_frames, 4);
        assert_eq!(config.request_timeout_secs, 30);

        let config =
            Config::load_with(Some(&path), env(&[("FACEREC_API_URL", "http://10.0.0.9:5001")]))
                .unwrap();
        assert_eq!(config.api_url, "http://10.0.0.9:5001");
        assert_eq!(config.warmup_frames, 4);

        let missing = dir.path().join("missing.toml");
        assert!(Config::load_with(Some(&missing), env(&[])).is_err());
    }
}
