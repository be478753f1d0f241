use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

/// Engine-wide settings consumed by the evaluation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for a single rule test.
    #[serde(default = "default_async_timeout", with = "duration_ms")]
    pub async_timeout: Duration,

    /// Upper bound for a whole pass.
    #[serde(default = "default_engine_timeout", with = "duration_ms")]
    pub engine_timeout: Duration,

    #[serde(default = "default_priority")]
    pub default_priority: f64,

    #[serde(default = "default_true")]
    pub default_toggle: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            async_timeout: default_async_timeout(),
            engine_timeout: default_engine_timeout(),
            default_priority: default_priority(),
            default_toggle: default_true(),
        }
    }
}

impl EngineConfig {
    pub fn with_async_timeout(mut self, timeout: Duration) -> Self {
        self.async_timeout = timeout;
        self
    }

    pub fn with_engine_timeout(mut self, timeout: Duration) -> Self {
        self.engine_timeout = timeout;
        self
    }

    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        from_file(path)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    let config = serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(config)
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// デフォルト値の定義
fn default_async_timeout() -> Duration {
    Duration::from_millis(3000)
}

fn default_engine_timeout() -> Duration {
    Duration::from_millis(10000)
}

fn default_priority() -> f64 {
    9.0
}

fn default_true() -> bool {
    true
}

// Duration型のシリアライズ/デシリアライズヘルパー
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
