use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialBotConfig {
    bot_token: Option<String>,
    db_path: Option<String>,
    bot_name: Option<String>,
    sweep_interval_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
    max_concurrent_probes: Option<usize>,
}

fn default_db_path() -> String {
    "data/knockbot.db".to_string()
}

fn default_bot_name() -> String {
    "knockknockbot".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_probes() -> usize {
    16
}

impl PartialBotConfig {
    fn from_env() -> Self {
        Self {
            bot_token: env::var("BOT_TOKEN").ok(),
            db_path: env::var("BOT_DB_PATH").ok(),
            bot_name: env::var("BOT_NAME").ok(),
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS"),
            probe_timeout_secs: parse_env("PROBE_TIMEOUT_SECS"),
            max_concurrent_probes: parse_env("MAX_CONCURRENT_PROBES"),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(variable = name, value = %value, "Ignoring unparsable environment override.");
            None
        }
    }
}

impl BotConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        // 1. Load from file (optional)
        let file_config: PartialBotConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialBotConfig::default()
            }
        } else {
            PartialBotConfig::default()
        };

        // 2. Load from environment variables and merge: environment overrides file
        merge(file_config, PartialBotConfig::from_env())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }
}

fn merge(file: PartialBotConfig, env: PartialBotConfig) -> Result<BotConfig, String> {
    Ok(BotConfig {
        bot_token: env
            .bot_token
            .or(file.bot_token)
            .ok_or("BOT_TOKEN is required")?,
        db_path: env.db_path.or(file.db_path).unwrap_or_else(default_db_path),
        bot_name: env
            .bot_name
            .or(file.bot_name)
            .unwrap_or_else(default_bot_name),
        sweep_interval_secs: env
            .sweep_interval_secs
            .or(file.sweep_interval_secs)
            .unwrap_or_else(default_sweep_interval_secs),
        probe_timeout_secs: env
            .probe_timeout_secs
            .or(file.probe_timeout_secs)
            .unwrap_or_else(default_probe_timeout_secs),
        max_concurrent_probes: env
            .max_concurrent_probes
            .or(file.max_concurrent_probes)
            .unwrap_or_else(default_max_concurrent_probes),
    })
}
