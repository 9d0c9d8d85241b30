use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Args;
use crate::orchestrator::DEFAULT_MAX_TURNS;

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000/mcp";
pub const DEFAULT_API_ENDPOINT: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

const DEFAULT_STREAM_TIMEOUT: u64 = 30;
const DEFAULT_GATEWAY_TIMEOUT: u64 = 30;

pub struct Config {
    pub gateway_url: String,
    pub api_endpoint: String,
    pub model: String,
    pub max_turns: usize,
    pub stream_timeout: u64,
    pub gateway_timeout: u64,
    pub system_prompt: Option<String>,
    pub speech_enabled: bool,
    pub speech_command: String,
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct YamlConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub stream_timeout: Option<u64>,
    #[serde(default)]
    pub max_turns: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
}

impl Config {
    /// Layering: CLI args > `VOX_*` env vars > YAML config > defaults.
    pub fn from_env_and_args(args: &Args) -> Result<Self, String> {
        let yaml_config = YamlConfig::load().unwrap_or_default();

        let gateway_url = args
            .gateway_url
            .clone()
            .or_else(|| env::var("VOX_GATEWAY_URL").ok())
            .or(yaml_config.gateway.url.clone())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());

        let api_endpoint = args
            .api_endpoint
            .clone()
            .or_else(|| env::var("VOX_API_ENDPOINT").ok())
            .or(yaml_config.model.api_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let model = args
            .model
            .clone()
            .or_else(|| env::var("VOX_MODEL").ok())
            .or(yaml_config.model.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_turns = args
            .max_turns
            .or_else(|| {
                env::var("VOX_MAX_TURNS")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
            })
            .or(yaml_config.model.max_turns)
            .unwrap_or(DEFAULT_MAX_TURNS);
        if max_turns == 0 {
            return Err("max_turns must be at least 1".to_string());
        }

        let stream_timeout = env::var("VOX_STREAM_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .or(yaml_config.model.stream_timeout)
            .unwrap_or(DEFAULT_STREAM_TIMEOUT);

        let gateway_timeout = yaml_config.gateway.timeout.unwrap_or(DEFAULT_GATEWAY_TIMEOUT);

        let system_prompt = env::var("VOX_SYSTEM_PROMPT")
            .ok()
            .or(yaml_config.model.system_prompt.clone());

        let speech_enabled = if args.no_speech {
            false
        } else {
            match env::var("VOX_SPEECH_ENABLED").ok() {
                Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
                None => yaml_config.speech.enabled.unwrap_or(true),
            }
        };

        let speech_command = env::var("VOX_SPEECH_COMMAND")
            .ok()
            .or(yaml_config.speech.command.clone())
            .unwrap_or_else(|| default_speech_command().to_string());

        let verbose = args.verbose
            || env::var("VOX_VERBOSE")
                .ok()
                .map(|v| v == "true")
                .or(yaml_config.session.verbose)
                .unwrap_or(false);

        Ok(Config {
            gateway_url,
            api_endpoint,
            model,
            max_turns,
            stream_timeout,
            gateway_timeout,
            system_prompt,
            speech_enabled,
            speech_command,
            verbose,
        })
    }

    pub fn current_date() -> String {
        chrono::Local::now().format("%A, %B %d, %Y").to_string()
    }
}

fn default_speech_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "say"
    } else {
        "espeak"
    }
}

impl YamlConfig {
    pub fn load() -> anyhow::Result<Self> {
        for path in Self::config_paths() {
            if path.exists() {
                return Self::from_path(&path);
            }
        }

        Ok(YamlConfig::default())
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Current directory first: local override wins.
        paths.push(PathBuf::from(".voxchat.yaml"));
        paths.push(PathBuf::from(".voxchat.yml"));

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("voxchat");
            paths.push(config_dir.join("voxchat.yaml"));
            paths.push(config_dir.join("voxchat.yml"));
        }

        paths
    }
}
