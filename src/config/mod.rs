use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::reference::RefStyle;
use crate::utils::{RefbotError, RefbotResult};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub openreview: OpenReviewConfig,
    pub deepseek: DeepSeekConfig,
    pub fetcher: FetcherConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenReviewConfig {
    pub api_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeepSeekConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: String,
    pub token_budget: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    pub request_delay_ms: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/settings.toml");

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openreview: OpenReviewConfig {
                api_url: "https://api2.openreview.net".to_string(),
                user_agent: "refbot/0.1 (academic research)".to_string(),
            },
            deepseek: DeepSeekConfig {
                api_url: "https://api.deepseek.com/chat/completions".to_string(),
                model: "deepseek-chat".to_string(),
                api_key: String::new(),
                // DeepSeek 上限 65536，留足提示开销
                token_budget: 55_000,
            },
            fetcher: FetcherConfig {
                request_delay_ms: 1000,
            },
        }
    }
}

impl DeepSeekConfig {
    /// API key 优先级：命令行参数 > DEEPSEEK_API_KEY 环境变量 > 配置文件
    pub fn resolve_api_key(&self, cli_key: Option<String>) -> Option<String> {
        cli_key
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok().filter(|k| !k.is_empty()))
            .or_else(|| {
                if self.api_key.is_empty() {
                    None
                } else {
                    Some(self.api_key.clone())
                }
            })
    }
}

/// OpenReview 登录凭证，只从环境变量读取
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> RefbotResult<Self> {
        let username = std::env::var("OPENREVIEW_USERNAME").ok().filter(|v| !v.is_empty());
        let password = std::env::var("OPENREVIEW_PASSWORD").ok().filter(|v| !v.is_empty());

        match (username, password) {
            (Some(username), Some(password)) => Ok(Self { username, password }),
            _ => Err(RefbotError::ConfigError(
                "请设置 OPENREVIEW_USERNAME 与 OPENREVIEW_PASSWORD 环境变量".to_string(),
            )),
        }
    }
}

/// 单次运行的上下文，由命令行参数构造一次，之后只读
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_dir: PathBuf,
    pub style: RefStyle,
    pub max: Option<usize>,
    pub include_submitted: bool,
}

impl RunContext {
    pub fn new(
        out: PathBuf,
        run_name: Option<String>,
        style: RefStyle,
        max: Option<usize>,
        include_submitted: bool,
    ) -> Self {
        let run_dir = match run_name {
            Some(name) => out.join(name),
            None => out,
        };
        Self {
            run_dir,
            style,
            max,
            include_submitted,
        }
    }
}
