use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, str::FromStr};

pub const DEFAULT_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/api/v1";
pub const DEFAULT_MODEL: &str = "qwen-vl-plus";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            upstream: UpstreamConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            cors: CorsConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }
}

/// Read `name` and parse it, falling back to `default` when unset.
fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 3000)
                .map_err(|_| "PORT must be a valid port number".to_string())?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which upstream API flavour the gateway talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpstreamBackend {
    /// `POST {base_url}/chat/completions`, answers with completion choices
    #[default]
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    /// Native DashScope generation API, answers with a raw `output.text` field
    #[serde(rename = "dashscope")]
    DashScope,
}

impl UpstreamBackend {
    /// API root used when `QWEN_API_URL` is not set
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAiCompatible => DEFAULT_BASE_URL,
            Self::DashScope => DEFAULT_DASHSCOPE_BASE_URL,
        }
    }
}

impl FromStr for UpstreamBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai_compatible" | "openai-compatible" | "openai" => Ok(Self::OpenAiCompatible),
            "dashscope" => Ok(Self::DashScope),
            other => Err(format!("unknown upstream backend: {other}")),
        }
    }
}

/// Upstream inference configuration.
///
/// Model and generation parameters are fixed for the process lifetime; clients
/// cannot override them per request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Unset means the backend's default API root
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub backend: UpstreamBackend,
    pub model: String,
    pub max_tokens: i64,
    pub temperature: f64,
    pub top_p: f64,
    /// Sampling mode; when false the request asks for greedy decoding
    pub do_sample: bool,
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            backend: UpstreamBackend::default(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.8,
            do_sample: true,
            timeout_seconds: 60,
        }
    }
}

impl UpstreamConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            base_url: env::var("QWEN_API_URL").ok().filter(|url| !url.is_empty()),
            api_key: env::var("QWEN_API_KEY").ok().filter(|k| !k.is_empty()),
            backend: parse_env("QWEN_BACKEND", defaults.backend)?,
            model: env::var("QWEN_MODEL").unwrap_or(defaults.model),
            max_tokens: parse_env("QWEN_MAX_TOKENS", defaults.max_tokens)?,
            temperature: parse_env("QWEN_TEMPERATURE", defaults.temperature)?,
            top_p: parse_env("QWEN_TOP_P", defaults.top_p)?,
            do_sample: parse_env("QWEN_DO_SAMPLE", defaults.do_sample)?,
            timeout_seconds: parse_env("UPSTREAM_TIMEOUT_SECS", defaults.timeout_seconds)?,
        })
    }

    /// Configured API root without a trailing slash, else the backend default
    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.backend.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

/// Fixed-window request throttling per client address
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max_requests: 100,
        }
    }
}

impl RateLimitConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", defaults.window_secs)?,
            max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty means any origin is allowed
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        let allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { allowed_origins })
    }
}

/// Logging Configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl LoggingConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        let mut modules = HashMap::new();

        // Load module-specific log levels
        if let Ok(level) = env::var("LOG_MODULE_API") {
            modules.insert("api".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_INFERENCE_PROVIDERS") {
            modules.insert("inference_providers".to_string(), level);
        }

        Ok(Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            modules,
        })
    }

    /// Filter directive string understood by `tracing_subscriber::EnvFilter`
    pub fn filter_directives(&self) -> String {
        let mut filter = self.level.clone();
        let mut modules: Vec<_> = self.modules.iter().collect();
        modules.sort();
        for (module, level) in modules {
            filter.push_str(&format!(",{module}={level}"));
        }
        filter
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules: HashMap::new(),
        }
    }
}
