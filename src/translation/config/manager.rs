//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::constants;
use super::store::SettingsStore;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// 本地模型服务（Ollama 兼容）
    #[default]
    #[serde(alias = "ollama")]
    Local,
    /// 云端服务（OpenAI 兼容）
    #[serde(alias = "openai")]
    Cloud,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Local => write!(f, "local"),
            Provider::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for Provider {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(Provider::Local),
            "cloud" | "openai" => Ok(Provider::Cloud),
            other => Err(TranslationError::ConfigError(format!(
                "未知的服务提供方 '{}'，可选: local, cloud",
                other
            ))),
        }
    }
}

/// 翻译设置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub provider: Provider,
    #[serde(alias = "targetLanguage")]
    pub target_language: String,
    #[serde(alias = "modelName")]
    pub model_name: String,
    #[serde(alias = "localEndpointUrl", alias = "ollamaUrl")]
    pub local_endpoint_url: String,
    #[serde(alias = "cloudApiKey", alias = "openaiApiKey")]
    pub cloud_api_key: String,
    #[serde(alias = "cloudModel", alias = "openaiModel")]
    pub cloud_model: String,
    #[serde(alias = "cloudEndpointUrl")]
    pub cloud_endpoint_url: String,
    #[serde(alias = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Local,
            target_language: constants::DEFAULT_TARGET_LANGUAGE.to_string(),
            model_name: constants::DEFAULT_MODEL_NAME.to_string(),
            local_endpoint_url: constants::DEFAULT_LOCAL_ENDPOINT_URL.to_string(),
            cloud_api_key: String::new(),
            cloud_model: constants::DEFAULT_CLOUD_MODEL.to_string(),
            cloud_endpoint_url: constants::DEFAULT_CLOUD_ENDPOINT_URL.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl TranslationConfig {
    /// 验证配置，规则与设置界面保存时一致
    pub fn validate(&self) -> TranslationResult<()> {
        if self.target_language.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslationError::ConfigError("请求超时必须大于0".to_string()));
        }

        match self.provider {
            Provider::Local => {
                if self.model_name.trim().is_empty() {
                    return Err(TranslationError::ConfigError(
                        "Please enter a model name".to_string(),
                    ));
                }
                if self.local_endpoint_url.trim().is_empty() {
                    return Err(TranslationError::ConfigError(
                        "Please enter the Ollama API URL".to_string(),
                    ));
                }
                validate_http_url(&self.local_endpoint_url)?;
            }
            Provider::Cloud => {
                let key = self.cloud_api_key.trim();
                if key.is_empty() {
                    return Err(TranslationError::ConfigError(
                        "Please enter your OpenAI API key".to_string(),
                    ));
                }
                if !key.starts_with(constants::CLOUD_API_KEY_PREFIX) {
                    return Err(TranslationError::ConfigError(
                        "Invalid API key format. It should start with \"sk-\"".to_string(),
                    ));
                }
                validate_http_url(&self.cloud_endpoint_url)?;
            }
        }

        Ok(())
    }

    /// 应用环境变量覆盖（只覆盖已设置的变量）
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{settings, EnvVar};

        if let Ok(provider) = settings::ProviderVar::get() {
            self.provider = provider;
        }

        if let Ok(target_language) = settings::TargetLanguage::get() {
            self.target_language = target_language;
        }

        if let Ok(model_name) = settings::ModelName::get() {
            self.model_name = model_name;
        }

        if let Ok(url) = settings::LocalEndpointUrl::get() {
            tracing::info!("环境变量覆盖本地服务地址: {}", url);
            self.local_endpoint_url = url;
        }

        if let Ok(api_key) = settings::CloudApiKey::get() {
            self.cloud_api_key = api_key;
        }

        if let Ok(cloud_model) = settings::CloudModel::get() {
            self.cloud_model = cloud_model;
        }

        if let Ok(url) = settings::CloudEndpointUrl::get() {
            tracing::info!("环境变量覆盖云端服务地址: {}", url);
            self.cloud_endpoint_url = url;
        }

        if let Ok(timeout) = settings::RequestTimeout::get() {
            self.request_timeout_secs = timeout.as_secs();
        }
    }

    /// 当前提供方使用的模型
    pub fn active_model(&self) -> &str {
        match self.provider {
            Provider::Local => &self.model_name,
            Provider::Cloud => &self.cloud_model,
        }
    }

    /// 当前提供方使用的服务地址
    pub fn active_endpoint(&self) -> &str {
        match self.provider {
            Provider::Local => &self.local_endpoint_url,
            Provider::Cloud => &self.cloud_endpoint_url,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn validate_http_url(raw: &str) -> TranslationResult<()> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(TranslationError::ConfigError(format!(
            "服务地址必须使用 http 或 https，当前为 {}",
            scheme
        ))),
    }
}

/// 命令行等外部来源的覆盖项，优先级高于文件和环境变量
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<Provider>,
    pub target_language: Option<String>,
    pub model_name: Option<String>,
    /// 作用于当前提供方的服务地址
    pub endpoint_url: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut TranslationConfig) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(target_language) = &self.target_language {
            config.target_language = target_language.clone();
        }
        if let Some(model_name) = &self.model_name {
            match config.provider {
                Provider::Local => config.model_name = model_name.clone(),
                Provider::Cloud => config.cloud_model = model_name.clone(),
            }
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            match config.provider {
                Provider::Local => config.local_endpoint_url = endpoint_url.clone(),
                Provider::Cloud => config.cloud_endpoint_url = endpoint_url.clone(),
            }
        }
    }
}

/// 基于文件的设置存储
///
/// 每次 `load` 都重新读取文件与环境变量，保存时写回 TOML。
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigManager {
    /// 按默认搜索路径查找配置文件
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定的配置文件
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).into_owned();
        Self {
            config_path: Some(PathBuf::from(expanded)),
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// 当前生效的配置文件路径
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }

        constants::CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).into_owned()))
            .find(|path| path.exists())
    }

    fn load_config(&self) -> TranslationResult<TranslationConfig> {
        Self::load_dotenv();

        match self.resolved_path() {
            Some(path) if path.exists() => {
                tracing::debug!("加载配置文件: {}", path.display());
                Self::load_from_file(&path)
            }
            Some(path) => {
                tracing::debug!("配置文件 {} 不存在，使用默认配置", path.display());
                Ok(TranslationConfig::default())
            }
            None => {
                tracing::debug!("未找到配置文件，使用默认配置");
                Ok(TranslationConfig::default())
            }
        }
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::debug!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: impl AsRef<Path>) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let body = toml::to_string_pretty(&config)?;

        let mut content = String::from("# inpage-translator settings\n#\n");
        for line in crate::env::generate_env_docs().lines() {
            content.push_str("# ");
            content.push_str(line);
            content.push('\n');
        }
        content.push('\n');
        content.push_str(&body);

        std::fs::write(path.as_ref(), content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

impl SettingsStore for ConfigManager {
    fn load(&self) -> TranslationResult<TranslationConfig> {
        let mut config = self.load_config()?;
        config.apply_env_overrides();
        self.overrides.apply(&mut config);
        Ok(config)
    }

    fn save(&self, config: &TranslationConfig) -> TranslationResult<()> {
        config.validate()?;

        let path = self
            .resolved_path()
            .unwrap_or_else(|| PathBuf::from(constants::CONFIG_PATHS[0]));
        let content = if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            serde_json::to_string_pretty(config)?
        } else {
            toml::to_string_pretty(config)?
        };

        std::fs::write(&path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;
        tracing::info!("设置已保存到 {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TranslationConfig::default();
        assert_eq!(config.provider, Provider::Local);
        assert_eq!(config.target_language, "Chinese");
        assert_eq!(config.model_name, "llama3.2");
        assert_eq!(config.local_endpoint_url, "http://localhost:11434");
        assert_eq!(config.cloud_api_key, "");
        assert_eq!(config.cloud_model, "gpt-4o-mini");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn camel_case_and_legacy_keys_are_accepted() {
        let json = r#"{
            "provider": "openai",
            "targetLanguage": "French",
            "openaiApiKey": "sk-test",
            "openaiModel": "gpt-4o"
        }"#;
        let config: TranslationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider, Provider::Cloud);
        assert_eq!(config.target_language, "French");
        assert_eq!(config.cloud_api_key, "sk-test");
        assert_eq!(config.cloud_model, "gpt-4o");
        // 未给出的键使用默认值
        assert_eq!(config.model_name, "llama3.2");
    }

    #[test]
    fn validation_follows_provider() {
        let mut config = TranslationConfig::default();
        config.model_name = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = TranslationConfig {
            provider: Provider::Cloud,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.cloud_api_key = "abc".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sk-"));
        config.cloud_api_key = "sk-abc".to_string();
        assert!(config.validate().is_ok());

        let config = TranslationConfig {
            local_endpoint_url: "ftp://host".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_target_active_provider() {
        let mut config = TranslationConfig::default();
        ConfigOverrides {
            provider: Some(Provider::Cloud),
            model_name: Some("gpt-4.1".to_string()),
            endpoint_url: Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.cloud_model, "gpt-4.1");
        assert_eq!(config.model_name, "llama3.2");
        assert_eq!(config.active_endpoint(), "http://127.0.0.1:9/v1/chat/completions");
    }

    #[test]
    fn provider_parsing() {
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Local);
        assert_eq!("Cloud".parse::<Provider>().unwrap(), Provider::Cloud);
        assert!("deepl".parse::<Provider>().is_err());
    }

    #[test]
    fn save_and_reload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let manager = ConfigManager::with_path(&path);

        let config = TranslationConfig {
            target_language: "Japanese".to_string(),
            ..Default::default()
        };
        manager.save(&config).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("target_language = \"Japanese\""));

        let loaded: TranslationConfig = toml::from_str(&content).unwrap();
        assert_eq!(loaded.target_language, "Japanese");
    }
}
