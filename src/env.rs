//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "INPAGE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }

    /// 配置文件路径
    pub struct ConfigPath;
    impl EnvVar<String> for ConfigPath {
        const NAME: &'static str = "INPAGE_CONFIG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of the settings file (TOML or JSON)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }
}

/// 翻译设置覆盖项，未设置时不覆盖配置文件
pub mod settings {
    use super::*;
    use crate::translation::config::Provider;

    /// 服务提供方
    pub struct ProviderVar;
    impl EnvVar<Provider> for ProviderVar {
        const NAME: &'static str = "INPAGE_PROVIDER";
        const DEFAULT: Option<Provider> = None;
        const DESCRIPTION: &'static str = "Translation provider: local (ollama) or cloud (openai)";

        fn parse(value: &str) -> EnvResult<Provider> {
            value.parse().map_err(|e| EnvError {
                variable: Self::NAME.to_string(),
                message: format!("{}", e),
            })
        }
    }

    /// 目标语言
    pub struct TargetLanguage;
    impl EnvVar<String> for TargetLanguage {
        const NAME: &'static str = "INPAGE_TARGET_LANGUAGE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language name, e.g. Chinese";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// 本地模型名称
    pub struct ModelName;
    impl EnvVar<String> for ModelName {
        const NAME: &'static str = "INPAGE_MODEL_NAME";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Model used by the local provider";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// 本地服务地址
    pub struct LocalEndpointUrl;
    impl EnvVar<String> for LocalEndpointUrl {
        const NAME: &'static str = "INPAGE_LOCAL_ENDPOINT_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Base URL of the local model server";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 云端 API 密钥
    pub struct CloudApiKey;
    impl EnvVar<String> for CloudApiKey {
        const NAME: &'static str = "INPAGE_CLOUD_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "API key of the cloud provider";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// 云端模型名称
    pub struct CloudModel;
    impl EnvVar<String> for CloudModel {
        const NAME: &'static str = "INPAGE_CLOUD_MODEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Model used by the cloud provider";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(value, Self::NAME)
        }
    }

    /// 云端服务地址
    pub struct CloudEndpointUrl;
    impl EnvVar<String> for CloudEndpointUrl {
        const NAME: &'static str = "INPAGE_CLOUD_ENDPOINT_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Chat completions URL of the cloud provider";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "INPAGE_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Backend request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }

            if seconds > 600 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout too long (max 600 seconds)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }
}

/// 辅助函数
fn parse_non_empty(value: &str, var_name: &str) -> EnvResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Value must not be empty".to_string(),
        });
    }
    Ok(value.to_string())
}

fn parse_http_url(value: &str, var_name: &str) -> EnvResult<String> {
    let url = value.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: "URL must start with http:// or https://".to_string(),
        })
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("Environment variables\n\n");

    let entries: &[(&str, &str)] = &[
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (core::NoColor::NAME, core::NoColor::DESCRIPTION),
        (core::ConfigPath::NAME, core::ConfigPath::DESCRIPTION),
        (settings::ProviderVar::NAME, settings::ProviderVar::DESCRIPTION),
        (settings::TargetLanguage::NAME, settings::TargetLanguage::DESCRIPTION),
        (settings::ModelName::NAME, settings::ModelName::DESCRIPTION),
        (settings::LocalEndpointUrl::NAME, settings::LocalEndpointUrl::DESCRIPTION),
        (settings::CloudApiKey::NAME, settings::CloudApiKey::DESCRIPTION),
        (settings::CloudModel::NAME, settings::CloudModel::DESCRIPTION),
        (settings::CloudEndpointUrl::NAME, settings::CloudEndpointUrl::DESCRIPTION),
        (settings::RequestTimeout::NAME, settings::RequestTimeout::DESCRIPTION),
    ];

    for (name, description) in entries {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::config::Provider;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert!(core::LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!(settings::ProviderVar::parse("ollama").unwrap(), Provider::Local);
        assert_eq!(settings::ProviderVar::parse("openai").unwrap(), Provider::Cloud);
        assert!(settings::ProviderVar::parse("deepl").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(settings::LocalEndpointUrl::parse("http://localhost:11434").is_ok());
        assert!(settings::CloudEndpointUrl::parse("https://api.example.com/v1").is_ok());
        assert!(settings::LocalEndpointUrl::parse("localhost:11434").is_err());
    }

    #[test]
    fn test_timeout_validation() {
        assert_eq!(
            settings::RequestTimeout::parse("30").unwrap(),
            Duration::from_secs(30)
        );
        assert!(settings::RequestTimeout::parse("0").is_err());
        assert!(settings::RequestTimeout::parse("soon").is_err());
    }

    #[test]
    fn test_docs_list_every_variable() {
        let docs = generate_env_docs();
        assert!(docs.contains("INPAGE_PROVIDER"));
        assert!(docs.contains("INPAGE_CLOUD_API_KEY"));
        assert!(docs.contains("NO_COLOR"));
    }
}
