//! 翻译配置管理模块
//!
//! 提供设置存储，支持配置文件、环境变量和默认值

pub mod manager;
pub mod store;

// 重新导出主要类型
pub use manager::{ConfigManager, ConfigOverrides, Provider, TranslationConfig};
pub use store::{MemorySettingsStore, SettingsStore};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 默认设置
    pub const DEFAULT_TARGET_LANGUAGE: &str = "Chinese";
    pub const DEFAULT_MODEL_NAME: &str = "llama3.2";
    pub const DEFAULT_LOCAL_ENDPOINT_URL: &str = "http://localhost:11434";
    pub const DEFAULT_CLOUD_MODEL: &str = "gpt-4o-mini";
    pub const DEFAULT_CLOUD_ENDPOINT_URL: &str = "https://api.openai.com/v1/chat/completions";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

    // 后端请求参数
    pub const TRANSLATION_TEMPERATURE: f32 = 0.3;
    pub const CLOUD_API_KEY_PREFIX: &str = "sk-";
    pub const CHECK_MAX_TOKENS: u32 = 5;
    pub const CHECK_REPLY_PREVIEW_CHARS: usize = 50;

    // 整页翻译时丢弃的短文本
    pub const MIN_PAGE_UNIT_CHARS: usize = 2;

    // 浮动按钮
    pub const CONTROL_ELEMENT_ID: &str = "inpage-translator-button";
    pub const HIDE_DELAY: Duration = Duration::from_secs(1);
    pub const CONTROL_OFFSET_PX: f64 = 5.0;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "inpage-translator.toml",
        ".inpage-translator.toml",
        "inpage-translator.json",
        "~/.config/inpage-translator/settings.toml",
        "/etc/inpage-translator/settings.toml",
    ];

    // 环境变量文件
    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}

/// 是否存在可用的配置文件
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}
