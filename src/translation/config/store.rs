//! 设置存储接口
//!
//! 每次翻译请求都会重新读取设置，设置界面负责写入。

use std::sync::RwLock;

use super::manager::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// 设置存储
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> TranslationResult<TranslationConfig>;

    fn save(&self, config: &TranslationConfig) -> TranslationResult<()>;
}

/// 内存中的设置存储
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    config: RwLock<TranslationConfig>,
}

impl MemorySettingsStore {
    pub fn new(config: TranslationConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> TranslationResult<TranslationConfig> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| TranslationError::InvalidState("设置存储锁已损坏".to_string()))
    }

    fn save(&self, config: &TranslationConfig) -> TranslationResult<()> {
        config.validate()?;
        let mut guard = self
            .config
            .write()
            .map_err(|_| TranslationError::InvalidState("设置存储锁已损坏".to_string()))?;
        *guard = config.clone();
        Ok(())
    }
}
