//! 翻译模块
//!
//! 采用清晰的模块化架构：
//! - **pipeline**: 把选区或整页切分为翻译单元
//! - **overlay**: 覆盖层的包装、切换、还原与移除
//! - **core**: 逐个翻译的调度器和页面翻译服务
//! - **backend**: 本地与云端翻译后端
//! - **config**: 设置存储
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use inpage_translator::translation::{
//!     BackendRouter, ConfigManager, SettingsStore, TranslationService,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings: Arc<dyn SettingsStore> = Arc::new(ConfigManager::new());
//! let backend = Arc::new(BackendRouter::new(settings.clone())?);
//!
//! let html = b"<html><body><p>Hello world</p></body></html>";
//! let service = TranslationService::from_html(html, "utf-8", backend, settings)?;
//! let report = service.translate_whole_page().await?;
//! println!("translated {} units", report.sequence.translated);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 翻译后端 - 本地模型服务与云端服务
pub mod backend;

/// 配置管理模块 - 设置存储、配置文件与常量
pub mod config;

/// 核心模块 - 调度器与页面翻译服务
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 覆盖层模块 - 替换原文显示译文的元素
pub mod overlay;

/// 切分模块 - 翻译单元的划分与整页收集
pub mod pipeline;

// ============================================================================
// 公共API重新导出
// ============================================================================

pub use backend::{
    check_connection, BackendRouter, CloudBackend, ConnectionReport, LocalBackend,
    TranslateRequest, TranslationBackend,
};
pub use config::{
    constants, ConfigManager, ConfigOverrides, MemorySettingsStore, Provider, SettingsStore,
    TranslationConfig,
};
pub use core::{
    PageReport, PendingUnit, SequenceReport, Sequencer, ServiceStats, ServiceStatsSnapshot,
    TranslationService,
};
pub use error::{ErrorCategory, ErrorSeverity, ErrorStats, TranslationError, TranslationResult};
pub use overlay::{wrap, DisplayState, OverlayNode, WrapStrategy};
pub use pipeline::{partition, CollectionStats, CollectorConfig, PageCollector, TranslationUnit};
