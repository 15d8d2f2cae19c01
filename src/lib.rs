//! # Inpage Translator Library
//!
//! 在页面内原地翻译选区或整页文本：译文替换原文显示，并可随时切回原文或恢复原始结构。
//!
//! ## 模块组织
//!
//! - `core` - 命令行使用的整页处理流程
//! - `env` - 类型化的环境变量
//! - `interaction` - 浮动按钮与交互状态机
//! - `messaging` - 宿主消息与响应
//! - `parsers` - HTML 文档模型、范围与序列化
//! - `translation` - 切分、覆盖层、调度、后端与设置

pub mod core;
pub mod env;
pub mod interaction;
pub mod messaging;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use core::{PageOptions, PageProcessor};
pub use interaction::{InteractionController, Rect};
pub use messaging::{handle_message, Message, Response};
pub use parsers::{html_to_dom, serialize_document, DocumentRange};
pub use translation::{
    BackendRouter, DisplayState, OverlayNode, TranslationBackend, TranslationError,
    TranslationResult, TranslationService,
};
