//! # 解析器模块
//!
//! 基于 html5ever/rcdom 的文档模型：
//!
//! - HTML 文档解析与序列化
//! - DOM 节点的查找、插入、拆分与合并
//! - 文档范围（起止边界点）及其文本
//! - 块级、可见性判定

pub mod html;

pub use html::{html_to_dom, serialize_document, DocumentRange};
