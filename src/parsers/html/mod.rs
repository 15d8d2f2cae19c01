//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（解析、查找、插入、拆分文本）
//! - `range`: 文档范围与边界点比较
//! - `serializer`: 文档与片段的序列化、片段解析
//! - `utils`: 块级判定、可见性与跳过规则

pub mod dom;
pub mod range;
pub mod serializer;
pub mod utils;

pub use dom::{
    find_nodes, get_body, get_charset, get_node_attr, get_node_name, get_parent_node, html_to_dom,
    is_attached, set_node_attr, text_content,
};
pub use range::{compare_points, BoundaryPoint, DocumentRange};
pub use serializer::{inner_html, parse_fragment_in, serialize_document};
pub use utils::{is_block_level, is_hidden, is_in_skipped_element, BLOCK_TAGS, SKIP_TAGS};
