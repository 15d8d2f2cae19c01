//! 翻译覆盖层
//!
//! 覆盖层是替换翻译单元原始内容的 `<span>` 元素，状态全部保存在属性上：
//!
//! - `class`: 翻译中 / 已翻译
//! - `data-original-text`: 原始文本
//! - `data-original-html`: 原始结构（创建时写入一次）
//! - `data-translated-text`: 译文
//! - `data-showing`: 当前显示译文还是原文
//!
//! `Extract` 拆分出的两半行内元素带有相同的 `data-inpage-translator-split`
//! 标记，恢复原文时据此合并回一个元素。

pub mod node;
pub mod wrap;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::{get_node_attr, get_parent_node, has_class};
use crate::translation::config::constants::CONTROL_ELEMENT_ID;

pub use node::{DisplayState, OverlayNode};
pub use wrap::{wrap, WrapStrategy};

pub const OVERLAY_TAG: &str = "span";
pub const CLASS_TRANSLATING: &str = "inpage-translator-translating";
pub const CLASS_TRANSLATED: &str = "inpage-translator-translated";

pub(crate) const ATTR_ORIGINAL_TEXT: &str = "data-original-text";
pub(crate) const ATTR_ORIGINAL_HTML: &str = "data-original-html";
pub(crate) const ATTR_TRANSLATED_TEXT: &str = "data-translated-text";
pub(crate) const ATTR_SHOWING: &str = "data-showing";
pub(crate) const ATTR_SPLIT: &str = "data-inpage-translator-split";

/// 元素本身是否为覆盖层
pub fn is_overlay_element(node: &Handle) -> bool {
    has_class(node, CLASS_TRANSLATING) || has_class(node, CLASS_TRANSLATED)
}

/// 包含该节点的最近覆盖层（含自身）
pub fn enclosing_overlay(node: &Handle) -> Option<OverlayNode> {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if is_overlay_element(&n) {
            return OverlayNode::from_element(n);
        }
        current = get_parent_node(&n);
    }
    None
}

/// 节点是否位于浮动按钮内
pub fn is_inside_control(node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if get_node_attr(&n, "id").as_deref() == Some(CONTROL_ELEMENT_ID) {
            return true;
        }
        current = get_parent_node(&n);
    }
    false
}

/// 节点是否属于引擎自己插入的内容
pub fn is_engine_owned(node: &Handle) -> bool {
    enclosing_overlay(node).is_some() || is_inside_control(node)
}

/// 按文档顺序列出所有覆盖层（含嵌套）
pub fn find_overlays(root: &Handle) -> Vec<OverlayNode> {
    let mut found = Vec::new();
    collect_overlays(root, &mut found);
    found
}

/// 按文档顺序列出所有已翻译覆盖层
pub fn find_translated(root: &Handle) -> Vec<OverlayNode> {
    find_overlays(root)
        .into_iter()
        .filter(|overlay| has_class(overlay.element(), CLASS_TRANSLATED))
        .collect()
}

fn collect_overlays(node: &Handle, found: &mut Vec<OverlayNode>) {
    if is_overlay_element(node) {
        if let Some(overlay) = OverlayNode::from_element(node.clone()) {
            found.push(overlay);
        }
    }
    for child in node.children.borrow().iter() {
        collect_overlays(child, found);
    }
}
