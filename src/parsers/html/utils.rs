use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use super::dom::{get_node_attr, get_node_name, get_parent_node, is_element};

/// 按标签名即视为块级的元素
pub const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "td", "th",
    "article", "section", "body",
];

/// 判断选区是否包含块级元素时使用的标签集合
pub const CONTAINED_BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "article",
    "section",
];

/// 默认样式下 display 为 block 的元素
const UA_BLOCK_TAGS: &[&str] = &[
    "html", "body", "address", "aside", "dd", "details", "dialog", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "header", "hgroup", "hr", "main", "menu", "nav",
    "ol", "ul", "summary", "legend", "center",
];

/// 默认样式下不渲染的元素
const UA_HIDDEN_TAGS: &[&str] = &[
    "head", "script", "style", "template", "title", "meta", "link", "base", "noscript",
];

/// 内容不参与翻译的元素
pub const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "textarea", "input", "code", "pre",
];

fn display_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|;)\s*display\s*:\s*([^;!]+)").expect("valid display pattern")
    })
}

fn visibility_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|;)\s*visibility\s*:\s*([^;!]+)").expect("valid visibility pattern")
    })
}

/// 从内联样式中读取属性值（取最后一个声明）
fn inline_style_value(node: &Handle, re: &Regex) -> Option<String> {
    let style = get_node_attr(node, "style")?.to_ascii_lowercase();
    re.captures_iter(&style)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// 计算元素的 display 值
///
/// 依次考虑内联样式、`hidden` 属性和默认样式，非元素节点返回 `None`。
pub fn computed_display(node: &Handle) -> Option<String> {
    let name = get_node_name(node)?.to_ascii_lowercase();

    if let Some(value) = inline_style_value(node, display_re()) {
        return Some(value);
    }
    if get_node_attr(node, "hidden").is_some() {
        return Some("none".to_string());
    }

    let display = match name.as_str() {
        n if UA_HIDDEN_TAGS.contains(&n) => "none",
        "li" => "list-item",
        "table" => "table",
        "tr" => "table-row",
        "td" | "th" => "table-cell",
        "thead" => "table-header-group",
        "tbody" => "table-row-group",
        "tfoot" => "table-footer-group",
        n if BLOCK_TAGS.contains(&n) || UA_BLOCK_TAGS.contains(&n) => "block",
        _ => "inline",
    };
    Some(display.to_string())
}

/// 块级判定：标签在块级集合中，或计算后的 display 为 block
pub fn is_block_level(node: &Handle) -> bool {
    let Some(name) = get_node_name(node) else {
        return false;
    };
    if BLOCK_TAGS.contains(&name.to_ascii_lowercase().as_str()) {
        return true;
    }
    computed_display(node).as_deref() == Some("block")
}

/// 拆分该元素会破坏文档结构的元素（块级、表格和列表结构）
pub fn is_structural(node: &Handle) -> bool {
    if is_block_level(node) {
        return true;
    }
    match get_node_name(node).map(|n| n.to_ascii_lowercase()) {
        Some(name) => matches!(
            name.as_str(),
            "table" | "thead" | "tbody" | "tfoot" | "tr" | "td" | "th" | "ul" | "ol" | "li"
                | "dl" | "html" | "head"
        ),
        None => false,
    }
}

/// 节点是否不可见：任一祖先（含自身）display 为 none，
/// 或最近的 visibility 声明为 hidden/collapse
pub fn is_hidden(node: &Handle) -> bool {
    let mut visibility_decided = false;
    let mut current = Some(node.clone());

    while let Some(n) = current {
        if is_element(&n) {
            if computed_display(&n).as_deref() == Some("none") {
                return true;
            }
            if !visibility_decided {
                if let Some(visibility) = inline_style_value(&n, visibility_re()) {
                    if visibility == "hidden" || visibility == "collapse" {
                        return true;
                    }
                    visibility_decided = true;
                }
            }
        }
        current = get_parent_node(&n);
    }

    false
}

/// 节点是否位于不参与翻译的元素内
pub fn is_in_skipped_element(node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if let Some(name) = get_node_name(&n) {
            if SKIP_TAGS.contains(&name.to_ascii_lowercase().as_str()) {
                return true;
            }
        }
        current = get_parent_node(&n);
    }
    false
}

/// 文本是否只含空白（含不换行空格）
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
