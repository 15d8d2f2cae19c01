use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::translation::error::TranslationResult;

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> TranslationResult<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())?;

    Ok(dom)
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    let matches = get_node_name(node) == Some(*node_name);

    if matches && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    let next = if matches && !rest.is_empty() {
        rest
    } else {
        node_names
    };

    for child_node in node.children.borrow().iter() {
        found_nodes.append(&mut find_nodes(child_node, next));
    }

    found_nodes
}

/// 获取文档的 body 元素
pub fn get_body(document: &Handle) -> Option<Handle> {
    find_nodes(document, &["html", "body"]).into_iter().next()
}

/// 获取文档声明的字符编码
///
/// 支持 `<meta charset>` 和 `<meta http-equiv="content-type">` 两种写法。
pub fn get_charset(document: &Handle) -> Option<String> {
    for meta in find_nodes(document, &["html", "head", "meta"]) {
        if let Some(charset) = get_node_attr(&meta, "charset") {
            return Some(charset);
        }

        let is_content_type = get_node_attr(&meta, "http-equiv")
            .is_some_and(|value| value.eq_ignore_ascii_case("content-type"));
        if !is_content_type {
            continue;
        }
        if let Some(content) = get_node_attr(&meta, "content") {
            let charset = content.split(';').skip(1).find_map(|param| {
                let (key, value) = param.trim().split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches('"').to_string())
            });
            return charset;
        }
    }

    None
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 设置节点属性，`None` 表示删除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<&str>) {
    let NodeData::Element { attrs, .. } = &node.data else {
        return;
    };
    let mut attrs = attrs.borrow_mut();

    match attr_value {
        Some(value) => {
            if let Some(existing) = attrs.iter_mut().find(|a| &*a.name.local == attr_name) {
                existing.value = StrTendril::from_slice(value);
            } else {
                attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: StrTendril::from_slice(value),
                });
            }
        }
        None => attrs.retain(|a| &*a.name.local != attr_name),
    }
}

/// 检查元素的 class 属性是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// 获取文本节点内容，非文本节点返回 None
pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 递归拼接节点内的全部文本
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// 按文档顺序收集所有文本叶子节点
pub fn text_leaves(root: &Handle) -> Vec<Handle> {
    let mut leaves = Vec::new();
    collect_text_leaves(root, &mut leaves);
    leaves
}

fn collect_text_leaves(node: &Handle, leaves: &mut Vec<Handle>) {
    if is_text(node) {
        leaves.push(node.clone());
        return;
    }
    for child in node.children.borrow().iter() {
        collect_text_leaves(child, leaves);
    }
}

/// 获取父节点
///
/// rcdom 把父指针存放在 `Cell` 中，读取时必须放回原值。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    child.parent.set(weak);
    parent
}

/// 由近到远列出所有祖先节点
pub fn ancestors(node: &Handle) -> Vec<Handle> {
    let mut chain = Vec::new();
    let mut current = get_parent_node(node);
    while let Some(parent) = current {
        current = get_parent_node(&parent);
        chain.push(parent);
    }
    chain
}

/// 节点在父节点中的位置
pub fn child_index(child: &Handle) -> Option<usize> {
    let parent = get_parent_node(child)?;
    let index = parent
        .children
        .borrow()
        .iter()
        .position(|c| Rc::ptr_eq(c, child));
    index
}

pub fn next_sibling(node: &Handle) -> Option<Handle> {
    let parent = get_parent_node(node)?;
    let index = child_index(node)?;
    let sibling = parent.children.borrow().get(index + 1).cloned();
    sibling
}

/// 节点是否仍挂在某个文档上
pub fn is_attached(node: &Handle) -> bool {
    let mut current = node.clone();
    loop {
        if matches!(current.data, NodeData::Document) {
            return true;
        }
        match get_parent_node(&current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

/// DOM Range 意义上的节点长度：文本为字节数，其余为子节点数
pub fn node_length(node: &Handle) -> usize {
    match &node.data {
        NodeData::Text { contents } => contents.borrow().len(),
        _ => node.children.borrow().len(),
    }
}

/// 从父节点上摘下节点
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, node));
    }
    node.parent.set(None);
}

/// 在指定位置插入子节点，子节点会先从原位置摘下
pub fn insert_child(parent: &Handle, index: usize, child: &Handle) {
    detach(child);
    let mut children = parent.children.borrow_mut();
    let index = index.min(children.len());
    children.insert(index, child.clone());
    child.parent.set(Some(Rc::downgrade(parent)));
}

pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    parent.children.borrow_mut().push(child.clone());
    child.parent.set(Some(Rc::downgrade(parent)));
}

/// 用一组节点替换指定节点，返回是否成功
pub fn replace_with(old: &Handle, replacements: &[Handle]) -> bool {
    let (Some(parent), Some(index)) = (get_parent_node(old), child_index(old)) else {
        return false;
    };
    detach(old);
    for (offset, node) in replacements.iter().enumerate() {
        insert_child(&parent, index + offset, node);
    }
    true
}

/// 摘下节点的所有子节点并按顺序返回
pub fn take_children(node: &Handle) -> Vec<Handle> {
    let children: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in &children {
        child.parent.set(None);
    }
    children
}

/// 创建 HTML 命名空间下的元素
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: StrTendril::from_slice(value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// 复制元素本身（名称与属性），不复制子节点
pub fn shallow_clone(node: &Handle) -> Option<Handle> {
    match &node.data {
        NodeData::Element {
            name,
            attrs,
            mathml_annotation_xml_integration_point,
            ..
        } => Some(Node::new(NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        })),
        _ => None,
    }
}

/// 在字节偏移处拆分文本节点，返回插入在其后的尾部节点
pub fn split_text(node: &Handle, offset: usize) -> Option<Handle> {
    let NodeData::Text { contents } = &node.data else {
        return None;
    };
    let parent = get_parent_node(node)?;
    let index = child_index(node)?;

    let text = contents.borrow().to_string();
    let offset = clamp_to_char_boundary(&text, offset);
    let (head, tail) = text.split_at(offset);

    *contents.borrow_mut() = StrTendril::from_slice(head);
    let tail_node = create_text(tail);
    insert_child(&parent, index + 1, &tail_node);

    Some(tail_node)
}

/// 合并相邻文本节点并删除空文本节点
pub fn normalize_text_children(parent: &Handle) {
    let mut children = parent.children.borrow_mut();
    let mut merged: Vec<Handle> = Vec::with_capacity(children.len());

    for child in children.drain(..) {
        if let NodeData::Text { contents } = &child.data {
            if contents.borrow().is_empty() {
                child.parent.set(None);
                continue;
            }
            if let Some(NodeData::Text {
                contents: prev_contents,
            }) = merged.last().map(|prev| &prev.data)
            {
                prev_contents.borrow_mut().push_tendril(&contents.borrow());
                child.parent.set(None);
                continue;
            }
        }
        merged.push(child);
    }

    *children = merged;
}

/// 把字节偏移向下取整到最近的字符边界
pub fn clamp_to_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::serializer::inner_html;

    fn dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    #[test]
    fn parent_lookup_keeps_pointer() {
        let dom = dom("<p>hello</p>");
        let p = find_nodes(&dom.document, &["html", "body", "p"]).remove(0);
        let text = p.children.borrow()[0].clone();

        assert!(get_parent_node(&text).is_some());
        assert!(get_parent_node(&text).is_some(), "second lookup must still work");
        assert!(is_attached(&text));
    }

    #[test]
    fn split_and_normalize_round_trip() {
        let dom = dom("<p>hello world</p>");
        let p = find_nodes(&dom.document, &["html", "body", "p"]).remove(0);
        let text = p.children.borrow()[0].clone();

        let tail = split_text(&text, 6).unwrap();
        assert_eq!(text_of(&text).unwrap(), "hello ");
        assert_eq!(text_of(&tail).unwrap(), "world");
        assert_eq!(p.children.borrow().len(), 2);

        normalize_text_children(&p);
        assert_eq!(p.children.borrow().len(), 1);
        assert_eq!(inner_html(&p).unwrap(), "hello world");
    }

    #[test]
    fn split_text_respects_char_boundaries() {
        let dom = dom("<p>你好世界</p>");
        let p = find_nodes(&dom.document, &["html", "body", "p"]).remove(0);
        let text = p.children.borrow()[0].clone();

        // 偏移 4 落在第二个汉字中间，应回退到 3
        let tail = split_text(&text, 4).unwrap();
        assert_eq!(text_of(&text).unwrap(), "你");
        assert_eq!(text_of(&tail).unwrap(), "好世界");
    }

    #[test]
    fn detached_nodes_are_not_attached() {
        let dom = dom("<div><span>x</span></div>");
        let span = find_nodes(&dom.document, &["html", "body", "div", "span"]).remove(0);
        detach(&span);
        assert!(!is_attached(&span));
        assert!(get_parent_node(&span).is_none());
    }

    #[test]
    fn set_and_remove_attributes() {
        let el = create_element("span", &[("class", "a")]);
        set_node_attr(&el, "data-x", Some("1"));
        set_node_attr(&el, "class", Some("b"));
        assert_eq!(get_node_attr(&el, "data-x").as_deref(), Some("1"));
        assert!(has_class(&el, "b"));
        set_node_attr(&el, "data-x", None);
        assert!(get_node_attr(&el, "data-x").is_none());
    }

    #[test]
    fn charset_from_meta() {
        let meta = dom("<html><head><meta charset=\"windows-1252\"></head><body></body></html>");
        assert_eq!(get_charset(&meta.document).as_deref(), Some("windows-1252"));

        let http_equiv = dom(
            r#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=gbk"></head></html>"#,
        );
        assert_eq!(get_charset(&http_equiv.document).as_deref(), Some("gbk"));

        let plain = dom("<p>plain</p>");
        assert!(get_charset(&plain.document).is_none());
    }
}
