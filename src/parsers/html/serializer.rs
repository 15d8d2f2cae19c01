use encoding_rs::Encoding;
use html5ever::interface::QualName;
use html5ever::parse_fragment;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::translation::error::TranslationResult;

use super::dom::{get_node_name, take_children};

/// 序列化文档，并按文档编码重新编码
pub fn serialize_document(dom: &RcDom, document_encoding: &str) -> TranslationResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    Ok(buf)
}

/// 序列化节点的子节点，相当于浏览器中的 `innerHTML`
pub fn inner_html(node: &Handle) -> TranslationResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut buf, &serializable, opts)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 以指定元素为上下文解析 HTML 片段，返回游离的顶层节点
///
/// 上下文元素决定了解析规则，例如在 `tr` 中解析 `td`。
/// 没有合适的上下文时使用 `body`。
pub fn parse_fragment_in(context: Option<&Handle>, markup: &str) -> Vec<Handle> {
    let context_name = context
        .and_then(fragment_context)
        .unwrap_or_else(|| QualName::new(None, ns!(html), LocalName::from("body")));

    let dom = parse_fragment(RcDom::default(), Default::default(), context_name, vec![])
        .one(StrTendril::from_slice(markup));

    // 片段解析结果为 document -> html -> 片段节点
    let root = dom.document.children.borrow().first().cloned();
    match root {
        Some(root) => take_children(&root),
        None => Vec::new(),
    }
}

fn fragment_context(node: &Handle) -> Option<QualName> {
    match &node.data {
        NodeData::Element { name, .. } if name.ns == ns!(html) => {
            match get_node_name(node) {
                Some("html") | Some("head") | Some("template") => None,
                _ => Some(name.clone()),
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{create_element, html_to_dom, text_content};

    #[test]
    fn inner_html_skips_the_element_itself() {
        let dom = html_to_dom(b"<p>a <b>b</b> &amp; c</p>", "utf-8").unwrap();
        let p = crate::parsers::html::dom::find_nodes(&dom.document, &["html", "body", "p"])
            .remove(0);
        assert_eq!(inner_html(&p).unwrap(), "a <b>b</b> &amp; c");
    }

    #[test]
    fn fragment_uses_context_element() {
        let tr = create_element("tr", &[]);
        let nodes = parse_fragment_in(Some(&tr), "<td>one</td><td>two</td>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(get_node_name(&nodes[0]), Some("td"));
        assert_eq!(text_content(&nodes[1]), "two");
    }

    #[test]
    fn fragment_without_context_parses_as_body() {
        let nodes = parse_fragment_in(None, "x <i>y</i>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(get_node_name(&nodes[1]), Some("i"));
    }

    #[test]
    fn document_round_trip_keeps_encoding() {
        let html = "<html><head></head><body><p>héllo</p></body></html>";
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let out = serialize_document(&dom, "utf-8").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), html);
    }
}
