//! 选区切分
//!
//! 把任意选区切分为以块级元素为边界的翻译单元，按文档顺序排列。

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tracing::debug;

use crate::parsers::html::dom::{ancestors, get_node_name, is_element, is_text, text_of};
use crate::parsers::html::range::{BoundaryPoint, DocumentRange};
use crate::parsers::html::utils::{is_blank, is_block_level, CONTAINED_BLOCK_TAGS};
use crate::translation::overlay::is_engine_owned;

/// 翻译单元：一段文档范围及其中的可见文本
///
/// 只被包装一次，之后由覆盖层保存全部状态。
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub anchor: DocumentRange,
    pub text: String,
}

impl TranslationUnit {
    /// 以范围当前的文本创建单元
    pub fn new(anchor: DocumentRange) -> Self {
        let text = anchor.text();
        Self { anchor, text }
    }

    pub fn char_count(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// 切分选区，结果至少包含一个单元
pub fn partition(range: &DocumentRange) -> Vec<TranslationUnit> {
    if !contains_block(range) {
        debug!("选区只包含行内内容，作为单个翻译单元");
        return vec![whole_range(range)];
    }

    let mut units = Vec::new();
    let mut run: Option<Run> = None;

    for leaf in range.intersecting_text_leaves() {
        let Some((from, to)) = range.leaf_slice(&leaf) else {
            continue;
        };

        if is_engine_owned(&leaf) {
            flush(&mut run, &mut units);
            continue;
        }

        let piece = text_of(&leaf)
            .map(|text| text[from..to].to_string())
            .unwrap_or_default();
        if is_blank(&piece) {
            continue;
        }

        let block = nearest_block(&leaf);
        match run.as_mut() {
            Some(current) if Rc::ptr_eq(&current.block, &block) => {
                current.last = leaf;
                current.to = to;
            }
            _ => {
                flush(&mut run, &mut units);
                run = Some(Run {
                    block,
                    first: leaf.clone(),
                    from,
                    last: leaf,
                    to,
                });
            }
        }
    }
    flush(&mut run, &mut units);

    if units.is_empty() {
        debug!("选区中没有可切分的文本，退回整个选区");
        return vec![whole_range(range)];
    }

    debug!("选区切分为 {} 个翻译单元", units.len());
    units
}

/// 同一块级祖先下的一段连续文本叶子
struct Run {
    block: Handle,
    first: Handle,
    from: usize,
    last: Handle,
    to: usize,
}

impl Run {
    fn into_unit(self) -> TranslationUnit {
        let anchor = DocumentRange {
            start: BoundaryPoint::new(self.first, self.from),
            end: BoundaryPoint::new(self.last, self.to),
        };
        TranslationUnit::new(anchor)
    }
}

fn flush(run: &mut Option<Run>, units: &mut Vec<TranslationUnit>) {
    if let Some(current) = run.take() {
        units.push(current.into_unit());
    }
}

/// 整个选区作为一个单元，文本保留首尾空白
fn whole_range(range: &DocumentRange) -> TranslationUnit {
    TranslationUnit::new(range.clone())
}

/// 选区是否跨越块级边界
///
/// 公共祖先元素包含块级后代，或者有多个块级子元素时视为跨越。
pub fn contains_block(range: &DocumentRange) -> bool {
    let Some(ancestor) = range.common_ancestor() else {
        return false;
    };
    if is_text(&ancestor) {
        return false;
    }

    let has_block_descendant = ancestor
        .children
        .borrow()
        .iter()
        .any(has_contained_block);
    if has_block_descendant {
        return true;
    }

    let block_children = ancestor
        .children
        .borrow()
        .iter()
        .filter(|child| is_block_level(child))
        .count();
    block_children > 1
}

fn has_contained_block(node: &Handle) -> bool {
    if !is_element(node) {
        return false;
    }
    let is_block_tag = get_node_name(node)
        .map(|name| CONTAINED_BLOCK_TAGS.contains(&name.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    is_block_tag || node.children.borrow().iter().any(has_contained_block)
}

/// 最近的块级祖先，找不到时使用最外层祖先
pub fn nearest_block(node: &Handle) -> Handle {
    let chain = ancestors(node);
    chain
        .iter()
        .find(|ancestor| is_block_level(ancestor))
        .or_else(|| chain.last())
        .cloned()
        .unwrap_or_else(|| node.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{find_nodes, html_to_dom, text_leaves};

    #[test]
    fn three_paragraphs_give_three_units() {
        let dom = html_to_dom(
            b"<div><p>First one.</p><p>Second <em>two</em>.</p><p>Third three.</p></div>",
            "utf-8",
        )
        .unwrap();
        let div = find_nodes(&dom.document, &["div"]).remove(0);
        let range = DocumentRange::select_node_contents(&div);

        let units = partition(&range);
        assert_eq!(units.len(), 3);
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, ["First one.", "Second two.", "Third three."]);
        assert_eq!(texts.concat(), range.text());
    }

    #[test]
    fn inline_selection_is_one_unit() {
        let dom = html_to_dom(b"<p>Some <b>bold</b> and <i>italic</i> words</p>", "utf-8").unwrap();
        let p = find_nodes(&dom.document, &["p"]).remove(0);
        let leaves = text_leaves(&p);
        let range = DocumentRange::new(leaves[0].clone(), 2, leaves[4].clone(), 3);

        let units = partition(&range);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "me bold and italic wo");
    }

    #[test]
    fn partial_paragraph_boundaries_are_kept() {
        let dom = html_to_dom(b"<div><p>alpha beta</p><p>gamma delta</p></div>", "utf-8").unwrap();
        let div = find_nodes(&dom.document, &["div"]).remove(0);
        let leaves = text_leaves(&div);
        let range = DocumentRange::new(leaves[0].clone(), 6, leaves[1].clone(), 5);

        let units = partition(&range);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "beta");
        assert_eq!(units[1].text, "gamma");
    }

    #[test]
    fn whitespace_between_blocks_is_skipped() {
        let dom = html_to_dom(b"<div>\n  <p>one</p>\n  <p>two</p>\n</div>", "utf-8").unwrap();
        let div = find_nodes(&dom.document, &["div"]).remove(0);
        let units = partition(&DocumentRange::select_node_contents(&div));
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
    }

    #[test]
    fn interleaved_blocks_do_not_overlap() {
        let dom = html_to_dom(b"<div>before<p>inside</p>after</div>", "utf-8").unwrap();
        let div = find_nodes(&dom.document, &["div"]).remove(0);
        let units = partition(&DocumentRange::select_node_contents(&div));
        let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, ["before", "inside", "after"]);
    }

    #[test]
    fn blank_selection_falls_back_to_whole_range() {
        let dom = html_to_dom(b"<div><p> </p><p>\n</p></div>", "utf-8").unwrap();
        let div = find_nodes(&dom.document, &["div"]).remove(0);
        let units = partition(&DocumentRange::select_node_contents(&div));
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, " \n");
        assert_eq!(units[0].char_count(), 0);
    }

    #[test]
    fn inline_selection_keeps_edge_whitespace() {
        let dom = html_to_dom(b"<p>Hello <b>world</b> again</p>", "utf-8").unwrap();
        let p = find_nodes(&dom.document, &["p"]).remove(0);
        let leaves = text_leaves(&p);
        let range = DocumentRange::new(leaves[0].clone(), 5, leaves[2].clone(), 1);

        let units = partition(&range);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, " world ");
    }
}
