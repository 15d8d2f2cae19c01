//! 逻辑元素状态表
//!
//! 记录选区翻译时公共祖先元素是否已持有译文。以元素身份为键，
//! 只保存弱引用。元素脱离文档，或记录的覆盖层全部被移除后，
//! 由 [`ElementStateTable::prune`] 清除。

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

use crate::parsers::html::dom::is_attached;
use crate::translation::overlay::OverlayNode;

/// 单个元素的翻译记录
#[derive(Debug, Clone, Default)]
pub struct ElementState {
    pub is_translated: bool,
    pub translated_spans: Vec<OverlayNode>,
}

struct Entry {
    element: Weak<Node>,
    state: ElementState,
}

/// 元素到翻译记录的映射，每个元素最多一条
#[derive(Default)]
pub struct ElementStateTable {
    entries: HashMap<usize, Entry>,
}

fn key_of(element: &Handle) -> usize {
    Rc::as_ptr(element) as usize
}

impl ElementStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, element: &Handle) -> Option<&ElementState> {
        self.entries.get(&key_of(element)).map(|entry| &entry.state)
    }

    /// 该元素是否有已翻译记录
    pub fn is_translated(&self, element: &Handle) -> bool {
        self.get(element)
            .map(|state| state.is_translated)
            .unwrap_or(false)
    }

    /// 写入记录，覆盖已有记录
    pub fn insert(&mut self, element: &Handle, state: ElementState) {
        self.entries.insert(
            key_of(element),
            Entry {
                element: Rc::downgrade(element),
                state,
            },
        );
    }

    pub fn remove(&mut self, element: &Handle) -> Option<ElementState> {
        self.entries
            .remove(&key_of(element))
            .map(|entry| entry.state)
    }

    /// 删除失效的记录，返回删除数量
    ///
    /// 记录中已脱离文档的覆盖层被丢弃；原本有覆盖层、现在一个不剩的记录
    /// 与元素已脱离文档的记录一起删除。
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let element_alive = entry
                .element
                .upgrade()
                .map(|element| is_attached(&element))
                .unwrap_or(false);
            if !element_alive {
                return false;
            }

            let spans = &mut entry.state.translated_spans;
            let had_spans = !spans.is_empty();
            spans.retain(|overlay| overlay.is_attached());
            !(had_spans && spans.is_empty())
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{detach, find_nodes, html_to_dom};
    use crate::parsers::html::DocumentRange;
    use crate::translation::overlay::wrap;
    use crate::translation::pipeline::TranslationUnit;

    #[test]
    fn records_follow_element_lifecycle() {
        let dom = html_to_dom(b"<div><p>a</p><p>b</p></div>", "utf-8").unwrap();
        let ps = find_nodes(&dom.document, &["p"]);
        let mut table = ElementStateTable::new();

        table.insert(
            &ps[0],
            ElementState {
                is_translated: true,
                translated_spans: Vec::new(),
            },
        );
        table.insert(&ps[1], ElementState::default());
        assert!(table.is_translated(&ps[0]));
        assert!(!table.is_translated(&ps[1]));
        assert_eq!(table.prune(), 0);

        detach(&ps[0]);
        assert_eq!(table.prune(), 1);
        assert!(table.get(&ps[0]).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn records_without_live_overlays_are_dropped() {
        let dom = html_to_dom(b"<div><p>one</p><p>two</p></div>", "utf-8").unwrap();
        let div = find_nodes(&dom.document, &["div"]).remove(0);
        let ps = find_nodes(&div, &["p"]);
        let overlays: Vec<OverlayNode> = ps
            .iter()
            .map(|p| wrap(TranslationUnit::new(DocumentRange::select_node_contents(p))).unwrap())
            .collect();

        let mut table = ElementStateTable::new();
        table.insert(
            &div,
            ElementState {
                is_translated: true,
                translated_spans: overlays.clone(),
            },
        );

        overlays[0].clone().revert().unwrap();
        assert_eq!(table.prune(), 0);
        assert_eq!(table.get(&div).unwrap().translated_spans.len(), 1);

        overlays[1].clone().revert().unwrap();
        assert_eq!(table.prune(), 1);
        assert!(!table.is_translated(&div));
    }
}
