//! 文档范围
//!
//! 与浏览器中的 `Range` 语义一致：边界点由容器节点与偏移组成，
//! 文本容器的偏移为字节偏移，元素容器的偏移为子节点下标。

use std::cmp::Ordering;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::dom::{
    child_index, clamp_to_char_boundary, get_parent_node, is_text, node_length, text_leaves,
    text_of,
};

/// 范围边界点
#[derive(Clone, Debug)]
pub struct BoundaryPoint {
    pub node: Handle,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: Handle, offset: usize) -> Self {
        let offset = match text_of(&node) {
            Some(text) => clamp_to_char_boundary(&text, offset),
            None => offset.min(node_length(&node)),
        };
        Self { node, offset }
    }
}

/// 由起止边界点确定的连续文档区间
#[derive(Clone, Debug)]
pub struct DocumentRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl DocumentRange {
    pub fn new(start_node: Handle, start_offset: usize, end_node: Handle, end_offset: usize) -> Self {
        Self {
            start: BoundaryPoint::new(start_node, start_offset),
            end: BoundaryPoint::new(end_node, end_offset),
        }
    }

    /// 覆盖节点全部内容的范围
    pub fn select_node_contents(node: &Handle) -> Self {
        Self::new(node.clone(), 0, node.clone(), node_length(node))
    }

    /// 从第一个文本叶子开头到最后一个文本叶子末尾
    pub fn around_text_leaves(first: &Handle, last: &Handle) -> Self {
        Self::new(first.clone(), 0, last.clone(), node_length(last))
    }

    /// 紧贴节点之前开始，节点无父节点时返回 false
    pub fn set_start_before(&mut self, node: &Handle) -> bool {
        match (get_parent_node(node), child_index(node)) {
            (Some(parent), Some(index)) => {
                self.start = BoundaryPoint::new(parent, index);
                true
            }
            _ => false,
        }
    }

    /// 紧贴节点之后结束，节点无父节点时返回 false
    pub fn set_end_after(&mut self, node: &Handle) -> bool {
        match (get_parent_node(node), child_index(node)) {
            (Some(parent), Some(index)) => {
                self.end = BoundaryPoint::new(parent, index + 1);
                true
            }
            _ => false,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        Rc::ptr_eq(&self.start.node, &self.end.node) && self.start.offset == self.end.offset
    }

    /// 同时包含两个边界容器的最近节点（可以是容器本身）
    pub fn common_ancestor(&self) -> Option<Handle> {
        let start_chain = inclusive_ancestors(&self.start.node);
        let end_chain = inclusive_ancestors(&self.end.node);
        start_chain
            .into_iter()
            .find(|candidate| end_chain.iter().any(|n| Rc::ptr_eq(n, candidate)))
    }

    /// 最近的公共祖先元素，文本节点上溯到父元素
    pub fn common_ancestor_element(&self) -> Option<Handle> {
        let ancestor = self.common_ancestor()?;
        if is_text(&ancestor) {
            get_parent_node(&ancestor)
        } else {
            Some(ancestor)
        }
    }

    /// 文本叶子与范围的交集，返回字节区间；不相交时返回 None
    pub fn leaf_slice(&self, leaf: &Handle) -> Option<(usize, usize)> {
        let len = node_length(leaf);
        let leaf_start = BoundaryPoint::new(leaf.clone(), 0);
        let leaf_end = BoundaryPoint::new(leaf.clone(), len);

        let starts_before_leaf_end = compare_points(&self.start, &leaf_end)? == Ordering::Less;
        let ends_after_leaf_start = compare_points(&self.end, &leaf_start)? == Ordering::Greater;
        if !(starts_before_leaf_end && ends_after_leaf_start) {
            return None;
        }

        let from = if Rc::ptr_eq(&self.start.node, leaf) {
            self.start.offset
        } else {
            0
        };
        let to = if Rc::ptr_eq(&self.end.node, leaf) {
            self.end.offset
        } else {
            len
        };
        (from < to).then_some((from, to))
    }

    /// 与范围相交的文本叶子，按文档顺序
    pub fn intersecting_text_leaves(&self) -> Vec<Handle> {
        let Some(ancestor) = self.common_ancestor() else {
            return Vec::new();
        };
        text_leaves(&ancestor)
            .into_iter()
            .filter(|leaf| self.leaf_slice(leaf).is_some())
            .collect()
    }

    /// 范围覆盖的文本
    pub fn text(&self) -> String {
        if self.is_collapsed() {
            return String::new();
        }
        let Some(ancestor) = self.common_ancestor() else {
            return String::new();
        };

        let mut out = String::new();
        for leaf in text_leaves(&ancestor) {
            if let (Some((from, to)), Some(text)) = (self.leaf_slice(&leaf), text_of(&leaf)) {
                out.push_str(&text[from..to]);
            }
        }
        out
    }
}

fn inclusive_ancestors(node: &Handle) -> Vec<Handle> {
    let mut chain = vec![node.clone()];
    let mut current = get_parent_node(node);
    while let Some(parent) = current {
        current = get_parent_node(&parent);
        chain.push(parent);
    }
    chain
}

/// 从根到节点的下标路径
fn node_path(node: &Handle) -> (Handle, Vec<usize>) {
    let mut path = Vec::new();
    let mut current = node.clone();
    while let Some(parent) = get_parent_node(&current) {
        path.push(child_index(&current).unwrap_or(0));
        current = parent;
    }
    path.reverse();
    (current, path)
}

/// 比较两个边界点的文档位置，不在同一棵树上时返回 None
pub fn compare_points(a: &BoundaryPoint, b: &BoundaryPoint) -> Option<Ordering> {
    if Rc::ptr_eq(&a.node, &b.node) {
        return Some(a.offset.cmp(&b.offset));
    }

    let (root_a, path_a) = node_path(&a.node);
    let (root_b, path_b) = node_path(&b.node);
    if !Rc::ptr_eq(&root_a, &root_b) {
        return None;
    }

    // a 的容器是 b 的容器的祖先
    if path_b.starts_with(&path_a) {
        let child = path_b[path_a.len()];
        return Some(if child < a.offset {
            Ordering::Greater
        } else {
            Ordering::Less
        });
    }

    // b 的容器是 a 的容器的祖先
    if path_a.starts_with(&path_b) {
        let child = path_a[path_b.len()];
        return Some(if child < b.offset {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }

    Some(path_a.cmp(&path_b))
}
