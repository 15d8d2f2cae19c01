//! 把翻译单元包装为覆盖层
//!
//! 依次尝试三种策略，结构保留的策略优先：
//!
//! 1. `Surround`: 两个边界位于同一容器，直接移动被覆盖的子节点
//! 2. `Extract`: 拆分部分覆盖的行内祖先，直到两个边界在公共祖先中相遇
//! 3. `PlainText`: 用纯文本替换被覆盖的文本叶子，会丢失结构，只用于单个块内
//!
//! `Extract` 拆出的两半元素带有相同的拆分标记，覆盖层恢复原文后由
//! [`rejoin_split_halves`] 合并。

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use markup5ever_rcdom::Handle;
use tracing::{debug, warn};

use super::node::OverlayNode;
use super::{ATTR_SPLIT, OVERLAY_TAG};
use crate::parsers::html::dom::{
    append_child, child_index, create_element, create_text, detach, get_node_attr,
    get_parent_node, insert_child, is_element, is_text, next_sibling, node_length,
    normalize_text_children, replace_with, set_node_attr, shallow_clone, split_text,
    take_children,
};
use crate::parsers::html::range::{BoundaryPoint, DocumentRange};
use crate::parsers::html::utils::is_structural;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::{nearest_block, TranslationUnit};

static NEXT_SPLIT_ID: AtomicUsize = AtomicUsize::new(1);

/// 包装策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapStrategy {
    Surround,
    Extract,
    PlainText,
}

impl WrapStrategy {
    /// 尝试顺序
    pub const CHAIN: [WrapStrategy; 3] = [
        WrapStrategy::Surround,
        WrapStrategy::Extract,
        WrapStrategy::PlainText,
    ];

    /// 是否会丢失原始结构
    pub fn is_lossy(self) -> bool {
        matches!(self, WrapStrategy::PlainText)
    }

    fn apply(
        self,
        start: &BoundaryRef,
        end: &BoundaryRef,
        text: &str,
    ) -> TranslationResult<Handle> {
        match self {
            WrapStrategy::Surround => surround(start, end),
            WrapStrategy::Extract => extract(start, end),
            WrapStrategy::PlainText => replace_with_text(start, end, text),
        }
    }
}

impl fmt::Display for WrapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WrapStrategy::Surround => "surround",
            WrapStrategy::Extract => "extract",
            WrapStrategy::PlainText => "plain-text",
        };
        f.write_str(name)
    }
}

/// 包装翻译单元，返回处于翻译中状态的覆盖层
///
/// 翻译单元在此被消费，之后覆盖层是唯一的数据来源。
pub fn wrap(unit: TranslationUnit) -> TranslationResult<OverlayNode> {
    let TranslationUnit { anchor, text } = unit;

    if anchor.is_collapsed() {
        return Err(TranslationError::DomError("翻译单元范围为空".to_string()));
    }

    // 先处理结束边界，拆分开始边界时结束边界仍然有效
    let end = BoundaryRef::resolve(&anchor.end)?;
    let start = BoundaryRef::resolve(&anchor.start)?;

    let mut last_error = None;
    for strategy in WrapStrategy::CHAIN {
        match strategy.apply(&start, &end, &text) {
            Ok(element) => {
                if strategy.is_lossy() {
                    warn!("⚠️ 使用纯文本方式包装，原始结构已丢失: {:.40}", text);
                } else {
                    debug!("包装策略 {} 成功", strategy);
                }
                return OverlayNode::begin(element, &text);
            }
            Err(e) => {
                debug!("包装策略 {} 放弃: {}", strategy, e);
                last_error = Some(e);
            }
        }
    }

    // 解析边界时拆开的文本节点合并回去
    normalize_text_children(&start.parent);
    normalize_text_children(&end.parent);

    Err(last_error
        .unwrap_or_else(|| TranslationError::DomError("没有可用的包装策略".to_string())))
}

/// 以节点引用表示的边界：位于 `parent` 中 `before` 之前，`None` 表示末尾
///
/// 与下标不同，节点引用不会因兄弟节点的插入而失效。
#[derive(Debug, Clone)]
struct BoundaryRef {
    parent: Handle,
    before: Option<Handle>,
}

impl BoundaryRef {
    /// 把边界点转换为节点引用，必要时拆分文本节点
    fn resolve(point: &BoundaryPoint) -> TranslationResult<Self> {
        if is_text(&point.node) {
            let parent = get_parent_node(&point.node)
                .ok_or_else(|| TranslationError::DomError("文本节点没有父节点".to_string()))?;

            let before = if point.offset == 0 {
                Some(point.node.clone())
            } else if point.offset >= node_length(&point.node) {
                next_sibling(&point.node)
            } else {
                Some(split_text(&point.node, point.offset).ok_or_else(|| {
                    TranslationError::DomError("无法拆分文本节点".to_string())
                })?)
            };
            return Ok(Self { parent, before });
        }

        let before = point.node.children.borrow().get(point.offset).cloned();
        Ok(Self {
            parent: point.node.clone(),
            before,
        })
    }

    fn index(&self) -> TranslationResult<usize> {
        match &self.before {
            Some(node) => child_index(node)
                .ok_or_else(|| TranslationError::DomError("边界节点已被移除".to_string())),
            None => Ok(self.parent.children.borrow().len()),
        }
    }

    fn to_point(&self) -> TranslationResult<BoundaryPoint> {
        Ok(BoundaryPoint::new(self.parent.clone(), self.index()?))
    }
}

fn new_overlay_element() -> Handle {
    create_element(OVERLAY_TAG, &[])
}

/// 两个边界在同一容器中：把中间的子节点移入覆盖层
fn surround(start: &BoundaryRef, end: &BoundaryRef) -> TranslationResult<Handle> {
    if !Rc::ptr_eq(&start.parent, &end.parent) {
        return Err(TranslationError::DomError("边界不在同一容器中".to_string()));
    }

    let parent = &start.parent;
    let from = start.index()?;
    let to = end.index()?;
    if from >= to {
        return Err(TranslationError::DomError("范围内没有节点".to_string()));
    }

    let covered: Vec<Handle> = parent.children.borrow()[from..to].to_vec();
    let span = new_overlay_element();
    insert_child(parent, from, &span);
    for node in &covered {
        append_child(&span, node);
    }
    Ok(span)
}

/// 拆分部分覆盖的行内祖先，然后在公共祖先中执行 `surround`
fn extract(start: &BoundaryRef, end: &BoundaryRef) -> TranslationResult<Handle> {
    let range = DocumentRange {
        start: start.to_point()?,
        end: end.to_point()?,
    };
    let ancestor = range
        .common_ancestor()
        .filter(is_element)
        .ok_or_else(|| TranslationError::DomError("找不到公共祖先元素".to_string()))?;

    // 拆分前检查，避免拆到一半再放弃
    for side in [start, end] {
        let mut current = side.parent.clone();
        while !Rc::ptr_eq(&current, &ancestor) {
            if !is_element(&current) || is_structural(&current) {
                return Err(TranslationError::DomError(
                    "需要拆分块级或表格结构".to_string(),
                ));
            }
            current = get_parent_node(&current)
                .ok_or_else(|| TranslationError::DomError("祖先链中断".to_string()))?;
        }
    }

    let end = climb_to(end.clone(), &ancestor, Side::End)?;
    let start = climb_to(start.clone(), &ancestor, Side::Start)?;
    surround(&start, &end)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

/// 把边界逐级上移到 `ancestor`
///
/// 需要拆分时，原元素保留前半部分，后半部分移入紧随其后的浅拷贝，
/// 因此指向原元素的其他边界引用不受影响。
fn climb_to(mut boundary: BoundaryRef, ancestor: &Handle, side: Side) -> TranslationResult<BoundaryRef> {
    while !Rc::ptr_eq(&boundary.parent, ancestor) {
        let element = boundary.parent.clone();
        let grandparent = get_parent_node(&element)
            .ok_or_else(|| TranslationError::DomError("祖先链中断".to_string()))?;
        let index = boundary.index()?;
        let len = element.children.borrow().len();

        boundary = if index == 0 {
            BoundaryRef {
                parent: grandparent,
                before: Some(element),
            }
        } else if index >= len {
            BoundaryRef {
                parent: grandparent,
                before: next_sibling(&element),
            }
        } else {
            let tail = split_element(&element, index)?;
            BoundaryRef {
                parent: grandparent,
                before: Some(tail),
            }
        };

        debug!(
            "{}边界上移一层",
            if side == Side::Start { "开始" } else { "结束" }
        );
    }
    Ok(boundary)
}

/// 把 `index` 及之后的子节点移入插在元素之后的浅拷贝
///
/// 两半带有相同的拆分标记。元素已带标记时沿用，同一标记的相邻元素都会被合并。
fn split_element(element: &Handle, index: usize) -> TranslationResult<Handle> {
    let clone = shallow_clone(element)
        .ok_or_else(|| TranslationError::DomError("只能拆分元素节点".to_string()))?;
    let split_id = get_node_attr(element, ATTR_SPLIT)
        .unwrap_or_else(|| NEXT_SPLIT_ID.fetch_add(1, Ordering::Relaxed).to_string());
    set_node_attr(element, ATTR_SPLIT, Some(&split_id));
    set_node_attr(&clone, ATTR_SPLIT, Some(&split_id));
    let grandparent = get_parent_node(element)
        .ok_or_else(|| TranslationError::DomError("元素没有父节点".to_string()))?;
    let position = child_index(element)
        .ok_or_else(|| TranslationError::DomError("元素没有父节点".to_string()))?;

    let moved: Vec<Handle> = element.children.borrow()[index..].to_vec();
    insert_child(&grandparent, position + 1, &clone);
    for node in &moved {
        append_child(&clone, node);
    }
    Ok(clone)
}

/// 用单个文本覆盖层替换被覆盖的文本叶子
fn replace_with_text(
    start: &BoundaryRef,
    end: &BoundaryRef,
    text: &str,
) -> TranslationResult<Handle> {
    let range = DocumentRange {
        start: start.to_point()?,
        end: end.to_point()?,
    };
    let leaves = range.intersecting_text_leaves();
    let Some((first, rest)) = leaves.split_first() else {
        return Err(TranslationError::DomError("范围内没有文本".to_string()));
    };
    // 跨块替换会把后一个块的文本搬进前一个块
    let block = nearest_block(first);
    if rest.iter().any(|leaf| !Rc::ptr_eq(&nearest_block(leaf), &block)) {
        return Err(TranslationError::DomError("纯文本替换不能跨越块级元素".to_string()));
    }

    let span = new_overlay_element();
    if !replace_with(first, &[span.clone()]) {
        return Err(TranslationError::DomError("无法替换文本节点".to_string()));
    }
    append_child(&span, &create_text(text));
    for leaf in rest {
        detach(leaf);
    }
    Ok(span)
}

/// 合并 `parent` 下带相同拆分标记的相邻元素，逐层向内处理
///
/// 最外层的两半总是公共祖先的子节点，内层的两半位于合并后的元素中。
pub fn rejoin_split_halves(parent: &Handle) {
    let children: Vec<Handle> = parent.children.borrow().clone();
    let mut head: Option<(Handle, String)> = None;
    let mut merged = false;

    for child in children {
        let Some(child_id) = get_node_attr(&child, ATTR_SPLIT) else {
            close_split_run(head.take(), merged);
            merged = false;
            continue;
        };

        if let Some((element, id)) = &head {
            if *id == child_id {
                for node in take_children(&child) {
                    append_child(element, &node);
                }
                detach(&child);
                merged = true;
                continue;
            }
        }

        close_split_run(head.take(), merged);
        merged = false;
        head = Some((child, child_id));
    }
    close_split_run(head, merged);
}

fn close_split_run(head: Option<(Handle, String)>, merged: bool) {
    let Some((element, _)) = head else {
        return;
    };
    if merged {
        debug!("合并拆分的行内元素");
        set_node_attr(&element, ATTR_SPLIT, None);
        normalize_text_children(&element);
        rejoin_split_halves(&element);
    }
}
