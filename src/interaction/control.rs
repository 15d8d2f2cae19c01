//! 浮动操作按钮
//!
//! 整个文档只有一个按钮。首次显示时才创建元素并挂到 body 上，
//! 之后只更新位置、文字和 display。

use std::fmt;

use markup5ever_rcdom::Handle;

use crate::parsers::html::dom::{
    append_child, create_element, create_text, get_parent_node, set_node_attr, take_children,
};
use crate::translation::config::constants::{CONTROL_ELEMENT_ID, CONTROL_OFFSET_PX};

/// 按钮文字
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLabel {
    Translate,
    Revert,
}

impl ControlLabel {
    pub fn text(self) -> &'static str {
        match self {
            ControlLabel::Translate => "🌐 Translate",
            ControlLabel::Revert => "↩️ Revert",
        }
    }
}

impl fmt::Display for ControlLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// 页面坐标系中的矩形，由宿主计算后传入
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// 浮动操作按钮
#[derive(Debug)]
pub struct FloatingControl {
    body: Option<Handle>,
    element: Option<Handle>,
    visible: bool,
    label: ControlLabel,
    position: (f64, f64),
}

impl FloatingControl {
    /// `body` 为空时按钮只保存状态，不写入文档
    pub fn new(body: Option<Handle>) -> Self {
        Self {
            body,
            element: None,
            visible: false,
            label: ControlLabel::Translate,
            position: (0.0, 0.0),
        }
    }

    /// 显示在矩形右上角旁边
    pub fn show_near(&mut self, rect: &Rect, label: ControlLabel) {
        self.position = (rect.right + CONTROL_OFFSET_PX, rect.top - CONTROL_OFFSET_PX);
        self.label = label;
        self.visible = true;
        self.render();
    }

    pub fn hide(&mut self) {
        if self.visible {
            self.visible = false;
            self.render();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn label(&self) -> ControlLabel {
        self.label
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// 按钮元素，从未显示过时为 `None`
    pub fn element(&self) -> Option<&Handle> {
        self.element.as_ref()
    }

    fn render(&mut self) {
        let Some(element) = self.ensure_element() else {
            return;
        };

        let (x, y) = self.position;
        let display = if self.visible { "block" } else { "none" };
        let style = format!("left: {}px; top: {}px; display: {}", x, y, display);
        set_node_attr(&element, "style", Some(&style));

        take_children(&element);
        append_child(&element, &create_text(self.label.text()));
    }

    fn ensure_element(&mut self) -> Option<Handle> {
        if let Some(element) = &self.element {
            // 页面可能把按钮移除了，重新挂载
            if get_parent_node(element).is_none() {
                if let Some(body) = &self.body {
                    append_child(body, element);
                }
            }
            return Some(element.clone());
        }

        let body = self.body.as_ref()?;
        let element = create_element(
            "div",
            &[("id", CONTROL_ELEMENT_ID), ("style", "display: none")],
        );
        append_child(body, &element);
        self.element = Some(element.clone());
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{get_body, get_node_attr, html_to_dom, text_content};

    #[test]
    fn element_is_created_on_first_show() {
        let dom = html_to_dom(b"<body><p>text</p></body>", "utf-8").unwrap();
        let body = get_body(&dom.document).unwrap();
        let mut control = FloatingControl::new(Some(body.clone()));
        assert!(control.element().is_none());

        control.show_near(&Rect::new(10.0, 20.0, 110.0, 40.0), ControlLabel::Revert);
        let element = control.element().unwrap().clone();
        assert_eq!(control.position(), (115.0, 15.0));
        assert_eq!(text_content(&element), "↩️ Revert");
        assert!(get_node_attr(&element, "style").unwrap().contains("display: block"));

        control.hide();
        assert!(!control.is_visible());
        assert!(get_node_attr(&element, "style").unwrap().contains("display: none"));
        assert_eq!(body.children.borrow().len(), 2);
    }

    #[test]
    fn detached_control_keeps_state() {
        let mut control = FloatingControl::new(None);
        control.show_near(&Rect::default(), ControlLabel::Translate);
        assert!(control.is_visible());
        assert_eq!(control.label(), ControlLabel::Translate);
        assert!(control.element().is_none());
    }
}
