use markup5ever_rcdom::Handle;

use super::wrap::rejoin_split_halves;
use super::{
    is_overlay_element, ATTR_ORIGINAL_HTML, ATTR_ORIGINAL_TEXT, ATTR_SHOWING,
    ATTR_TRANSLATED_TEXT, CLASS_TRANSLATED, CLASS_TRANSLATING,
};
use crate::parsers::html::dom::{
    append_child, create_text, get_node_attr, get_parent_node, has_class, is_attached,
    normalize_text_children, replace_with, set_node_attr, take_children,
};
use crate::parsers::html::serializer::{inner_html, parse_fragment_in};
use crate::translation::error::{TranslationError, TranslationResult};

const SHOWING_TRANSLATED: &str = "translated";
const SHOWING_ORIGINAL: &str = "original";

/// 覆盖层当前显示的内容
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayState {
    /// 已创建，等待翻译结果
    Translating,
    /// 显示译文
    Translated,
    /// 翻译成功后切回原文
    Original,
}

/// 覆盖层元素的类型化视图
///
/// 只暴露保持状态一致的操作，原始结构一经写入不再修改。
#[derive(Debug, Clone)]
pub struct OverlayNode {
    element: Handle,
}

impl PartialEq for OverlayNode {
    fn eq(&self, other: &Self) -> bool {
        std::rc::Rc::ptr_eq(&self.element, &other.element)
    }
}

impl Eq for OverlayNode {}

impl OverlayNode {
    /// 包装已有的覆盖层元素
    pub fn from_element(element: Handle) -> Option<Self> {
        is_overlay_element(&element).then_some(Self { element })
    }

    /// 把已装入原始内容的元素标记为翻译中，并记录原始结构
    pub(super) fn begin(element: Handle, original_text: &str) -> TranslationResult<Self> {
        set_node_attr(&element, "class", Some(CLASS_TRANSLATING));
        set_node_attr(&element, ATTR_ORIGINAL_TEXT, Some(original_text));
        let markup = inner_html(&element)?;
        set_node_attr(&element, ATTR_ORIGINAL_HTML, Some(&markup));
        Ok(Self { element })
    }

    pub fn element(&self) -> &Handle {
        &self.element
    }

    pub fn state(&self) -> DisplayState {
        if !has_class(&self.element, CLASS_TRANSLATED) {
            return DisplayState::Translating;
        }
        match get_node_attr(&self.element, ATTR_SHOWING).as_deref() {
            Some(SHOWING_ORIGINAL) => DisplayState::Original,
            _ => DisplayState::Translated,
        }
    }

    pub fn original_text(&self) -> Option<String> {
        get_node_attr(&self.element, ATTR_ORIGINAL_TEXT)
    }

    pub fn original_markup(&self) -> Option<String> {
        get_node_attr(&self.element, ATTR_ORIGINAL_HTML)
    }

    pub fn translated_text(&self) -> Option<String> {
        get_node_attr(&self.element, ATTR_TRANSLATED_TEXT)
    }

    /// 是否仍在文档中
    pub fn is_attached(&self) -> bool {
        is_attached(&self.element)
    }

    fn ensure_parent(&self, operation: &str) -> TranslationResult<Handle> {
        get_parent_node(&self.element).ok_or_else(|| {
            TranslationError::InvalidState(format!("{}: 覆盖层已从文档中移除", operation))
        })
    }

    /// 写入译文并切换到已翻译状态
    pub fn finish(&self, translated_text: &str) -> TranslationResult<()> {
        self.ensure_parent("finish")?;
        if self.state() != DisplayState::Translating {
            return Err(TranslationError::InvalidState(
                "finish: 覆盖层不在翻译中状态".to_string(),
            ));
        }

        set_node_attr(&self.element, "class", Some(CLASS_TRANSLATED));
        set_node_attr(&self.element, ATTR_TRANSLATED_TEXT, Some(translated_text));
        set_node_attr(&self.element, ATTR_SHOWING, Some(SHOWING_TRANSLATED));
        self.set_text_content(translated_text);
        Ok(())
    }

    /// 翻译失败：恢复原始内容并移除覆盖层
    pub fn revert(self) -> TranslationResult<()> {
        self.ensure_parent("revert")?;
        self.restore_in_place()
    }

    /// 在译文与原文之间切换，不会触发新的翻译
    pub fn toggle(&self) -> TranslationResult<DisplayState> {
        self.ensure_parent("toggle")?;

        match self.state() {
            DisplayState::Translating => Err(TranslationError::InvalidState(
                "toggle: 翻译尚未完成".to_string(),
            )),
            DisplayState::Translated => {
                self.show_original();
                Ok(DisplayState::Original)
            }
            DisplayState::Original => {
                self.show_translated()?;
                Ok(DisplayState::Translated)
            }
        }
    }

    /// 切换到原文，已显示原文时不做任何事
    pub fn show_original(&self) -> bool {
        if self.state() != DisplayState::Translated || get_parent_node(&self.element).is_none() {
            return false;
        }

        let nodes = match self.original_markup() {
            Some(markup) => parse_fragment_in(Some(&self.element), &markup),
            None => vec![create_text(&self.original_text().unwrap_or_default())],
        };
        take_children(&self.element);
        for node in &nodes {
            append_child(&self.element, node);
        }
        set_node_attr(&self.element, ATTR_SHOWING, Some(SHOWING_ORIGINAL));
        true
    }

    /// 切换到译文，缺少译文时返回错误
    pub fn show_translated(&self) -> TranslationResult<bool> {
        if self.state() != DisplayState::Original || get_parent_node(&self.element).is_none() {
            return Ok(false);
        }

        let translated = self.translated_text().ok_or_else(|| {
            TranslationError::InvalidState("覆盖层没有译文".to_string())
        })?;
        self.set_text_content(&translated);
        set_node_attr(&self.element, ATTR_SHOWING, Some(SHOWING_TRANSLATED));
        Ok(true)
    }

    /// 恢复原始内容并移除覆盖层，丢弃译文
    pub fn destroy(self) -> TranslationResult<()> {
        self.ensure_parent("destroy")?;
        self.restore_in_place()
    }

    fn restore_in_place(&self) -> TranslationResult<()> {
        let parent = self.ensure_parent("restore")?;

        let nodes = match (self.original_markup(), self.original_text()) {
            (Some(markup), _) => parse_fragment_in(Some(&parent), &markup),
            (None, Some(text)) => vec![create_text(&text)],
            (None, None) => take_children(&self.element),
        };

        if !replace_with(&self.element, &nodes) {
            return Err(TranslationError::DomError("无法替换覆盖层".to_string()));
        }
        rejoin_split_halves(&parent);
        normalize_text_children(&parent);
        Ok(())
    }

    fn set_text_content(&self, text: &str) {
        take_children(&self.element);
        append_child(&self.element, &create_text(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{create_element, find_nodes, html_to_dom};
    use crate::translation::overlay::wrap;
    use crate::translation::pipeline::TranslationUnit;
    use crate::parsers::html::DocumentRange;

    fn overlay_for_paragraph(html: &str) -> (markup5ever_rcdom::RcDom, Handle, OverlayNode) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let p = find_nodes(&dom.document, &["p"]).remove(0);
        let range = DocumentRange::select_node_contents(&p);
        let unit = TranslationUnit::new(range);
        let overlay = wrap(unit).unwrap();
        (dom, p, overlay)
    }

    #[test]
    fn finish_then_toggle_round_trip() {
        let (_dom, p, overlay) =
            overlay_for_paragraph(r#"<p>Read <a href="/x">the docs</a> now</p>"#);
        assert_eq!(overlay.state(), DisplayState::Translating);
        assert!(overlay.toggle().is_err(), "翻译中的覆盖层不可切换");

        overlay.finish("阅读文档").unwrap();
        assert_eq!(overlay.state(), DisplayState::Translated);
        assert_eq!(inner_html(overlay.element()).unwrap(), "阅读文档");

        let markup = overlay.original_markup().unwrap();
        assert_eq!(overlay.toggle().unwrap(), DisplayState::Original);
        assert_eq!(inner_html(overlay.element()).unwrap(), markup);
        assert_eq!(overlay.toggle().unwrap(), DisplayState::Translated);
        assert_eq!(overlay.original_markup().unwrap(), markup);
        assert_eq!(inner_html(&p).unwrap().matches("<span").count(), 1);
    }

    #[test]
    fn revert_restores_exact_markup() {
        let html = r#"<p>Hello <b>bold</b> &amp; <a href="/a">link</a></p>"#;
        let (_dom, p, overlay) = overlay_for_paragraph(html);
        let before = r#"Hello <b>bold</b> &amp; <a href="/a">link</a>"#;

        overlay.revert().unwrap();
        assert_eq!(inner_html(&p).unwrap(), before);
    }

    /// 部分选中的行内元素在还原后合并为一个
    #[test]
    fn revert_and_destroy_rejoin_split_inline_elements() {
        let html = r#"<p>Hello <b class="x">bold text</b> end</p>"#;
        let before = r#"Hello <b class="x">bold text</b> end"#;

        for finish_first in [false, true] {
            let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
            let p = find_nodes(&dom.document, &["p"]).remove(0);
            let leaves = crate::parsers::html::dom::text_leaves(&p);
            let range = DocumentRange::new(leaves[0].clone(), 2, leaves[1].clone(), 4);
            let overlay = wrap(TranslationUnit::new(range)).unwrap();
            assert_eq!(find_nodes(&p, &["b"]).len(), 2);

            if finish_first {
                overlay.finish("译文").unwrap();
                overlay.destroy().unwrap();
            } else {
                overlay.revert().unwrap();
            }
            assert_eq!(inner_html(&p).unwrap(), before);
            assert_eq!(p.children.borrow().len(), 3);
        }
    }

    #[test]
    fn nested_splits_are_rejoined_level_by_level() {
        let html = "<p><i>one <b>two three</b></i> four</p>";
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let p = find_nodes(&dom.document, &["p"]).remove(0);
        let leaves = crate::parsers::html::dom::text_leaves(&p);
        // 从 "two| three" 到 "fo|ur"
        let range = DocumentRange::new(leaves[1].clone(), 3, leaves[2].clone(), 3);
        let overlay = wrap(TranslationUnit::new(range)).unwrap();
        assert_eq!(find_nodes(&p, &["i"]).len(), 2);

        overlay.revert().unwrap();
        assert_eq!(inner_html(&p).unwrap(), "<i>one <b>two three</b></i> four");
    }

    #[test]
    fn detached_overlay_is_not_mutated() {
        let (_dom, _p, overlay) = overlay_for_paragraph("<p>text</p>");
        crate::parsers::html::dom::detach(overlay.element());
        assert!(matches!(
            overlay.finish("x"),
            Err(TranslationError::InvalidState(_))
        ));
        assert!(overlay.clone().destroy().is_err());
    }

    #[test]
    fn plain_elements_are_not_overlays() {
        assert!(OverlayNode::from_element(create_element("span", &[])).is_none());
    }
}
