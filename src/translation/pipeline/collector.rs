//! 整页文本收集器
//!
//! 遍历 body 下的全部文本叶子，按可见性过滤后以块级祖先分组，
//! 生成整页翻译使用的翻译单元。

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tracing::debug;

use super::partition::{nearest_block, TranslationUnit};
use crate::parsers::html::dom::{get_body, text_leaves, text_of};
use crate::parsers::html::range::DocumentRange;
use crate::parsers::html::utils::{is_blank, is_hidden, is_in_skipped_element};
use crate::translation::config::constants;
use crate::translation::overlay::is_engine_owned;

/// 收集器配置
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 分组文本少于该字符数时丢弃
    pub min_unit_chars: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            min_unit_chars: constants::MIN_PAGE_UNIT_CHARS,
        }
    }
}

/// 整页文本收集器
pub struct PageCollector {
    config: CollectorConfig,
    stats: CollectionStats,
}

impl Default for PageCollector {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}

impl PageCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            stats: CollectionStats::default(),
        }
    }

    /// 收集整页翻译单元，按文档顺序
    ///
    /// 单元锚定在首尾文本叶子上，先包装的单元不会使后面的锚点失效。
    pub fn collect_units(&mut self, document: &Handle) -> Vec<TranslationUnit> {
        self.stats.reset();

        let root = get_body(document).unwrap_or_else(|| document.clone());
        let mut units = Vec::new();
        let mut group: Option<LeafGroup> = None;

        for leaf in text_leaves(&root) {
            self.stats.leaves_visited += 1;

            if is_engine_owned(&leaf) {
                self.stats.engine_owned_leaves += 1;
                self.flush(&mut group, &mut units);
                continue;
            }

            let text = text_of(&leaf).unwrap_or_default();
            if is_blank(&text) {
                self.stats.blank_leaves += 1;
                continue;
            }

            // 被排除的文本会截断当前分组，避免被并入覆盖层
            if is_in_skipped_element(&leaf) || is_hidden(&leaf) {
                self.stats.rejected_leaves += 1;
                self.flush(&mut group, &mut units);
                continue;
            }

            let block = nearest_block(&leaf);
            match group.as_mut() {
                Some(current) if Rc::ptr_eq(&current.block, &block) => current.last = leaf,
                _ => {
                    self.flush(&mut group, &mut units);
                    group = Some(LeafGroup {
                        block,
                        first: leaf.clone(),
                        last: leaf,
                    });
                }
            }
        }
        self.flush(&mut group, &mut units);

        self.stats.units_collected = units.len();
        debug!(
            "整页收集完成: {} 个单元, {} 个叶子, {} 个被跳过, {} 个过短分组",
            self.stats.units_collected,
            self.stats.leaves_visited,
            self.stats.total_skipped(),
            self.stats.groups_discarded
        );
        units
    }

    fn flush(&mut self, group: &mut Option<LeafGroup>, units: &mut Vec<TranslationUnit>) {
        let Some(current) = group.take() else {
            return;
        };

        let anchor = DocumentRange::around_text_leaves(&current.first, &current.last);
        let unit = TranslationUnit::new(anchor);
        if unit.char_count() < self.config.min_unit_chars {
            self.stats.groups_discarded += 1;
            return;
        }
        units.push(unit);
    }

    pub fn get_stats(&self) -> &CollectionStats {
        &self.stats
    }
}

struct LeafGroup {
    block: Handle,
    first: Handle,
    last: Handle,
}

/// 收集统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub leaves_visited: usize,
    pub blank_leaves: usize,
    pub rejected_leaves: usize,
    pub engine_owned_leaves: usize,
    pub groups_discarded: usize,
    pub units_collected: usize,
}

impl CollectionStats {
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 被跳过的叶子总数
    pub fn total_skipped(&self) -> usize {
        self.blank_leaves + self.rejected_leaves + self.engine_owned_leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    fn collect(html: &str) -> (Vec<String>, CollectionStats) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let mut collector = PageCollector::default();
        let units = collector.collect_units(&dom.document);
        (
            units.into_iter().map(|u| u.text).collect(),
            collector.get_stats().clone(),
        )
    }

    #[test]
    fn groups_by_block_and_skips_code() {
        let (texts, stats) = collect(
            r#"<html><head><title>Title</title><style>p{}</style></head><body>
               <h1>Heading</h1>
               <p>Run <code>cargo test</code> now</p>
               <script>var x = 1;</script>
               <p>A <a href="/">link</a> here</p>
               </body></html>"#,
        );
        assert_eq!(texts, ["Heading", "Run ", " now", "A link here"]);
        assert_eq!(stats.rejected_leaves, 2);
        assert_eq!(stats.units_collected, 4);
    }

    #[test]
    fn hidden_and_short_text_are_dropped() {
        let (texts, stats) = collect(
            r#"<body><div style="display:none">secret</div>
               <p>x</p><p hidden>gone</p><p>kept text</p></body>"#,
        );
        assert_eq!(texts, ["kept text"]);
        assert_eq!(stats.groups_discarded, 1);
    }

    #[test]
    fn engine_owned_content_is_ignored() {
        let (texts, _) = collect(
            r#"<body><p><span class="inpage-translator-translated">已翻译</span></p>
               <div id="inpage-translator-button">🌐 Translate</div>
               <p>fresh</p></body>"#,
        );
        assert_eq!(texts, ["fresh"]);
    }
}
