//! 页面翻译服务
//!
//! 持有文档、后端与设置，实现整页命令：
//!
//! - `translate_whole_page`: 整页翻译，已有译文时只重新显示
//! - `show_all`: 显示全部译文
//! - `revert_all`: 全部切回原文，保留译文
//! - `remove_all`: 移除全部覆盖层并丢弃译文
//!
//! 所有批量翻译都经过同一个异步闸门，两个批次不会交替调用后端。

use std::cell::{RefCell, RefMut};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::sequencer::{PendingUnit, SequenceReport, Sequencer};
use crate::interaction::control::FloatingControl;
use crate::parsers::html::dom::{get_body, html_to_dom};
use crate::parsers::html::range::DocumentRange;
use crate::parsers::html::serializer::serialize_document;
use crate::translation::backend::{TranslateRequest, TranslationBackend};
use crate::translation::config::SettingsStore;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::overlay::{
    find_overlays, find_translated, wrap, DisplayState, OverlayNode,
};
use crate::translation::pipeline::{partition, PageCollector, TranslationUnit};

/// `remove_all` 的最大轮数，恢复的原始结构中可能还嵌有覆盖层
const MAX_REMOVE_PASSES: usize = 16;

/// 整页翻译结果
#[derive(Debug, Clone, Default)]
pub struct PageReport {
    /// 已有译文，本次只重新显示
    pub from_cache: bool,
    /// 重新显示的覆盖层数量
    pub revealed: usize,
    pub sequence: SequenceReport,
}

/// 页面翻译服务
pub struct TranslationService {
    dom: RcDom,
    sequencer: Sequencer,
    settings: Arc<dyn SettingsStore>,
    control: RefCell<FloatingControl>,
    gate: Mutex<()>,
    stats: Arc<ServiceStats>,
}

impl TranslationService {
    pub fn new(
        dom: RcDom,
        backend: Arc<dyn TranslationBackend>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let stats = Arc::new(ServiceStats::default());
        let body = get_body(&dom.document);

        Self {
            sequencer: Sequencer::new(backend, settings.clone(), stats.clone()),
            settings,
            control: RefCell::new(FloatingControl::new(body)),
            gate: Mutex::new(()),
            stats,
            dom,
        }
    }

    /// 解析 HTML 并创建服务
    pub fn from_html(
        data: &[u8],
        encoding: &str,
        backend: Arc<dyn TranslationBackend>,
        settings: Arc<dyn SettingsStore>,
    ) -> TranslationResult<Self> {
        let dom = html_to_dom(data, encoding)?;
        Ok(Self::new(dom, backend, settings))
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// 浮动按钮，交互控制器与整页命令共用
    pub fn control_mut(&self) -> RefMut<'_, FloatingControl> {
        self.control.borrow_mut()
    }

    pub fn is_control_visible(&self) -> bool {
        self.control.borrow().is_visible()
    }

    pub fn get_stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// 按文档顺序列出全部覆盖层
    pub fn overlays(&self) -> Vec<OverlayNode> {
        find_overlays(self.document())
    }

    /// 整页翻译
    ///
    /// 页面上已有译文时不会请求后端，只把译文重新显示出来。
    /// 只检查是否存在译文，不检查译文是否覆盖了当前内容。
    pub async fn translate_whole_page(&self) -> TranslationResult<PageReport> {
        self.hide_control();

        if !find_translated(self.document()).is_empty() {
            let revealed = self.show_all();
            self.stats.record_cache_hit();
            info!("页面已有译文，重新显示 {} 个覆盖层", revealed);
            return Ok(PageReport {
                from_cache: true,
                revealed,
                sequence: SequenceReport::default(),
            });
        }

        let units = PageCollector::default().collect_units(self.document());
        info!("📄 整页翻译开始: {} 个翻译单元", units.len());

        let batch = self.wrap_units(units);
        let sequence = self.run_all(batch).await;

        info!(
            "✅ 整页翻译完成: {} 成功, {} 失败, {} 跳过",
            sequence.translated, sequence.failed, sequence.skipped
        );
        Ok(PageReport {
            from_cache: false,
            revealed: 0,
            sequence,
        })
    }

    /// 翻译选区：切分、立即全部包装，再依次翻译
    ///
    /// 返回包装出的覆盖层（按文档顺序）和翻译结果。
    pub async fn translate_range(
        &self,
        range: &DocumentRange,
    ) -> (Vec<OverlayNode>, SequenceReport) {
        let batch = self.prepare_range(range);
        let overlays = batch.iter().map(|unit| unit.overlay.clone()).collect();
        let report = self.run_all(batch).await;
        (overlays, report)
    }

    /// 切分选区并立即包装全部单元，返回待翻译的批次
    pub fn prepare_range(&self, range: &DocumentRange) -> Vec<PendingUnit> {
        let units = partition(range);
        debug!("选区翻译: {} 个翻译单元", units.len());
        self.wrap_units(units)
    }

    /// 包装全部单元，包装失败的单元被跳过
    pub fn wrap_units(&self, units: Vec<TranslationUnit>) -> Vec<PendingUnit> {
        let mut batch = Vec::with_capacity(units.len());
        for unit in units {
            let text = unit.text.clone();
            match wrap(unit) {
                Ok(overlay) => {
                    self.stats.record_wrapped();
                    batch.push(PendingUnit::new(overlay, text));
                }
                Err(e) => {
                    warn!("无法包装翻译单元，跳过: {}", e);
                    self.stats.record_skipped();
                }
            }
        }
        batch
    }

    /// 依次翻译一批覆盖层，同一时间只有一个批次在调用后端
    pub async fn run_all(&self, batch: Vec<PendingUnit>) -> SequenceReport {
        let _guard = self.gate.lock().await;
        self.sequencer.run_all(batch).await
    }

    /// 单次后端调用，不涉及文档
    pub async fn translate_text(
        &self,
        text: &str,
        target_language: Option<&str>,
        model_hint: Option<&str>,
    ) -> TranslationResult<String> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyOrWhitespaceInput);
        }

        let config = self.settings.load()?;
        let target = target_language
            .filter(|lang| !lang.trim().is_empty())
            .unwrap_or(config.target_language.as_str());
        let model = model_hint.unwrap_or(config.model_name.as_str());
        let request = TranslateRequest::new(text, target).with_model_hint(model);

        self.stats.record_backend_call();
        self.sequencer.backend().translate(&request).await
    }

    /// 把所有切回原文的覆盖层重新显示为译文
    pub fn show_all(&self) -> usize {
        self.hide_control();

        let mut shown = 0;
        for overlay in find_translated(self.document()) {
            if overlay.state() != DisplayState::Original {
                continue;
            }
            match overlay.show_translated() {
                Ok(true) => shown += 1,
                Ok(false) => {}
                Err(e) => debug!("无法显示译文: {}", e),
            }
        }
        info!("显示译文: {} 个覆盖层", shown);
        shown
    }

    /// 把所有显示译文的覆盖层切回原文，覆盖层保留
    pub fn revert_all(&self) -> usize {
        self.hide_control();

        let mut reverted = 0;
        for overlay in find_translated(self.document()) {
            if overlay.show_original() {
                reverted += 1;
            }
        }
        info!("切回原文: {} 个覆盖层", reverted);
        reverted
    }

    /// 移除全部覆盖层（含翻译中的），恢复原始结构并丢弃译文
    pub fn remove_all(&self) -> usize {
        self.hide_control();

        let mut removed = 0;
        for pass in 0..MAX_REMOVE_PASSES {
            let overlays = self.overlays();
            if overlays.is_empty() {
                break;
            }
            debug!("移除覆盖层第 {} 轮: {} 个", pass + 1, overlays.len());

            for overlay in overlays {
                // 外层恢复后，旧的内层覆盖层已不在文档中
                if !overlay.is_attached() {
                    continue;
                }
                match overlay.destroy() {
                    Ok(()) => removed += 1,
                    Err(e) => debug!("无法移除覆盖层: {}", e),
                }
            }
        }

        info!("🗑️ 已移除 {} 个覆盖层", removed);
        removed
    }

    /// 序列化当前文档
    pub fn serialize(&self, encoding: &str) -> TranslationResult<Vec<u8>> {
        serialize_document(&self.dom, encoding)
    }

    fn hide_control(&self) {
        self.control.borrow_mut().hide();
    }
}

/// 服务统计信息
#[derive(Debug, Default)]
pub struct ServiceStats {
    pub units_wrapped: AtomicUsize,
    pub units_translated: AtomicUsize,
    pub units_failed: AtomicUsize,
    pub units_skipped: AtomicUsize,
    pub backend_calls: AtomicUsize,
    /// 整页翻译直接复用已有译文的次数
    pub cache_hits: AtomicUsize,
}

impl ServiceStats {
    pub fn record_wrapped(&self) {
        self.units_wrapped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translated(&self) {
        self.units_translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.units_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.units_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_call(&self) {
        self.backend_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.units_wrapped.store(0, Ordering::Relaxed);
        self.units_translated.store(0, Ordering::Relaxed);
        self.units_failed.store(0, Ordering::Relaxed);
        self.units_skipped.store(0, Ordering::Relaxed);
        self.backend_calls.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            units_wrapped: self.units_wrapped.load(Ordering::Relaxed),
            units_translated: self.units_translated.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
            units_skipped: self.units_skipped.load(Ordering::Relaxed),
            backend_calls: self.backend_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub units_wrapped: usize,
    pub units_translated: usize,
    pub units_failed: usize,
    pub units_skipped: usize,
    pub backend_calls: usize,
    pub cache_hits: usize,
}

impl ServiceStatsSnapshot {
    /// 成功率，未调用后端时为 0
    pub fn success_rate(&self) -> f64 {
        let finished = self.units_translated + self.units_failed;
        if finished == 0 {
            0.0
        } else {
            self.units_translated as f64 / finished as f64
        }
    }
}
