//! 翻译调度
//!
//! 按文档顺序逐个翻译覆盖层：上一个请求的结果写回之后才发出下一个请求。

use std::sync::Arc;

use tracing::{debug, warn};

use super::service::ServiceStats;
use crate::translation::backend::{TranslateRequest, TranslationBackend};
use crate::translation::config::SettingsStore;
use crate::translation::error::{ErrorStats, TranslationError, TranslationResult};
use crate::translation::overlay::OverlayNode;

/// 已包装、等待翻译的单元
#[derive(Debug, Clone)]
pub struct PendingUnit {
    pub overlay: OverlayNode,
    pub text: String,
}

impl PendingUnit {
    pub fn new(overlay: OverlayNode, text: impl Into<String>) -> Self {
        Self {
            overlay,
            text: text.into(),
        }
    }
}

/// 单次批量翻译的结果
#[derive(Debug, Clone, Default)]
pub struct SequenceReport {
    pub total: usize,
    pub translated: usize,
    pub failed: usize,
    /// 轮到时已脱离文档的单元
    pub skipped: usize,
    pub errors: ErrorStats,
}

impl SequenceReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// 翻译调度器
pub struct Sequencer {
    backend: Arc<dyn TranslationBackend>,
    settings: Arc<dyn SettingsStore>,
    stats: Arc<ServiceStats>,
}

impl Sequencer {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        settings: Arc<dyn SettingsStore>,
        stats: Arc<ServiceStats>,
    ) -> Self {
        Self {
            backend,
            settings,
            stats,
        }
    }

    pub fn backend(&self) -> &Arc<dyn TranslationBackend> {
        &self.backend
    }

    /// 依次翻译全部单元
    ///
    /// 任何单元的失败都只会恢复该单元，不会中断后续单元。
    pub async fn run_all(&self, batch: Vec<PendingUnit>) -> SequenceReport {
        let mut report = SequenceReport {
            total: batch.len(),
            ..Default::default()
        };

        for (index, unit) in batch.into_iter().enumerate() {
            if !unit.overlay.is_attached() {
                debug!("单元 {} 已脱离文档，跳过", index);
                report.skipped += 1;
                self.stats.record_skipped();
                continue;
            }

            match self.translate_unit(&unit).await {
                Ok(translated) => {
                    // 等待期间单元可能已被移除
                    if !unit.overlay.is_attached() {
                        debug!("单元 {} 在翻译期间被移除，丢弃结果", index);
                        report.skipped += 1;
                        self.stats.record_skipped();
                        continue;
                    }
                    match unit.overlay.finish(&translated) {
                        Ok(()) => {
                            debug!("单元 {} 翻译完成", index);
                            report.translated += 1;
                            self.stats.record_translated();
                        }
                        Err(e) => {
                            debug!("单元 {} 无法写入译文: {}", index, e);
                            report.skipped += 1;
                            self.stats.record_skipped();
                        }
                    }
                }
                Err(e) => {
                    warn!("单元 {} 翻译失败，恢复原文: {}", index, e);
                    report.failed += 1;
                    report.errors.record_error(&e);
                    self.stats.record_failed();

                    if let Err(revert_error) = unit.overlay.revert() {
                        debug!("单元 {} 恢复失败: {}", index, revert_error);
                    }
                }
            }
        }

        report
    }

    async fn translate_unit(&self, unit: &PendingUnit) -> TranslationResult<String> {
        let text = unit.text.trim();
        if text.is_empty() {
            return Err(TranslationError::EmptyOrWhitespaceInput);
        }

        let config = self.settings.load()?;
        let request = TranslateRequest::new(text, config.target_language.clone())
            .with_model_hint(config.model_name.clone());

        self.stats.record_backend_call();
        self.backend.translate(&request).await
    }
}
