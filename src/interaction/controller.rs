//! 交互控制器
//!
//! 浮动按钮的状态机。宿主把指针事件转换为方法调用，计时器以显式的
//! 截止时间表示，由宿主调用 [`InteractionController::on_timer_tick`] 推进。
//!
//! 所有事件处理都是同步的。点击按钮翻译选区时只返回已包装的
//! [`SelectionBatch`]，由宿主在控制器之外等待它完成。

use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use markup5ever_rcdom::Handle;
use tracing::{debug, info};

use super::control::{ControlLabel, Rect};
use super::state_table::{ElementState, ElementStateTable};
use crate::parsers::html::range::DocumentRange;
use crate::translation::config::constants::HIDE_DELAY;
use crate::translation::core::{PendingUnit, SequenceReport, TranslationService};
use crate::translation::error::TranslationResult;
use crate::translation::overlay::{is_engine_owned, DisplayState, OverlayNode};

/// 捕获的选区
#[derive(Debug, Clone)]
pub struct CapturedSelection {
    pub range: DocumentRange,
    pub text: String,
    /// 选区公共祖先元素
    pub anchor: Handle,
}

/// 按钮点击的结果
#[derive(Debug)]
pub enum ClickOutcome {
    /// 悬停的覆盖层已切换
    Toggled(DisplayState),
    /// 旧式单次还原，返回移除的覆盖层数量
    Reverted(usize),
    /// 选区已包装，等待翻译
    Started(SelectionBatch),
    /// 没有可执行的目标
    Ignored,
}

/// 已包装、尚未翻译的选区批次
///
/// 持有服务的共享引用而不借用控制器。
pub struct SelectionBatch {
    service: Rc<TranslationService>,
    units: Vec<PendingUnit>,
}

impl SelectionBatch {
    /// 按文档顺序列出批次中的覆盖层
    pub fn overlays(&self) -> Vec<OverlayNode> {
        self.units.iter().map(|unit| unit.overlay.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 依次翻译批次中的单元
    pub async fn translate(self) -> SequenceReport {
        self.service.run_all(self.units).await
    }
}

impl fmt::Debug for SelectionBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionBatch")
            .field("units", &self.units.len())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum HideTrigger {
    /// 离开覆盖层：到期时仍悬停在同一覆盖层才隐藏
    HoverLeave(OverlayNode),
    /// 离开按钮：到期时无条件隐藏
    ControlLeave,
}

#[derive(Debug)]
struct HideTimer {
    deadline: Instant,
    trigger: HideTrigger,
}

/// 交互控制器，每个文档一个
pub struct InteractionController {
    service: Rc<TranslationService>,
    states: ElementStateTable,
    hover_target: Option<OverlayNode>,
    selection: Option<CapturedSelection>,
    hide_timer: Option<HideTimer>,
}

impl InteractionController {
    pub fn new(service: Rc<TranslationService>) -> Self {
        Self {
            service,
            states: ElementStateTable::new(),
            hover_target: None,
            selection: None,
            hide_timer: None,
        }
    }

    pub fn service(&self) -> &Rc<TranslationService> {
        &self.service
    }

    pub fn states(&self) -> &ElementStateTable {
        &self.states
    }

    pub fn hover_target(&self) -> Option<&OverlayNode> {
        self.hover_target.as_ref()
    }

    pub fn selection(&self) -> Option<&CapturedSelection> {
        self.selection.as_ref()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.hide_timer.is_some()
    }

    /// 用户完成选区
    pub fn on_selection(&mut self, range: DocumentRange, rect: Rect) {
        self.before_event();

        let text = range.text().trim().to_string();
        if text.is_empty() {
            self.selection = None;
            self.hide_control();
            return;
        }

        let Some(anchor) = range.common_ancestor_element() else {
            return;
        };
        // 在覆盖层或按钮内的选区交给悬停逻辑处理
        if is_engine_owned(&anchor) {
            debug!("选区位于覆盖层内，忽略");
            return;
        }

        let label = if self.states.is_translated(&anchor) {
            ControlLabel::Revert
        } else {
            ControlLabel::Translate
        };
        self.cancel_timer();
        // 按钮的动作跟随最新的事件
        self.hover_target = None;
        self.service.control_mut().show_near(&rect, label);
        self.selection = Some(CapturedSelection {
            range,
            text,
            anchor,
        });
    }

    /// 指针进入覆盖层
    pub fn on_hover_enter(&mut self, overlay: OverlayNode, rect: Rect) {
        self.before_event();

        let label = match overlay.state() {
            DisplayState::Translating => return,
            DisplayState::Translated => ControlLabel::Revert,
            DisplayState::Original => ControlLabel::Translate,
        };
        self.cancel_timer();
        self.service.control_mut().show_near(&rect, label);
        self.hover_target = Some(overlay);
    }

    /// 指针离开覆盖层，启动隐藏计时
    pub fn on_hover_leave(&mut self, overlay: OverlayNode, now: Instant) {
        self.before_event();
        if overlay.state() == DisplayState::Translating {
            return;
        }
        self.hide_timer = Some(HideTimer {
            deadline: now + HIDE_DELAY,
            trigger: HideTrigger::HoverLeave(overlay),
        });
    }

    /// 指针进入按钮，保持显示
    pub fn on_control_enter(&mut self) {
        self.before_event();
        self.cancel_timer();
    }

    /// 指针离开按钮
    pub fn on_control_leave(&mut self, now: Instant) {
        self.before_event();
        self.hide_timer = Some(HideTimer {
            deadline: now + HIDE_DELAY,
            trigger: HideTrigger::ControlLeave,
        });
    }

    /// 推进计时器，返回是否隐藏了按钮
    pub fn on_timer_tick(&mut self, now: Instant) -> bool {
        self.before_event();
        let due = matches!(&self.hide_timer, Some(timer) if timer.deadline <= now);
        if !due {
            return false;
        }
        let Some(timer) = self.hide_timer.take() else {
            return false;
        };

        match timer.trigger {
            HideTrigger::HoverLeave(overlay) => {
                if self.hover_target.as_ref() != Some(&overlay) {
                    return false;
                }
                self.hover_target = None;
            }
            HideTrigger::ControlLeave => {
                self.hover_target = None;
            }
        }
        self.service.control_mut().hide();
        true
    }

    /// 在按钮与覆盖层之外按下鼠标
    pub fn on_click_elsewhere(&mut self) {
        self.before_event();
        self.cancel_timer();
        self.hover_target = None;
        self.selection = None;
        self.hide_control();
    }

    /// 点击按钮
    ///
    /// 优先切换悬停的覆盖层；否则按选区所在元素的记录还原选区，
    /// 或者包装选区并返回 [`ClickOutcome::Started`]。
    pub fn on_control_clicked(&mut self) -> TranslationResult<ClickOutcome> {
        self.before_event();
        self.cancel_timer();

        if let Some(overlay) = self.hover_target.take() {
            let state = overlay.toggle()?;
            self.hide_control();
            return Ok(ClickOutcome::Toggled(state));
        }

        let Some(selection) = self.selection.take() else {
            return Ok(ClickOutcome::Ignored);
        };

        if self.states.is_translated(&selection.anchor) {
            let reverted = self.revert_element(&selection.anchor);
            self.hide_control();
            return Ok(ClickOutcome::Reverted(reverted));
        }

        self.hide_control();
        info!("翻译选区: {:.40}", selection.text);
        let units = self.service.prepare_range(&selection.range);
        let batch = SelectionBatch {
            service: self.service.clone(),
            units,
        };

        // 翻译失败的覆盖层会被移除，下一个事件时由 prune 清理
        if !batch.is_empty() {
            self.states.insert(
                &selection.anchor,
                ElementState {
                    is_translated: true,
                    translated_spans: batch.overlays(),
                },
            );
        }

        Ok(ClickOutcome::Started(batch))
    }

    /// 旧式还原：移除记录中的覆盖层并清除记录
    fn revert_element(&mut self, element: &Handle) -> usize {
        let Some(state) = self.states.remove(element) else {
            return 0;
        };

        let mut reverted = 0;
        for overlay in state.translated_spans {
            if !overlay.is_attached() {
                continue;
            }
            match overlay.destroy() {
                Ok(()) => reverted += 1,
                Err(e) => debug!("还原覆盖层失败: {}", e),
            }
        }
        reverted
    }

    /// 每个事件开始时清理已脱离文档的记录
    fn before_event(&mut self) {
        let pruned = self.states.prune();
        if pruned > 0 {
            debug!("清理 {} 条失效的元素记录", pruned);
        }
    }

    fn cancel_timer(&mut self) {
        self.hide_timer = None;
    }

    fn hide_control(&self) {
        self.service.control_mut().hide();
    }
}
