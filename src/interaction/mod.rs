//! 页面交互
//!
//! - `control`: 浮动操作按钮
//! - `controller`: 按钮状态机，处理选区、悬停、点击与计时器事件
//! - `state_table`: 选区翻译使用的元素状态表

pub mod control;
pub mod controller;
pub mod state_table;

pub use control::{ControlLabel, FloatingControl, Rect};
pub use controller::{CapturedSelection, ClickOutcome, InteractionController, SelectionBatch};
pub use state_table::{ElementState, ElementStateTable};
