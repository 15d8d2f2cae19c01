//! 翻译系统核心模块
//!
//! - **调度层** (`sequencer.rs`): 逐个翻译覆盖层，成功写入译文，失败恢复原文
//! - **服务层** (`service.rs`): 持有文档，实现整页命令和选区翻译
//!
//! ```text
//! TranslationService (service.rs)
//!     ├── PageCollector / partition (pipeline)
//!     ├── wrap / OverlayNode (overlay)
//!     ├── FloatingControl (interaction/control.rs)
//!     └── Sequencer (sequencer.rs)
//!             └── TranslationBackend (backend)
//! ```

pub mod sequencer;
pub mod service;

pub use sequencer::{PendingUnit, SequenceReport, Sequencer};
pub use service::{PageReport, ServiceStats, ServiceStatsSnapshot, TranslationService};
