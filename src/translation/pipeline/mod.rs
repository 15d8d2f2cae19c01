//! 翻译管道模块
//!
//! 把选区或整页内容切分为翻译单元

pub mod collector;
pub mod partition;

// 重新导出主要类型
pub use collector::{CollectionStats, CollectorConfig, PageCollector};
pub use partition::{contains_block, nearest_block, partition, TranslationUnit};
