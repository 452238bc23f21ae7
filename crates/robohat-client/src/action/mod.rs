//! 动作组
//!
//! 动作组是一张按行存储的多通道位置表，每行带一个运动时间。播放时逐行下发位置指令，
//! 并在两行之间按该行的时间睡眠。
//!
//! - [`store`]：动作表的读取（内存 / TOML 文件）
//! - [`scheduler`]：后台播放使用的单线程协作式调度器
//! - [`sequencer`]：加载、锁定通道、阻塞/后台播放

pub mod scheduler;
pub mod sequencer;
pub mod store;

pub use scheduler::{CompletionCallback, PlaybackHandle, PlaybackOutcome, PlaybackScheduler};
pub use sequencer::{ActionRequest, ActionSequencer, PlayMode, Playback};
pub use store::{ActionTableStore, MemoryActionStore, TomlActionStore};

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 通道锁定表：通道号（从 1 开始）→ 固定位置
pub type ChannelLocks = BTreeMap<u8, i32>;

/// 动作表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow {
    /// 运动时间（毫秒），也是到下一行之前的等待时间
    #[serde(rename = "duration")]
    pub duration_ms: u32,
    /// 各通道目标位置，下标 0 对应通道 1
    pub positions: Vec<i32>,
}

impl ActionRow {
    pub fn new(duration_ms: u32, positions: Vec<i32>) -> Self {
        Self {
            duration_ms,
            positions,
        }
    }
}

/// 已加载的动作组
///
/// 构造时即应用通道锁定，之后只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSet {
    source: PathBuf,
    repeat: u32,
    locks: ChannelLocks,
    rows: Vec<ActionRow>,
}

impl ActionSet {
    /// 创建动作组并应用通道锁定
    ///
    /// # 错误
    /// - `Validation`: 锁定的通道为 0，或超出某一行的通道数
    pub fn new(
        source: impl Into<PathBuf>,
        repeat: u32,
        mut rows: Vec<ActionRow>,
        locks: ChannelLocks,
    ) -> Result<Self, ClientError> {
        let source = source.into();
        for (&channel, &position) in &locks {
            let index = (channel as usize).checked_sub(1).ok_or_else(|| {
                ClientError::Validation("locked channel numbers start at 1".to_string())
            })?;
            for (row_index, row) in rows.iter_mut().enumerate() {
                let slot = row.positions.get_mut(index).ok_or_else(|| {
                    ClientError::Validation(format!(
                        "locked channel {} missing from row {} of {}",
                        channel,
                        row_index,
                        source.display()
                    ))
                })?;
                *slot = position;
            }
        }

        Ok(Self {
            source,
            repeat,
            locks,
            rows,
        })
    }

    /// 来源路径
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn locks(&self) -> &ChannelLocks {
        &self.locks
    }

    /// 已应用锁定的行
    pub fn rows(&self) -> &[ActionRow] {
        &self.rows
    }

    /// 完整播放的总步数（行数 × 重复次数）
    pub fn total_steps(&self) -> usize {
        self.rows.len() * self.repeat as usize
    }

    /// 第 `step` 步对应的行
    pub fn step(&self, step: usize) -> Option<&ActionRow> {
        if step >= self.total_steps() {
            return None;
        }
        self.rows.get(step % self.rows.len())
    }

    /// 一次完整播放所需的时间（毫秒）
    pub fn duration_ms(&self) -> u64 {
        let once: u64 = self.rows.iter().map(|r| r.duration_ms as u64).sum();
        once * self.repeat as u64
    }
}
