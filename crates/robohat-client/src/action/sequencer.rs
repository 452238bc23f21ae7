//! 动作组播放器
//!
//! # 时序
//!
//! 多个动作组一起播放时按"步"同步推进：第 i 步先下发所有动作组的第 i 行，
//! 然后睡眠这些行中最长的运动时间，再进入第 i+1 步。每个动作组保持自己的行顺序
//! 和重复次数；较短的动作组播完后不再参与。
//!
//! 只有单次写入会持有传输层的锁，行间睡眠期间其它调用方可以插入指令。
//!
//! 阻塞播放在调用线程上用 `spin_sleep` 停顿；后台播放在调度器上用 tokio 定时器挂起。
//! 两者共用同一套逐步下发逻辑。

use super::scheduler::{CompletionCallback, PlaybackHandle, PlaybackOutcome, PlaybackScheduler};
use super::store::ActionTableStore;
use super::{ActionSet, ChannelLocks};
use crate::error::ClientError;
use crate::motion::MotionSink;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 播放方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// 在调用线程上执行，全部播完才返回
    Blocking,
    /// 交给后台调度器，立即返回句柄
    Background,
}

/// 播放结果
pub enum Playback {
    /// 阻塞播放已完成
    Completed,
    /// 后台播放进行中
    Running(PlaybackHandle),
}

impl Playback {
    /// 等待播放结束（阻塞播放直接返回）
    pub fn wait(self) -> PlaybackOutcome {
        match self {
            Playback::Completed => Ok(()),
            Playback::Running(handle) => handle.wait(),
        }
    }
}

/// 一次加载请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub path: PathBuf,
    pub repeat: u32,
    pub locks: ChannelLocks,
}

impl ActionRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            repeat: 1,
            locks: ChannelLocks::new(),
        }
    }

    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// 锁定通道位置
    pub fn lock(mut self, channel: u8, position: i32) -> Self {
        self.locks.insert(channel, position);
        self
    }
}

/// 动作组播放器
pub struct ActionSequencer {
    sink: Arc<dyn MotionSink>,
    store: Arc<dyn ActionTableStore>,
    scheduler: Arc<PlaybackScheduler>,
}

impl ActionSequencer {
    pub fn new(
        sink: Arc<dyn MotionSink>,
        store: Arc<dyn ActionTableStore>,
        scheduler: Arc<PlaybackScheduler>,
    ) -> Self {
        Self {
            sink,
            store,
            scheduler,
        }
    }

    /// 后台调度器
    pub fn scheduler(&self) -> &Arc<PlaybackScheduler> {
        &self.scheduler
    }

    /// 读取动作表并应用通道锁定
    ///
    /// # 错误
    /// - `NotFound`: 路径不存在
    /// - `Store`: 内容无法解析
    /// - `Validation`: 锁定的通道不存在
    pub fn load(
        &self,
        path: impl Into<PathBuf>,
        repeat: u32,
        locks: &ChannelLocks,
    ) -> Result<ActionSet, ClientError> {
        let path = path.into();
        let rows = self.store.read_rows(&path)?;
        let set = ActionSet::new(path, repeat, rows, locks.clone())?;
        debug!(
            "Loaded action set {} ({} rows, repeat {}, {} ms)",
            set.source().display(),
            set.rows().len(),
            repeat,
            set.duration_ms()
        );
        Ok(set)
    }

    /// 阻塞播放：在调用线程上执行，全部播完才返回
    ///
    /// 不依赖 tokio runtime，可以在任意线程（包括完成回调）中调用。
    pub fn play_blocking(&self, sets: Vec<ActionSet>) -> PlaybackOutcome {
        let steps = begin_playback(&sets);
        for step in 0..steps {
            let pause = issue_step(self.sink.as_ref(), &sets, step)?;
            spin_sleep::sleep(pause);
        }
        info!("Playback finished");
        Ok(())
    }

    /// 后台播放：提交到调度器后立即返回
    ///
    /// `on_complete` 在调度器线程上恰好调用一次。
    pub fn play_background(
        &self,
        sets: Vec<ActionSet>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<PlaybackHandle, ClientError> {
        self.scheduler
            .spawn(run_lockstep(self.sink.clone(), sets), on_complete)
    }

    /// 按指定方式播放
    ///
    /// 阻塞方式下 `on_complete` 在调用线程上调用，随后返回同一结果。
    pub fn play(
        &self,
        sets: Vec<ActionSet>,
        mode: PlayMode,
        on_complete: Option<CompletionCallback>,
    ) -> Result<Playback, ClientError> {
        match mode {
            PlayMode::Blocking => {
                let outcome = self.play_blocking(sets);
                if let Some(callback) = on_complete {
                    callback(&outcome);
                }
                outcome.map(|_| Playback::Completed)
            },
            PlayMode::Background => Ok(Playback::Running(self.play_background(sets, on_complete)?)),
        }
    }

    /// 加载并播放一个动作组
    pub fn run_action_set(
        &self,
        request: ActionRequest,
        mode: PlayMode,
        on_complete: Option<CompletionCallback>,
    ) -> Result<Playback, ClientError> {
        self.run_action_sets(vec![request], mode, on_complete)
    }

    /// 先加载全部动作组，再同步推进播放
    ///
    /// 任何一个加载失败都不会开始播放。
    pub fn run_action_sets(
        &self,
        requests: Vec<ActionRequest>,
        mode: PlayMode,
        on_complete: Option<CompletionCallback>,
    ) -> Result<Playback, ClientError> {
        let sets = requests
            .into_iter()
            .map(|r| self.load(r.path, r.repeat, &r.locks))
            .collect::<Result<Vec<_>, _>>()?;
        self.play(sets, mode, on_complete)
    }
}

/// 总步数（最长的动作组决定）
fn begin_playback(sets: &[ActionSet]) -> usize {
    let steps = sets.iter().map(ActionSet::total_steps).max().unwrap_or(0);
    info!("Playing {} action set(s), {} steps", sets.len(), steps);
    steps
}

/// 下发第 `step` 步的所有行，返回本步之后的停顿
fn issue_step(
    sink: &dyn MotionSink,
    sets: &[ActionSet],
    step: usize,
) -> Result<Duration, ClientError> {
    let mut pause_ms = 0u32;
    for set in sets {
        let Some(row) = set.step(step) else {
            continue;
        };
        for (index, &position) in row.positions.iter().enumerate() {
            let channel = u8::try_from(index + 1).map_err(|_| {
                ClientError::Validation(format!(
                    "{} has more than 255 channels",
                    set.source().display()
                ))
            })?;
            sink.set_position(channel, position, row.duration_ms)?;
        }
        pause_ms = pause_ms.max(row.duration_ms);
    }
    debug!("Step {} issued, sleeping {} ms", step, pause_ms);
    Ok(Duration::from_millis(pause_ms as u64))
}

/// 同步推进播放（后台调度器上的协作版本）
async fn run_lockstep(sink: Arc<dyn MotionSink>, sets: Vec<ActionSet>) -> PlaybackOutcome {
    let steps = begin_playback(&sets);
    for step in 0..steps {
        let pause = issue_step(sink.as_ref(), &sets, step)?;
        tokio::time::sleep(pause).await;
    }
    info!("Playback finished");
    Ok(())
}
