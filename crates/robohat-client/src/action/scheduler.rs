//! 后台播放调度器
//!
//! 一个专用线程运行单线程 tokio runtime，所有后台播放任务都在这个线程上协作执行；
//! 行与行之间的睡眠是唯一的挂起点。调度器有明确的启动/停止生命周期：
//! 停止时 runtime 被丢弃，尚未完成的任务随之终止，其句柄以
//! [`ClientError::PlaybackAborted`] 结束。

use crate::error::ClientError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// 播放结果
pub type PlaybackOutcome = Result<(), ClientError>;

/// 播放结束回调（在调度器线程上调用，恰好一次）
///
/// 回调返回（或 panic）之后句柄才会收到结果。
pub type CompletionCallback = Box<dyn FnOnce(&PlaybackOutcome) + Send + 'static>;

/// 完成通知：无论正常结束、出错还是任务被丢弃，都恰好通知一次
struct Completion {
    tx: Sender<PlaybackOutcome>,
    callback: Option<CompletionCallback>,
    delivered: bool,
}

impl Completion {
    fn new(tx: Sender<PlaybackOutcome>, callback: Option<CompletionCallback>) -> Self {
        Self {
            tx,
            callback,
            delivered: false,
        }
    }

    fn deliver(&mut self, outcome: PlaybackOutcome) {
        if self.delivered {
            return;
        }
        self.delivered = true;
        if let Some(callback) = self.callback.take() {
            // 回调 panic 不能吞掉播放结果
            if let Err(panic_err) =
                panic::catch_unwind(AssertUnwindSafe(|| callback(&outcome)))
            {
                error!("Playback completion callback panicked: {:?}", panic_err);
            }
        }
        // 句柄可能已被丢弃
        let _ = self.tx.send(outcome);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.delivered {
            debug!("Playback task dropped before completion");
            self.deliver(Err(ClientError::PlaybackAborted));
        }
    }
}

/// 后台播放句柄
///
/// 结果只产生一次，取到之后缓存在句柄内。
pub struct PlaybackHandle {
    rx: Receiver<PlaybackOutcome>,
    outcome: Option<PlaybackOutcome>,
}

impl PlaybackHandle {
    fn new(rx: Receiver<PlaybackOutcome>) -> Self {
        Self { rx, outcome: None }
    }

    fn poll(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        match self.rx.try_recv() {
            Ok(outcome) => self.outcome = Some(outcome),
            Err(TryRecvError::Disconnected) => {
                self.outcome = Some(Err(ClientError::PlaybackAborted))
            },
            Err(TryRecvError::Empty) => {},
        }
    }

    /// 是否已结束
    pub fn is_finished(&mut self) -> bool {
        self.poll();
        self.outcome.is_some()
    }

    /// 非阻塞查询结果
    pub fn try_wait(&mut self) -> Option<&PlaybackOutcome> {
        self.poll();
        self.outcome.as_ref()
    }

    /// 最多等待 `timeout`
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<&PlaybackOutcome> {
        if self.outcome.is_none() {
            match self.rx.recv_timeout(timeout) {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(RecvTimeoutError::Disconnected) => {
                    self.outcome = Some(Err(ClientError::PlaybackAborted))
                },
                Err(RecvTimeoutError::Timeout) => {},
            }
        }
        self.outcome.as_ref()
    }

    /// 阻塞等待结束
    pub fn wait(mut self) -> PlaybackOutcome {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.rx.recv().unwrap_or(Err(ClientError::PlaybackAborted))
    }
}

struct Running {
    handle: Handle,
    shutdown_tx: oneshot::Sender<()>,
    thread: JoinHandle<()>,
}

/// 单线程协作式调度器
pub struct PlaybackScheduler {
    running: Mutex<Option<Running>>,
}

impl PlaybackScheduler {
    /// 启动调度线程
    pub fn start() -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| ClientError::Scheduler(e.to_string()))?;
        let handle = runtime.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("robohat-playback".to_string())
            .spawn(move || {
                runtime.block_on(async {
                    // 发送端丢弃同样视为停止
                    let _ = shutdown_rx.await;
                });
                // 丢弃 runtime 会在本线程上丢弃所有未完成任务
                drop(runtime);
            })
            .map_err(|e| ClientError::Scheduler(e.to_string()))?;

        info!("Playback scheduler started");
        Ok(Self {
            running: Mutex::new(Some(Running {
                handle,
                shutdown_tx,
                thread,
            })),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// 提交一个播放任务
    ///
    /// # 错误
    /// - `Scheduler`: 调度器已停止
    pub fn spawn<F>(
        &self,
        playback: F,
        on_complete: Option<CompletionCallback>,
    ) -> Result<PlaybackHandle, ClientError>
    where
        F: Future<Output = PlaybackOutcome> + Send + 'static,
    {
        let guard = self.running.lock();
        let Some(running) = guard.as_ref() else {
            return Err(ClientError::Scheduler("scheduler stopped".to_string()));
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut completion = Completion::new(tx, on_complete);
        running.handle.spawn(async move {
            let outcome = playback.await;
            completion.deliver(outcome);
        });
        Ok(PlaybackHandle::new(rx))
    }

    /// 停止调度线程；未完成的播放以 `PlaybackAborted` 结束
    pub fn shutdown(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        let _ = running.shutdown_tx.send(());
        // 在调度线程上丢弃最后一个引用时不能等待自己
        if running.thread.thread().id() == std::thread::current().id() {
            info!("Playback scheduler stopping");
            return;
        }
        if running.thread.join().is_err() {
            error!("Playback scheduler thread panicked");
        } else {
            info!("Playback scheduler stopped");
        }
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
