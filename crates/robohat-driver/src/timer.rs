//! 固定周期定时线程
//!
//! 使用绝对时间锚点重新装填，避免 `sleep(period)` 累积漂移。
//! 停止信号通过 channel 断开传递，线程在下一个等待点立即退出。

use crate::error::DriverError;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// 周期任务句柄
///
/// Drop 时停止线程并 join。
pub struct PeriodicTimer {
    name: String,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    /// 启动周期任务
    ///
    /// 第一次触发在 `period` 之后。任务本身不应阻塞。
    pub fn spawn<F>(name: impl Into<String>, period: Duration, mut task: F) -> Result<Self, DriverError>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut next = Instant::now() + period;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {},
                        // 收到停止信号或发送端已丢弃
                        _ => break,
                    }

                    task();

                    next += period;
                    let now = Instant::now();
                    if next < now {
                        // 落后超过一个周期：重新锚定，不补发
                        next = now;
                    }
                }
            })
            .map_err(|e| DriverError::TimerSpawn(e.to_string()))?;

        debug!("Timer '{}' started ({:?})", name, period);
        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// 是否仍在运行
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// 停止并等待线程退出
    pub fn stop(&mut self) {
        // 丢弃发送端即可唤醒等待中的 recv_timeout
        drop(self.stop_tx.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Timer '{}' panicked", self.name);
            } else {
                debug!("Timer '{}' stopped", self.name);
            }
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
