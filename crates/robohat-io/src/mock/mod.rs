//! Mock 硬件接口
//!
//! 用于测试的模拟串口、数字 IO 与 PWM 驱动。所有 mock 都可克隆，
//! 克隆体共享同一份内部状态，便于在把实例交给被测对象后继续检查。

use crate::{DigitalPort, IoError, Level, PwmDriver, SerialLine};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// 应答生成器：根据写入的请求帧返回要"回传"的字节
pub type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct MockSerialState {
    /// 已写入的字节序列（按调用顺序）
    written: Vec<Vec<u8>>,
    /// 已写入、尚未"到达"接收缓冲区的应答
    pending: VecDeque<u8>,
    /// 接收缓冲区
    rx: VecDeque<u8>,
    responder: Option<Responder>,
    clear_count: usize,
    open_count: usize,
    close_count: usize,
    is_open: bool,
}

/// 模拟串口
///
/// 写入时调用应答生成器，应答在下一次 `bytes_available()` 时才进入接收缓冲区，
/// 模拟舵机在线路切换为接收方向之后才回传数据。
#[derive(Clone)]
pub struct MockSerialPort {
    state: Arc<Mutex<MockSerialState>>,
}

impl MockSerialPort {
    /// 创建新的模拟串口（已打开，无应答）
    pub fn new() -> Self {
        let state = MockSerialState {
            is_open: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// 设置应答生成器
    pub fn set_responder(
        &self,
        responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    ) {
        self.state.lock().responder = Some(Box::new(responder));
    }

    /// 直接向接收缓冲区注入字节（模拟陈旧数据/串扰）
    pub fn inject_rx(&self, bytes: &[u8]) {
        self.state.lock().rx.extend(bytes.iter().copied());
    }

    /// 已写入的所有字节序列
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// 写入次数
    pub fn write_count(&self) -> usize {
        self.state.lock().written.len()
    }

    /// 清空接收缓冲区的次数
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    /// 重新打开次数
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    /// 关闭次数
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_open
    }
}

impl Default for MockSerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLine for MockSerialPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let mut state = self.state.lock();
        if !state.is_open {
            return Err(IoError::Closed);
        }
        state.written.push(bytes.to_vec());
        let reply = state.responder.as_mut().and_then(|r| r(bytes));
        if let Some(reply) = reply {
            state.pending.extend(reply);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, IoError> {
        let mut state = self.state.lock();
        if !state.is_open {
            return Err(IoError::Closed);
        }
        let arrived: Vec<u8> = state.pending.drain(..).collect();
        state.rx.extend(arrived);
        Ok(state.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let mut state = self.state.lock();
        let n = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.rx.clear();
        state.clear_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.is_open = false;
        state.close_count += 1;
        Ok(())
    }

    fn open(&mut self) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.is_open = true;
        state.open_count += 1;
        Ok(())
    }
}

/// 模拟数字 IO 端口（记录电平历史）
#[derive(Clone, Default)]
pub struct MockDigitalPort {
    levels: Arc<Mutex<HashMap<u8, Level>>>,
    history: Arc<Mutex<Vec<(u8, Level)>>>,
}

impl MockDigitalPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按时间顺序的 (引脚, 电平) 写入记录
    pub fn history(&self) -> Vec<(u8, Level)> {
        self.history.lock().clone()
    }

    /// 当前电平（未写入过则为 None）
    pub fn level(&self, pin: u8) -> Option<Level> {
        self.levels.lock().get(&pin).copied()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl DigitalPort for MockDigitalPort {
    fn write(&self, pin: u8, level: Level) -> Result<(), IoError> {
        self.levels.lock().insert(pin, level);
        self.history.lock().push((pin, level));
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<Level, IoError> {
        Ok(self.levels.lock().get(&pin).copied().unwrap_or(Level::Low))
    }
}

/// 模拟 PWM 驱动（记录脉宽写入历史）
#[derive(Clone, Default)]
pub struct MockPwmDriver {
    history: Arc<Mutex<Vec<(u8, u32)>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockPwmDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按时间顺序的 (引脚, 脉宽) 写入记录
    pub fn history(&self) -> Vec<(u8, u32)> {
        self.history.lock().clone()
    }

    /// 某个引脚的写入记录
    pub fn widths(&self, pin: u8) -> Vec<u32> {
        self.history
            .lock()
            .iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, w)| *w)
            .collect()
    }

    /// 某个引脚最近一次写入的脉宽
    pub fn last_width(&self, pin: u8) -> Option<u32> {
        self.widths(pin).last().copied()
    }

    /// 模拟写入失败
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

impl PwmDriver for MockPwmDriver {
    fn set_pulse_width(&self, pin: u8, width_us: u32) -> Result<(), IoError> {
        if *self.fail.lock() {
            return Err(IoError::Pin {
                pin,
                message: "simulated PWM failure".to_string(),
            });
        }
        self.history.lock().push((pin, width_us));
        Ok(())
    }
}
