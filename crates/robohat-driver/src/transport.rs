//! 半双工串口传输
//!
//! 所有舵机 ID 共享一条单线半双工总线。传输层持有唯一的互斥锁，
//! 锁的粒度是"一次交换"（写请求 + 切换方向 + 等待应答），而不是单个字节操作，
//! 从而保证并发的读写调用不会在线路上交织出损坏的帧。
//!
//! # 方向切换
//!
//! ```text
//! 发送：RX_EN ↓  →  TX_EN ↑
//! 接收：TX_EN ↓  →  RX_EN ↑
//! ```
//!
//! 先撤销当前方向再使能新方向，任何时刻两个方向不会同时使能。

use crate::error::DriverError;
use parking_lot::Mutex;
use robohat_io::{DigitalPort, Level, SerialLine};
use robohat_protocol::{MIN_RESPONSE_LEN, Response, ServoFrame, decode_response};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 传输层配置
///
/// # Example
///
/// ```
/// use robohat_driver::TransportConfig;
/// use std::time::Duration;
///
/// let config = TransportConfig {
///     read_retries: 10,
///     response_settle: Duration::from_millis(8),
///     ..Default::default()
/// };
/// assert_eq!(config.baud_rate, 115_200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// 波特率
    pub baud_rate: u32,
    /// 接收使能引脚
    pub rx_enable_pin: u8,
    /// 发送使能引脚
    pub tx_enable_pin: u8,
    /// 读指令默认重试次数
    pub read_retries: u32,
    /// 发送读请求后的间隔
    pub inter_request_delay: Duration,
    /// 切换为接收后等待应答的时间
    pub response_settle: Duration,
    /// 线路复位时关闭前/打开后的等待时间
    pub reset_settle: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            rx_enable_pin: 7,
            tx_enable_pin: 13,
            read_retries: 50,
            inter_request_delay: Duration::from_micros(340),
            response_settle: Duration::from_millis(5),
            reset_settle: Duration::from_millis(100),
        }
    }
}

/// 线路方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 发送（空闲默认状态）
    Transmit,
    /// 接收
    Receive,
}

/// 传输统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// 已发送的帧（写指令 + 读请求）
    pub frames_written: u64,
    /// 读请求尝试次数
    pub read_attempts: u64,
    /// 被丢弃的应答（不足 5 字节、校验失败或参数形状不符）
    pub discarded_responses: u64,
    /// 重试耗尽次数
    pub timeouts: u64,
}

#[derive(Default)]
struct Counters {
    frames_written: AtomicU64,
    read_attempts: AtomicU64,
    discarded_responses: AtomicU64,
    timeouts: AtomicU64,
}

/// 锁内状态：物理线路 + 当前方向
///
/// 方向只能在持有锁时修改。
struct Line {
    port: Box<dyn SerialLine>,
    direction: Direction,
}

/// 半双工串口传输
pub struct SerialTransport {
    line: Mutex<Line>,
    pins: Arc<dyn DigitalPort>,
    config: TransportConfig,
    counters: Counters,
}

impl SerialTransport {
    /// 创建传输层并将线路置于空闲（发送）方向
    ///
    /// # 错误
    /// - `DriverError::Io`: 方向引脚设置失败
    pub fn new(
        port: impl SerialLine + 'static,
        pins: Arc<dyn DigitalPort>,
        config: TransportConfig,
    ) -> Result<Self, DriverError> {
        pins.write(config.rx_enable_pin, Level::Low)?;
        pins.write(config.tx_enable_pin, Level::High)?;
        info!(
            "Serial transport ready (rx_en={}, tx_en={}, retries={})",
            config.rx_enable_pin, config.tx_enable_pin, config.read_retries
        );

        Ok(Self {
            line: Mutex::new(Line {
                port: Box::new(port),
                direction: Direction::Transmit,
            }),
            pins,
            config,
            counters: Counters::default(),
        })
    }

    /// 传输层配置
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// 当前线路方向
    pub fn direction(&self) -> Direction {
        self.line.lock().direction
    }

    /// 统计快照
    pub fn stats(&self) -> TransportStats {
        TransportStats {
            frames_written: self.counters.frames_written.load(Ordering::Relaxed),
            read_attempts: self.counters.read_attempts.load(Ordering::Relaxed),
            discarded_responses: self.counters.discarded_responses.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
        }
    }

    /// 发送写指令（无应答）
    pub fn write(&self, frame: &ServoFrame) -> Result<(), DriverError> {
        let bytes = frame.encode()?;

        let mut line = self.line.lock();
        self.switch_direction(&mut line, Direction::Transmit)?;
        line.port.write_all(&bytes)?;
        self.counters.frames_written.fetch_add(1, Ordering::Relaxed);
        trace!("TX {:?} -> servo {}: {:02X?}", frame.command, frame.id, bytes.as_slice());
        Ok(())
    }

    /// 发送读请求并等待应答
    ///
    /// 每次尝试独占一次完整交换；不足 5 字节、解码失败或参数形状与指令不符的应答
    /// 被丢弃并计入重试。
    ///
    /// # 错误
    /// - `DriverError::Timeout`: `retries` 次尝试均未收到有效应答
    /// - `DriverError::Io`: 线路错误（不重试）
    pub fn read(&self, frame: &ServoFrame, retries: u32) -> Result<Response, DriverError> {
        let request = frame.encode()?;

        for attempt in 1..=retries {
            if let Some(response) = self.exchange(frame, &request)? {
                if attempt > 1 {
                    debug!(
                        "{:?} from servo {} succeeded after {} attempts",
                        frame.command, frame.id, attempt
                    );
                }
                return Ok(response);
            }
        }

        self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            "No valid response to {:?} from servo {} after {} attempts",
            frame.command, frame.id, retries
        );
        Err(DriverError::Timeout {
            id: frame.id,
            command: frame.command,
            attempts: retries,
        })
    }

    /// 使用默认重试次数读取
    pub fn read_default(&self, frame: &ServoFrame) -> Result<Response, DriverError> {
        self.read(frame, self.config.read_retries)
    }

    /// 复位线路：关闭并重新打开物理通道，恢复空闲方向
    ///
    /// 仅用于持续通信失败后的恢复，正常收发不会调用。
    pub fn reset_line(&self) -> Result<(), DriverError> {
        let mut line = self.line.lock();
        spin_sleep::sleep(self.config.reset_settle);
        line.port.close()?;
        self.switch_direction(&mut line, Direction::Transmit)?;
        line.port.open()?;
        spin_sleep::sleep(self.config.reset_settle);
        info!("Serial line reset");
        Ok(())
    }

    /// 一次请求/应答交换（持锁）
    fn exchange(&self, frame: &ServoFrame, request: &[u8]) -> Result<Option<Response>, DriverError> {
        let mut line = self.line.lock();
        self.counters.read_attempts.fetch_add(1, Ordering::Relaxed);

        self.switch_direction(&mut line, Direction::Transmit)?;
        line.port.write_all(request)?;
        self.counters.frames_written.fetch_add(1, Ordering::Relaxed);
        spin_sleep::sleep(self.config.inter_request_delay);

        // 丢弃陈旧数据，避免上一次交换的残留被当作本次应答
        line.port.clear_input()?;
        self.switch_direction(&mut line, Direction::Receive)?;
        spin_sleep::sleep(self.config.response_settle);

        let available = line.port.bytes_available()?;
        if available < MIN_RESPONSE_LEN {
            trace!("{:?}: only {} bytes available", frame.command, available);
            self.counters.discarded_responses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let mut buf = vec![0u8; available];
        let n = line.port.read(&mut buf)?;
        match decode_response(&buf[..n], frame.command) {
            Ok(response) => {
                trace!("RX {:?} <- servo {}: {:?}", frame.command, frame.id, response);
                Ok(Some(response))
            },
            Err(e) => {
                trace!("Discarding malformed response to {:?}: {}", frame.command, e);
                self.counters.discarded_responses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            },
        }
    }

    fn switch_direction(&self, line: &mut Line, direction: Direction) -> Result<(), DriverError> {
        let (off, on) = match direction {
            Direction::Transmit => (self.config.rx_enable_pin, self.config.tx_enable_pin),
            Direction::Receive => (self.config.tx_enable_pin, self.config.rx_enable_pin),
        };
        self.pins.write(off, Level::Low)?;
        self.pins.write(on, Level::High)?;
        line.direction = direction;
        Ok(())
    }
}
