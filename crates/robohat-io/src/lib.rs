//! # Robohat IO Layer
//!
//! 硬件能力抽象层：串口线路、数字 IO 引脚、PWM 输出。
//!
//! 上层（传输层、插值器）只通过这里的 trait 访问硬件，不直接打开设备文件。

use thiserror::Error;

#[cfg(feature = "serialport")]
pub mod serial;

#[cfg(feature = "serialport")]
pub use serial::SystemSerialPort;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// IO 层统一错误类型
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serialport")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("Pin {pin} error: {message}")]
    Pin { pin: u8, message: String },
    #[error("Device closed")]
    Closed,
}

/// 引脚电平
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// 数字 IO 端口
///
/// 按引脚号设置/读取电平。实现需自行保证线程安全。
pub trait DigitalPort: Send + Sync {
    fn write(&self, pin: u8, level: Level) -> Result<(), IoError>;
    fn read(&self, pin: u8) -> Result<Level, IoError>;
}

/// 物理串口线路
///
/// 由传输层独占；所有方法都在传输层锁内调用。
pub trait SerialLine: Send {
    /// 写入完整字节序列
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError>;
    /// 接收缓冲区中可读的字节数
    fn bytes_available(&mut self) -> Result<usize, IoError>;
    /// 读取至多 `buf.len()` 个字节，返回实际读取数
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;
    /// 清空接收缓冲区
    fn clear_input(&mut self) -> Result<(), IoError>;
    /// 关闭线路
    fn close(&mut self) -> Result<(), IoError>;
    /// 重新打开线路
    fn open(&mut self) -> Result<(), IoError>;
}

impl<T: SerialLine + ?Sized> SerialLine for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize, IoError> {
        (**self).bytes_available()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        (**self).read(buf)
    }

    fn clear_input(&mut self) -> Result<(), IoError> {
        (**self).clear_input()
    }

    fn close(&mut self) -> Result<(), IoError> {
        (**self).close()
    }

    fn open(&mut self) -> Result<(), IoError> {
        (**self).open()
    }
}

/// PWM 驱动
///
/// 多个通道共享同一个驱动实例，因此使用 `&self`。
pub trait PwmDriver: Send + Sync {
    /// 设置引脚脉宽（微秒）
    fn set_pulse_width(&self, pin: u8, width_us: u32) -> Result<(), IoError>;
}
