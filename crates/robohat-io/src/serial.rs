//! 基于 `serialport` crate 的串口后端

use crate::{IoError, SerialLine};
use serialport::{ClearBuffer, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// 默认读写超时
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

/// 系统串口（如 `/dev/ttyAMA0`）
pub struct SystemSerialPort {
    path: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SystemSerialPort {
    /// 打开串口
    ///
    /// # 错误
    /// - `IoError::Serial`: 设备不存在或无权限
    pub fn open(path: impl Into<String>, baud_rate: u32) -> Result<Self, IoError> {
        let mut port = Self {
            path: path.into(),
            baud_rate,
            timeout: DEFAULT_TIMEOUT,
            port: None,
        };
        SerialLine::open(&mut port)?;
        Ok(port)
    }

    /// 设备路径
    pub fn path(&self) -> &str {
        &self.path
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, IoError> {
        self.port.as_mut().ok_or(IoError::Closed)
    }
}

impl SerialLine for SystemSerialPort {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let port = self.port()?;
        Write::write_all(port, bytes)?;
        Write::flush(port)?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, IoError> {
        Ok(self.port()?.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        Ok(Read::read(self.port()?, buf)?)
    }

    fn clear_input(&mut self) -> Result<(), IoError> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), IoError> {
        if self.port.take().is_some() {
            debug!("Serial port {} closed", self.path);
        }
        Ok(())
    }

    fn open(&mut self) -> Result<(), IoError> {
        let port = serialport::new(self.path.as_str(), self.baud_rate)
            .timeout(self.timeout)
            .open()?;
        info!("Serial port {} opened at {} baud", self.path, self.baud_rate);
        self.port = Some(port);
        Ok(())
    }
}
