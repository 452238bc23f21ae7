//! 帧编码与解析
//!
//! 纯函数实现，无副作用，可完全离线测试。

use crate::{Command, ProtocolError, checksum};
use smallvec::SmallVec;

/// 帧头字节（连续两个）
pub const FRAME_HEADER: u8 = 0x55;

/// 广播/默认 ID
pub const BROADCAST_ID: u8 = 0xFE;

/// 最大可寻址 ID
pub const MAX_SERVO_ID: u8 = 253;

/// 长度字段的固定开销（len 字段本身 + cmd + checksum）
pub const LENGTH_OVERHEAD: u8 = 3;

/// 最短的有效应答：帧头 2 字节 + id + len + cmd
pub const MIN_RESPONSE_LEN: usize = 5;

/// 帧缓冲区类型
///
/// 最长的常用帧为 10 字节（两个 16 位参数），栈上预留 16 字节避免堆分配。
pub type FrameBytes = SmallVec<[u8; 16]>;

/// 指令参数
///
/// 单个 0-255 的值编码为 1 字节，其余情况编码为 16 位小端序字。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Params {
    /// 无参数
    #[default]
    None,
    /// 单字节参数
    Byte(u8),
    /// 16 位参数序列（每个拆分为低字节、高字节）
    Words(SmallVec<[u16; 2]>),
}

impl Params {
    /// 按编码规则从数值列表构建参数
    ///
    /// - 空列表：无参数
    /// - 单个值且在 [0, 255]：单字节
    /// - 其它：16 位小端序字
    pub fn from_values(values: &[u16]) -> Self {
        match values {
            [] => Params::None,
            [v] if *v <= u8::MAX as u16 => Params::Byte(*v as u8),
            _ => Params::Words(values.iter().copied().collect()),
        }
    }

    /// 两个 16 位参数（如 位置 + 时间、下限 + 上限）
    pub fn pair(first: u16, second: u16) -> Self {
        let mut words = SmallVec::new();
        words.push(first);
        words.push(second);
        Params::Words(words)
    }

    /// 编码后的字节数
    pub fn byte_len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Byte(_) => 1,
            Params::Words(words) => words.len() * 2,
        }
    }

    fn write_to(&self, buf: &mut FrameBytes) {
        match self {
            Params::None => {},
            Params::Byte(b) => buf.push(*b),
            Params::Words(words) => {
                for w in words {
                    buf.extend_from_slice(&w.to_le_bytes());
                }
            },
        }
    }

    fn read_from(bytes: &[u8], len_field: u8) -> Result<Self, ProtocolError> {
        match bytes.len() {
            0 => Ok(Params::None),
            1 => Ok(Params::Byte(bytes[0])),
            n if n % 2 == 0 => Ok(Params::Words(
                bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            )),
            _ => Err(ProtocolError::InvalidLength(len_field)),
        }
    }
}

/// 总线舵机帧
///
/// `(id, command, params)` 三元组。编码后得到不可变的 [`FrameBytes`]。
///
/// # 示例
///
/// ```rust
/// use robohat_protocol::{Command, Params, ServoFrame};
///
/// let frame = ServoFrame::new(1, Command::MoveTimeWrite, Params::pair(500, 1000));
/// let bytes = frame.encode().unwrap();
/// assert_eq!(
///     bytes.as_slice(),
///     &[0x55, 0x55, 0x01, 0x07, 0x01, 0xF4, 0x01, 0xE8, 0x03, 0x16]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoFrame {
    /// 舵机 ID（0-253，254 为广播）
    pub id: u8,
    /// 指令码
    pub command: Command,
    /// 参数
    pub params: Params,
}

impl ServoFrame {
    /// 创建帧
    pub fn new(id: u8, command: Command, params: Params) -> Self {
        Self {
            id,
            command,
            params,
        }
    }

    /// 创建无参数帧（读请求、停止等）
    pub fn request(id: u8, command: Command) -> Self {
        Self::new(id, command, Params::None)
    }

    /// 编码为字节序列
    ///
    /// # 错误
    /// - `PayloadTooLong`: 参数字节数使长度字段溢出
    pub fn encode(&self) -> Result<FrameBytes, ProtocolError> {
        let param_len = self.params.byte_len();
        if param_len > (u8::MAX - LENGTH_OVERHEAD) as usize {
            return Err(ProtocolError::PayloadTooLong(param_len));
        }

        let mut buf = FrameBytes::new();
        buf.push(FRAME_HEADER);
        buf.push(FRAME_HEADER);
        buf.push(self.id);
        buf.push(param_len as u8 + LENGTH_OVERHEAD);
        buf.push(self.command.code());
        self.params.write_to(&mut buf);
        let sum = checksum(&buf[2..]);
        buf.push(sum);
        Ok(buf)
    }

    /// 从字节序列解析一帧
    ///
    /// 只消费长度字段声明的字节，多余的尾部字节被忽略。
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < MIN_RESPONSE_LEN {
            return Err(ProtocolError::Truncated {
                expected: MIN_RESPONSE_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != FRAME_HEADER || bytes[1] != FRAME_HEADER {
            return Err(ProtocolError::BadHeader([bytes[0], bytes[1]]));
        }

        let len_field = bytes[3];
        if len_field < LENGTH_OVERHEAD {
            return Err(ProtocolError::InvalidLength(len_field));
        }
        let total = len_field as usize + 3;
        if bytes.len() < total {
            return Err(ProtocolError::Truncated {
                expected: total,
                actual: bytes.len(),
            });
        }

        let expected = checksum(&bytes[2..total - 1]);
        let actual = bytes[total - 1];
        if expected != actual {
            return Err(ProtocolError::BadChecksum { expected, actual });
        }

        let command =
            Command::try_from(bytes[4]).map_err(|_| ProtocolError::UnknownCommand(bytes[4]))?;
        let params = Params::read_from(&bytes[5..total - 1], len_field)?;

        Ok(Self {
            id: bytes[2],
            command,
            params,
        })
    }
}
