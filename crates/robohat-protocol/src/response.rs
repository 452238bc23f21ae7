//! 读指令应答解码

use crate::frame::{FRAME_HEADER, MIN_RESPONSE_LEN, Params, ServoFrame};
use crate::{Command, ProtocolError};

/// 应答内容
///
/// 单字节参数（如 ID、温度、负载状态）按无符号值放入 `Value`，
/// 有符号语义（如偏差）由上层自行解释。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Response {
    /// 写入确认（长度字段为 3，无参数）
    Ack,
    /// 单个值
    Value(i16),
    /// 两个值（如 下限/上限、位置/时间）
    ValuePair(i16, i16),
}

/// 应答的参数形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseShape {
    Ack,
    Value,
    ValuePair,
}

impl Response {
    pub fn shape(self) -> ResponseShape {
        match self {
            Response::Ack => ResponseShape::Ack,
            Response::Value(_) => ResponseShape::Value,
            Response::ValuePair(..) => ResponseShape::ValuePair,
        }
    }

    /// 取单个值
    pub fn value(self) -> Option<i16> {
        match self {
            Response::Value(v) => Some(v),
            _ => None,
        }
    }

    /// 取一对值
    pub fn pair(self) -> Option<(i16, i16)> {
        match self {
            Response::ValuePair(a, b) => Some((a, b)),
            _ => None,
        }
    }
}

/// 解码读指令的应答
///
/// # 错误
/// - `BadHeader`: 帧头不匹配
/// - `CommandMismatch`: 应答的指令码与请求不一致
/// - `Truncated`: 可用字节少于长度字段声明
/// - `BadChecksum` / `InvalidLength` / `UnknownCommand`: 帧内容损坏
/// - `ShapeMismatch`: 读指令的应答参数个数与该指令不符
pub fn decode_response(bytes: &[u8], expected: Command) -> Result<Response, ProtocolError> {
    if bytes.len() < MIN_RESPONSE_LEN {
        return Err(ProtocolError::Truncated {
            expected: MIN_RESPONSE_LEN,
            actual: bytes.len(),
        });
    }
    if bytes[0] != FRAME_HEADER || bytes[1] != FRAME_HEADER {
        return Err(ProtocolError::BadHeader([bytes[0], bytes[1]]));
    }
    if bytes[4] != expected.code() {
        return Err(ProtocolError::CommandMismatch {
            expected: expected.code(),
            actual: bytes[4],
        });
    }

    let frame = ServoFrame::parse(bytes)?;
    let response = match frame.params {
        Params::None => Response::Ack,
        Params::Byte(b) => Response::Value(b as i16),
        Params::Words(words) => match words.as_slice() {
            [v] => Response::Value(*v as i16),
            [a, b] => Response::ValuePair(*a as i16, *b as i16),
            _ => return Err(ProtocolError::InvalidLength(bytes[3])),
        },
    };

    match expected.response_shape() {
        Some(shape) if shape != response.shape() => Err(ProtocolError::ShapeMismatch {
            command: expected.code(),
            expected: shape,
            actual: response.shape(),
        }),
        _ => Ok(response),
    }
}
