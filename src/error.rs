//! 统一错误处理框架
//!
//! FLAC ⇄ PCM 转换链路上所有可恢复错误的统一类型定义。
//! 内部不变量（如未知位深）由 [`BitDepth`](crate::audio::BitDepth) 的封闭枚举在类型层面排除。

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// 被包装的底层错误（symphonia、I/O 等）
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// 音频处理相关的统一错误类型
#[derive(Debug)]
pub enum AudioError {
    /// 位深不在 {4, 8, 12, 16, 20, 24, 32} 之内
    UnsupportedBitDepth(u32),

    /// 打开码流、读取元数据或读取后续帧失败
    ReadFailure {
        context: String,
        source: Option<BoxedCause>,
    },

    /// 编码输入长度不是整帧字节数的整数倍
    LengthMismatch { pcm_len: usize, frame_size: usize },

    /// 输入验证错误（采样率、声道数、块大小等）
    InvalidInput(String),

    /// 编码协作方报告的失败
    EncodingError(String),

    /// 文件I/O错误
    IoError(io::Error),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::UnsupportedBitDepth(bits) => {
                write!(f, "不支持的位深度 / unsupported bit depth: {bits}")
            }
            AudioError::ReadFailure {
                context,
                source: Some(cause),
            } => write!(f, "读取失败 / read failure: {context}: {cause}"),
            AudioError::ReadFailure {
                context,
                source: None,
            } => write!(f, "读取失败 / read failure: {context}"),
            AudioError::LengthMismatch {
                pcm_len,
                frame_size,
            } => write!(
                f,
                "PCM长度不是帧大小的整数倍 / pcm length is not a multiple of frame size: pcm={pcm_len}, frame={frame_size}"
            ),
            AudioError::InvalidInput(msg) => write!(f, "输入验证失败: {msg}"),
            AudioError::EncodingError(msg) => write!(f, "编码失败: {msg}"),
            AudioError::IoError(err) => write!(f, "文件I/O错误: {err}"),
        }
    }
}

impl StdError for AudioError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AudioError::IoError(err) => Some(err),
            AudioError::ReadFailure {
                source: Some(cause),
                ..
            } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for AudioError {
    fn from(err: io::Error) -> Self {
        AudioError::IoError(err)
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io_err) => AudioError::IoError(io_err),
            other => AudioError::InvalidInput(format!("WAV处理错误: {other}")),
        }
    }
}

/// 音频处理操作的标准Result类型
pub type AudioResult<T> = Result<T, AudioError>;

// ==================== 错误转换Helper函数 ====================
// 消除重复的 .map_err(|e| AudioError::XXX(...)) 模式

/// 创建读取失败错误（保留底层原因）
#[inline]
pub fn read_failure<E>(context: &str, err: E) -> AudioError
where
    E: Into<BoxedCause>,
{
    AudioError::ReadFailure {
        context: context.to_string(),
        source: Some(err.into()),
    }
}

/// 创建无底层原因的读取失败错误
#[inline]
pub fn read_failure_msg(context: impl Into<String>) -> AudioError {
    AudioError::ReadFailure {
        context: context.into(),
        source: None,
    }
}

/// 创建编码错误的helper函数
///
/// flacenc的错误类型只保证实现 `Debug`。
#[inline]
pub fn encoding_error<E: fmt::Debug>(context: &str, err: E) -> AudioError {
    AudioError::EncodingError(format!("{context}: {err:?}"))
}

// ==================== 错误分类系统 ====================
// CLI根据类别选择退出码和建议

/// 错误类别枚举
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ErrorCategory {
    /// 格式相关错误（不支持的位深、长度不匹配等）
    Format,
    /// 解码相关错误（码流损坏、读取失败）
    Decoding,
    /// 编码相关错误
    Encoding,
    /// I/O相关错误（文件不存在、权限不足等）
    Io,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从AudioError提取错误类别
    pub fn from_audio_error(e: &AudioError) -> Self {
        match e {
            AudioError::UnsupportedBitDepth(_) | AudioError::LengthMismatch { .. } => Self::Format,
            AudioError::ReadFailure { .. } => Self::Decoding,
            AudioError::EncodingError(_) => Self::Encoding,
            AudioError::IoError(_) => Self::Io,
            AudioError::InvalidInput(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Format => "格式错误",
            Self::Decoding => "解码错误",
            Self::Encoding => "编码错误",
            Self::Io => "I/O错误",
            Self::Other => "其他错误",
        }
    }
}
