//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义（文件 / Data URL / 内存字节）
//! - `ImageBuffer` 表示已加载但未解码的字节与声明格式，只被缩放阶段消费一次
//! - `ResizedImage` 表示可展示、可上传的 JPEG 结果

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::format_size;

/// 图片输入来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// 本地文件路径来源（相机/相册插件返回的路径，或文件选择框）。
    FilePath(PathBuf),
    /// `data:image/...;base64,` 形式的 Data URL（浏览器文件读取结果）。
    DataUrl(String),
    /// 已在内存中的字节与声明格式。
    Bytes { bytes: Bytes, format: String },
}

impl ImageSource {
    /// 多选去重使用的来源标识。
    ///
    /// 路径与 Data URL 直接使用原值；内存字节使用长度与整段内容的 SHA-256。
    pub fn identity(&self) -> String {
        match self {
            Self::FilePath(path) => format!("file:{}", path.display()),
            Self::DataUrl(data) => format!("data:{}", data),
            Self::Bytes { bytes, .. } => {
                format!("bytes:{}:{:x}", bytes.len(), Sha256::digest(bytes))
            }
        }
    }

    /// 用于日志的来源提示，不包含原始内容。
    pub fn hint(&self) -> &'static str {
        match self {
            Self::FilePath(_) => "file",
            Self::DataUrl(_) => "data-url",
            Self::Bytes { .. } => "bytes",
        }
    }
}

/// 加载阶段输出：原始编码字节与声明格式（MIME）。
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    /// 原始图片字节。
    pub bytes: Bytes,
    /// 声明的 MIME 类型，例如 `image/png`。
    pub format: String,
    /// 来源提示（用于日志与诊断）。
    pub source_hint: &'static str,
}

impl ImageBuffer {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 缩放阶段输出：固定尺寸的 JPEG 缓冲与前后体积。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedImage {
    /// JPEG 编码字节。
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    /// 输入缓冲的实际字节数。
    pub original_size: u64,
    /// 输出 JPEG 的实际字节数。
    pub resized_size: u64,
}

impl ResizedImage {
    pub const MIME: &'static str = "image/jpeg";

    pub fn size_report(&self) -> SizeReport {
        SizeReport {
            original: format_size(self.original_size),
            resized: format_size(self.resized_size),
        }
    }
}

/// 缩放前后体积的展示文本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeReport {
    pub original: String,
    pub resized: String,
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "原始大小: {} / 缩放后大小: {}", self.original, self.resized)
    }
}

/// 上传成功回执。响应体结构不做约束，只要求存在。
#[derive(Debug, Clone, PartialEq)]
pub struct UploadAck {
    pub status: u16,
    pub body: serde_json::Value,
}
