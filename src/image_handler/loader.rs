//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / Data URL / 内存字节）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 同步读取。
//! - Data URL：格式解析 + 解码前体积预估 + 解码后体积限制。
//! - 内存字节：体积限制。
//! - 所有来源最后都做一次文件签名（magic bytes）校验，并确定声明的 MIME 类型。
//!
//! 空内容、无法识别的签名、Base64 损坏都归为 `Decode`：对调用方而言它们都是“无法解码的输入”。

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::source::{ImageBuffer, ImageSource};
use super::{ImageConfig, ImageError, ImageHandler};

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

impl ImageHandler {
    /// 按来源加载原始字节。
    pub(crate) fn load_source(source: ImageSource, config: &ImageConfig) -> Result<ImageBuffer, ImageError> {
        match source {
            ImageSource::FilePath(path) => Self::load_from_file(&path, config),
            ImageSource::DataUrl(data) => Self::load_from_data_url(&data, config),
            ImageSource::Bytes { bytes, format } => Self::load_from_bytes(bytes, &format, config),
        }
    }

    /// 从本地路径加载图片原始字节。
    pub(super) fn load_from_file(path: &Path, config: &ImageConfig) -> Result<ImageBuffer, ImageError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(ImageError::FileSystem(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        Self::validate_file_size(metadata.len(), config, "文件过大")?;

        let bytes = std::fs::read(path)
            .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;
        let format = Self::sniff_image_mime(&bytes)?;

        Ok(ImageBuffer {
            bytes: Bytes::from(bytes),
            format,
            source_hint: "file",
        })
    }

    /// 从 Data URL 加载图片原始字节。
    pub(super) fn load_from_data_url(data: &str, config: &ImageConfig) -> Result<ImageBuffer, ImageError> {
        log::info!("📝 开始处理 Data URL 图片");

        let (declared, payload) = Self::split_data_url(data)?;
        let bytes = Self::parse_base64_with_limit(payload, config.max_file_size)?;
        Self::validate_file_size(bytes.len() as u64, config, "Base64 解码后体积过大")?;

        let sniffed = Self::sniff_image_mime(&bytes)?;
        let format = declared
            .filter(|mime| mime.starts_with("image/"))
            .map(str::to_string)
            .unwrap_or(sniffed);

        Ok(ImageBuffer {
            bytes: Bytes::from(bytes),
            format,
            source_hint: "data-url",
        })
    }

    /// 从内存字节加载。声明格式为空时以签名推断结果为准。
    pub(super) fn load_from_bytes(
        bytes: Bytes,
        format: &str,
        config: &ImageConfig,
    ) -> Result<ImageBuffer, ImageError> {
        Self::validate_file_size(bytes.len() as u64, config, "图片体积过大")?;

        let sniffed = Self::sniff_image_mime(&bytes)?;
        let format = if format.trim().is_empty() {
            sniffed
        } else {
            format.trim().to_ascii_lowercase()
        };

        Ok(ImageBuffer {
            bytes,
            format,
            source_hint: "bytes",
        })
    }

    fn validate_file_size(len: u64, config: &ImageConfig, label: &str) -> Result<(), ImageError> {
        if len > config.max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "{}：{:.2} MB（限制：{:.2} MB）",
                label,
                len as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    /// 拆分 Data URL，返回（声明的 MIME，Base64 负载）。
    ///
    /// 不带 `data:` 前缀的输入按纯 Base64 处理。
    fn split_data_url(data: &str) -> Result<(Option<&str>, &str), ImageError> {
        let normalized = data.trim();

        let Some(rest) = normalized.strip_prefix(DATA_URL_PREFIX) else {
            return Ok((None, normalized));
        };

        let marker = rest
            .find(BASE64_MARKER)
            .ok_or_else(|| ImageError::Decode("Data URL 缺少 base64 标记".to_string()))?;

        let mime = &rest[..marker];
        let payload = &rest[marker + BASE64_MARKER.len()..];
        Ok(((!mime.is_empty()).then_some(mime), payload))
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    fn parse_base64_with_limit(payload: &str, max_file_size: u64) -> Result<Vec<u8>, ImageError> {
        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(payload)?;
        if estimated_len > max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名（magic bytes）校验输入是否为图片，并返回推断出的 MIME。
    fn sniff_image_mime(bytes: &[u8]) -> Result<String, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(kind.mime_type().to_string())
    }
}
