//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中管理，保证运行时行为可观测、可调整、可测试。
//!
//! - `ImageConfig`：加载、解码、上传三个阶段的资源上限与超时。
//! - `ResizePolicy`：单次缩放的目标边长、JPEG 质量与裁剪策略，按次传入、不可变。
//! - `ImagePerformanceProfile`：高层语义档位（quality / balanced / speed），映射到重采样滤镜。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - `ResizePolicy::new` 负责参数校验，非法组合在构造时即失败。
//! - `infer_performance_profile` 用于从当前配置反推档位（给日志与 CLI 展示状态）。

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::ImageError;

/// 默认缩略图边长（像素）。
pub const DEFAULT_TARGET_EDGE: u32 = 224;
/// 默认 JPEG 质量（0.0–1.0）。
pub const DEFAULT_QUALITY: f32 = 0.9;

/// 图片处理配置。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 上传请求总超时（秒）。
    pub upload_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resize_filter: FilterType::Triangle,
            upload_timeout: 30,
            connect_timeout: 8,
        }
    }
}

/// 缩放策略。
///
/// 两种策略在历史版本中都出现过，这里作为显式配置项而不是隐式约定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// 等比放缩到短边等于目标边长，居中后裁掉溢出部分。
    #[default]
    CropToFill,
    /// 忽略宽高比直接拉伸到目标尺寸。
    StretchToFit,
}

impl ResizeMode {
    pub fn from_str(mode: &str) -> Result<Self, ImageError> {
        match mode.trim().to_lowercase().as_str() {
            "crop" | "crop_to_fill" | "crop-to-fill" => Ok(Self::CropToFill),
            "stretch" | "stretch_to_fit" | "stretch-to-fit" => Ok(Self::StretchToFit),
            other => Err(ImageError::InvalidFormat(format!(
                "未知缩放策略：{}（可选：crop / stretch）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CropToFill => "crop_to_fill",
            Self::StretchToFit => "stretch_to_fit",
        }
    }
}

/// 单次缩放参数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizePolicy {
    /// 输出正方形的边长（像素）。
    pub target_edge: u32,
    /// JPEG 质量，取值 `0.0..=1.0`。
    pub quality: f32,
    pub mode: ResizeMode,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self {
            target_edge: DEFAULT_TARGET_EDGE,
            quality: DEFAULT_QUALITY,
            mode: ResizeMode::CropToFill,
        }
    }
}

impl ResizePolicy {
    /// 构造并校验缩放参数。
    ///
    /// # 示例
    /// ```rust
    /// use picture_uploader::image_handler::{ResizeMode, ResizePolicy};
    ///
    /// let policy = ResizePolicy::new(224, 0.8, ResizeMode::StretchToFit)?;
    /// assert_eq!(policy.jpeg_quality(), 80);
    /// # Ok::<(), picture_uploader::image_handler::ImageError>(())
    /// ```
    pub fn new(target_edge: u32, quality: f32, mode: ResizeMode) -> Result<Self, ImageError> {
        let policy = Self {
            target_edge,
            quality,
            mode,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// 校验边长与质量范围。反序列化得到的策略在使用前也要走这里。
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.target_edge == 0 {
            return Err(ImageError::InvalidFormat("目标边长必须大于 0".to_string()));
        }
        if !self.quality.is_finite() || !(0.0..=1.0).contains(&self.quality) {
            return Err(ImageError::InvalidFormat(format!(
                "JPEG 质量必须在 0.0~1.0 之间：{}",
                self.quality
            )));
        }
        Ok(())
    }

    /// 映射到 JPEG 编码器使用的 `1..=100` 质量值。
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// 图片性能档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真
/// - `Balanced`：质量与性能平衡
/// - `Speed`：优先处理速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePerformanceProfile {
    Quality,
    Balanced,
    Speed,
}

impl ImagePerformanceProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use picture_uploader::image_handler::ImagePerformanceProfile;
    ///
    /// let p = ImagePerformanceProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), picture_uploader::image_handler::ImageError>(())
    /// ```
    pub fn from_str(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::InvalidFormat(format!(
                "未知性能档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ImageConfig {
    /// 基于当前滤镜反推性能档位。
    pub fn infer_performance_profile(&self) -> ImagePerformanceProfile {
        match self.resize_filter {
            FilterType::Lanczos3 | FilterType::CatmullRom | FilterType::Gaussian => {
                ImagePerformanceProfile::Quality
            }
            FilterType::Nearest => ImagePerformanceProfile::Speed,
            FilterType::Triangle => ImagePerformanceProfile::Balanced,
        }
    }

    /// 应用指定性能档位到实际参数。
    pub fn apply_performance_profile(&mut self, profile: ImagePerformanceProfile) {
        self.resize_filter = match profile {
            ImagePerformanceProfile::Quality => FilterType::Lanczos3,
            ImagePerformanceProfile::Balanced => FilterType::Triangle,
            ImagePerformanceProfile::Speed => FilterType::Nearest,
        };
    }
}
