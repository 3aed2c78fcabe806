//! # 解码与变换流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 固定尺寸正方形 → JPEG”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 读取 header 尺寸并按像素/内存上限快速拒绝
//! 2. 完整解码（失败即 `Decode`）
//! 3. 按 `ResizeMode` 计算源图可见区域（裁剪填充 / 拉伸）
//! 4. `fast_image_resize` 缩放到 `T×T`，失败时回退 `image::imageops`
//! 5. 按质量编码为 JPEG，空输出视为 `Render`

use std::io::Cursor;

use bytes::Bytes;
use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageBuffer, Rgb, RgbImage};

use super::source::{ImageBuffer as EncodedBuffer, ResizedImage};
use super::{ImageConfig, ImageError, ImageHandler, ResizeMode, ResizePolicy};

/// 源图坐标系中参与缩放的矩形区域。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SourceRegion {
    pub(crate) left: f64,
    pub(crate) top: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
}

impl SourceRegion {
    fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: width as f64,
            height: height as f64,
        }
    }
}

/// 裁剪填充的可见区域。
///
/// 按 `scale = max(T/w, T/h)` 等比放缩后居中于 `T×T` 画布，
/// 画布内可见的源图部分恰好是居中的 `T/scale` 见方区域，即 `min(w, h)` 见方。
pub(crate) fn crop_to_fill_region(width: u32, height: u32, target: u32) -> SourceRegion {
    debug_assert!(target > 0);
    let (w, h) = (width as f64, height as f64);
    let side = w.min(h);

    SourceRegion {
        left: (w - side) / 2.0,
        top: (h - side) / 2.0,
        width: side,
        height: side,
    }
}

impl ImageHandler {
    /// 将原始字节变换为 `T×T` 的 JPEG。
    ///
    /// 输入缓冲被消费，变换完成后不再保留。
    pub(crate) fn transform(
        buffer: EncodedBuffer,
        policy: &ResizePolicy,
        config: &ImageConfig,
    ) -> Result<ResizedImage, ImageError> {
        policy.validate()?;

        let original_size = buffer.len() as u64;
        let source_hint = buffer.source_hint;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&buffer.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;
        Self::validate_decoded_memory_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&buffer.bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;
        drop(buffer);

        let (raw_width, raw_height) = decoded.dimensions();
        if raw_width == 0 || raw_height == 0 {
            return Err(ImageError::Decode("图片尺寸为 0".to_string()));
        }
        Self::validate_pixel_limits(config, raw_width, raw_height)?;

        let target = policy.target_edge;
        let region = match policy.mode {
            ResizeMode::CropToFill => crop_to_fill_region(raw_width, raw_height, target),
            ResizeMode::StretchToFit => SourceRegion::full(raw_width, raw_height),
        };

        let rendered = Self::render_square(&decoded, region, target, config.resize_filter)?;
        let jpeg = Self::encode_jpeg(&rendered, policy.jpeg_quality())?;
        let resized_size = jpeg.len() as u64;

        log::info!(
            "✅ 图片缩放完成 - 来源: {} 策略: {} 原始尺寸: {}x{} 输出尺寸: {}x{} 体积: {} -> {} bytes",
            source_hint,
            policy.mode.as_str(),
            raw_width,
            raw_height,
            target,
            target,
            original_size,
            resized_size
        );

        Ok(ResizedImage {
            bytes: Bytes::from(jpeg),
            width: rendered.width(),
            height: rendered.height(),
            original_size,
            resized_size,
        })
    }

    /// 仅通过内存中的图片头信息读取宽高。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Decode("图片内容为空".to_string()));
        }

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    fn validate_pixel_limits(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn validate_decoded_memory_limits(
        config: &ImageConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        let estimated = (width as u64)
            .checked_mul(height as u64)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

        if estimated > config.max_decoded_bytes {
            return Err(ImageError::ResourceLimit(format!(
                "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
                estimated as f64 / 1024.0 / 1024.0,
                config.max_decoded_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        Ok(())
    }

    /// 将源图区域绘制到 `target×target` 画布。
    fn render_square(
        image: &DynamicImage,
        region: SourceRegion,
        target: u32,
        filter: FilterType,
    ) -> Result<RgbImage, ImageError> {
        let rendered = match Self::resize_with_fast_image_resize(image, region, target, filter) {
            Ok(rendered) => rendered,
            Err(err) => {
                log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::imageops：{}", err);
                Self::resize_with_imageops(image, region, target, filter)
            }
        };

        if rendered.width() != target || rendered.height() != target {
            return Err(ImageError::Render(format!(
                "输出尺寸异常：{}x{}（期望 {}x{}）",
                rendered.width(),
                rendered.height(),
                target,
                target
            )));
        }

        Ok(rendered)
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        region: SourceRegion,
        target: u32,
        filter: FilterType,
    ) -> Result<RgbImage, ImageError> {
        let src = image.to_rgb8();
        let (src_width, src_height) = src.dimensions();

        let src_image =
            fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x3)
                .map_err(|e| ImageError::Render(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target, target, fr::PixelType::U8x3);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(Self::to_fast_filter(filter)))
            .crop(region.left, region.top, region.width, region.height);

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Render(format!("fast_image_resize 执行失败：{}", e)))?;

        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(target, target, dst_image.into_vec())
            .ok_or_else(|| ImageError::Render("fast_image_resize 输出缓冲长度异常".to_string()))
    }

    fn resize_with_imageops(
        image: &DynamicImage,
        region: SourceRegion,
        target: u32,
        filter: FilterType,
    ) -> RgbImage {
        let x = region.left.round() as u32;
        let y = region.top.round() as u32;
        let width = (region.width.round() as u32).max(1);
        let height = (region.height.round() as u32).max(1);

        image
            .crop_imm(x, y, width, height)
            .resize_exact(target, target, filter)
            .to_rgb8()
    }

    fn to_fast_filter(filter: FilterType) -> fr::FilterType {
        match filter {
            FilterType::Nearest => fr::FilterType::Box,
            FilterType::Triangle => fr::FilterType::Bilinear,
            FilterType::CatmullRom => fr::FilterType::CatmullRom,
            FilterType::Gaussian => fr::FilterType::Mitchell,
            FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .encode(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
            .map_err(|e| ImageError::Render(format!("JPEG 编码失败：{}", e)))?;

        if buf.is_empty() {
            return Err(ImageError::Render("JPEG 编码输出为空".to_string()));
        }

        Ok(buf)
    }
}
