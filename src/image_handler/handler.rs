//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排与配置管理，不直接与界面状态绑定。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节
//! 3. 解码、缩放并编码为 JPEG
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ImageConfig>>` 支持运行时动态切档。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 加载与缩放都是 CPU / 阻塞 IO，放到 `spawn_blocking` 中执行，作为异步任务的挂起点。
//! - 记录 `load/transform/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::source::{ImageBuffer, ResizedImage};
use super::{ImageConfig, ImageError, ImagePerformanceProfile, ImageSource, ResizePolicy};

/// 图片处理器。
pub struct ImageHandler {
    pub(super) config: Arc<RwLock<ImageConfig>>,
}

impl ImageHandler {
    /// 根据初始配置创建处理器。
    pub fn new(config: ImageConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<ImageConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 设置性能档位。
    pub fn set_performance_profile(&self, profile: ImagePerformanceProfile) -> Result<(), ImageError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_performance_profile(profile);

        log::info!(
            "⚙️ 已切换图片性能档位：{:?}（filter={:?}）",
            profile,
            config.resize_filter
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_performance_profile(&self) -> Result<ImagePerformanceProfile, ImageError> {
        let config = self
            .config
            .read()
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_performance_profile())
    }

    /// 处理主入口：从任意来源加载并缩放图片。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use picture_uploader::image_handler::{ImageConfig, ImageHandler, ImageSource, ResizePolicy};
    ///
    /// # async fn demo() -> Result<(), picture_uploader::image_handler::ImageError> {
    /// let handler = ImageHandler::new(ImageConfig::default());
    /// let resized = handler
    ///     .load_and_transform(ImageSource::FilePath("photo.jpg".into()), ResizePolicy::default())
    ///     .await?;
    /// assert_eq!((resized.width, resized.height), (224, 224));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_and_transform(
        &self,
        source: ImageSource,
        policy: ResizePolicy,
    ) -> Result<ResizedImage, ImageError> {
        let config = self.config_snapshot()?;

        tokio::task::spawn_blocking(move || {
            let total_start = Instant::now();

            let load_start = Instant::now();
            let buffer = Self::load_source(source, &config)?;
            let load_elapsed = load_start.elapsed();

            let transform_start = Instant::now();
            let resized = Self::transform(buffer, &policy, &config)?;
            let transform_elapsed = transform_start.elapsed();

            log::info!(
                "✅ 图片处理完成 - load={}ms transform={}ms total={}ms",
                load_elapsed.as_millis(),
                transform_elapsed.as_millis(),
                total_start.elapsed().as_millis()
            );

            Ok(resized)
        })
        .await
        .map_err(|e| ImageError::Render(format!("缩放任务异常终止：{}", e)))?
    }

    /// 对已加载的缓冲执行缩放。
    pub async fn transform_buffer(
        &self,
        buffer: ImageBuffer,
        policy: ResizePolicy,
    ) -> Result<ResizedImage, ImageError> {
        let config = self.config_snapshot()?;

        tokio::task::spawn_blocking(move || Self::transform(buffer, &policy, &config))
            .await
            .map_err(|e| ImageError::Render(format!("缩放任务异常终止：{}", e)))?
    }
}
