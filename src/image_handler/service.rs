//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `ImageServiceState` 作为一个画面实例的服务入口，替代全局单例：
//! 1. 生命周期清晰（由 `main.rs` 统一构造，上传客户端显式传入）
//! 2. 测试可创建独立实例，减少共享状态副作用
//!
//! ## 实现思路
//!
//! 对外仅暴露少量稳定 API：
//! - `select_source` / `acquire_and_select`：选择 → 缩放 → 更新画面
//! - `select_many`：多选合并（去重 + 上限）
//! - `upload_current`：上传当前图片
//! - `remove_photo` / `snapshot` / `drain_notices`：画面操作与展示
//!
//! 画面状态使用 `std::sync::Mutex`，锁从不跨越 `.await` 持有。

use std::sync::{Mutex, MutexGuard};

use super::acquisition::{Acquisition, ImagePicker, PermissionProvider};
use super::screen::{Notice, PictureScreen, ScreenSnapshot};
use super::selection::{MultiSelection, SelectionOutcome};
use super::source::{ResizedImage, UploadAck};
use super::{
    ImageConfig, ImageError, ImageHandler, ImagePerformanceProfile, ImageSource, ResizePolicy,
    UploadClient,
};

/// 图片处理服务状态。
pub struct ImageServiceState {
    handler: ImageHandler,
    policy: ResizePolicy,
    uploader: Option<UploadClient>,
    screen: Mutex<PictureScreen>,
    selection: Mutex<MultiSelection>,
}

impl ImageServiceState {
    /// 使用默认配置创建服务状态（未配置上传）。
    pub fn new() -> Self {
        Self::with_config(ImageConfig::default(), ResizePolicy::default())
    }

    /// 使用自定义配置创建服务状态。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use picture_uploader::image_handler::{ImageConfig, ImageServiceState, ResizePolicy, UploadClient};
    ///
    /// let config = ImageConfig::default();
    /// let uploader = UploadClient::new("https://example.com/api", &config)?;
    /// let service = ImageServiceState::with_config(config, ResizePolicy::default())
    ///     .with_uploader(uploader);
    /// # Ok::<(), picture_uploader::image_handler::ImageError>(())
    /// ```
    pub fn with_config(config: ImageConfig, policy: ResizePolicy) -> Self {
        Self {
            handler: ImageHandler::new(config),
            policy,
            uploader: None,
            screen: Mutex::new(PictureScreen::new()),
            selection: Mutex::new(MultiSelection::default()),
        }
    }

    pub fn with_uploader(mut self, uploader: UploadClient) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    fn screen(&self) -> Result<MutexGuard<'_, PictureScreen>, ImageError> {
        self.screen
            .lock()
            .map_err(|_| ImageError::ResourceLimit("画面状态锁已中毒".to_string()))
    }

    fn selection(&self) -> Result<MutexGuard<'_, MultiSelection>, ImageError> {
        self.selection
            .lock()
            .map_err(|_| ImageError::ResourceLimit("多选状态锁已中毒".to_string()))
    }

    /// 执行完整选择流程：加载 → 缩放 → 更新画面。
    ///
    /// 结果被更新的选择取代时返回 `UserCancelled`，画面保持更新选择的结果。
    pub async fn select_source(&self, source: ImageSource) -> Result<ResizedImage, ImageError> {
        self.select_source_with_policy(source, self.policy).await
    }

    pub async fn select_source_with_policy(
        &self,
        source: ImageSource,
        policy: ResizePolicy,
    ) -> Result<ResizedImage, ImageError> {
        let ticket = self.screen()?.begin_selection();
        log::info!("🖼️ 开始处理选择的图片 - 来源: {}", source.hint());

        let result = self.handler.load_and_transform(source, policy).await;

        let applied = self.screen()?.complete_transform(ticket, result.clone());
        if !applied {
            return Err(ImageError::UserCancelled("已被新的选择取代".to_string()));
        }

        result
    }

    /// 通过获取能力选择或拍摄一张图片，然后走完整选择流程。
    pub async fn acquire_and_select<P, C, F>(
        &self,
        acquisition: &mut Acquisition<P, C, F>,
    ) -> Result<ResizedImage, ImageError>
    where
        P: PermissionProvider,
        C: ImagePicker,
        F: ImagePicker,
    {
        let source = match acquisition.pick_source() {
            Ok(source) => source,
            Err(err) => {
                self.screen()?.fail_acquisition(err.clone());
                return Err(err);
            }
        };

        self.select_source(source).await
    }

    /// 多选合并。超出上限的部分被丢弃，并给出一条提示。
    pub fn select_many(&self, sources: &[ImageSource]) -> Result<SelectionOutcome, ImageError> {
        let outcome = self.selection()?.extend(sources);

        if outcome.dropped > 0 {
            let limit = ImageError::SelectionLimitExceeded(format!(
                "最多保留 {} 张，已忽略 {} 张",
                outcome.selected.len(),
                outcome.dropped
            ));
            self.screen()?.push_notice(Notice::error(limit.to_string()));
        }

        Ok(outcome)
    }

    pub fn selected_sources(&self) -> Result<Vec<ImageSource>, ImageError> {
        Ok(self.selection()?.items().to_vec())
    }

    /// 上传当前图片。单次尝试，不重试。
    pub async fn upload_current(&self) -> Result<UploadAck, ImageError> {
        let uploader = self
            .uploader
            .as_ref()
            .ok_or_else(|| ImageError::InvalidFormat("未配置上传地址".to_string()))?;

        let (ticket, photo) = self.screen()?.begin_upload()?;
        let result = uploader.upload(&photo).await;
        self.screen()?.complete_upload(ticket, result.clone());

        result
    }

    /// 移除当前图片与多选结果。
    pub fn remove_photo(&self) -> Result<(), ImageError> {
        self.screen()?.remove_photo();
        self.selection()?.clear();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<ScreenSnapshot, ImageError> {
        Ok(self.screen()?.snapshot())
    }

    pub fn drain_notices(&self) -> Result<Vec<Notice>, ImageError> {
        Ok(self.screen()?.drain_notices())
    }

    /// 设置性能档位。
    pub fn set_performance_profile(&self, profile: &str) -> Result<(), ImageError> {
        let profile = ImagePerformanceProfile::from_str(profile)?;
        self.handler.set_performance_profile(profile)
    }

    /// 获取当前生效性能档位（字符串）。
    pub fn get_performance_profile(&self) -> Result<String, ImageError> {
        let profile = self.handler.get_performance_profile()?;
        Ok(profile.as_str().to_string())
    }
}

impl Default for ImageServiceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::acquisition::{FileInputPicker, NoPermissionRequired, Platform};
    use crate::image_handler::screen::{NoticeLevel, ScreenPhase};
    use crate::image_handler::test_support::create_png_bytes;
    use bytes::Bytes;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    fn png_source(width: u32, height: u32) -> ImageSource {
        ImageSource::Bytes {
            bytes: Bytes::from(create_png_bytes(width, height)),
            format: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn select_updates_snapshot_and_notices() {
        let service = ImageServiceState::new();

        let resized = service.select_source(png_source(640, 480)).await.expect("select");
        let snapshot = service.snapshot().expect("snapshot");

        assert_eq!(snapshot.phase, ScreenPhase::Transformed);
        assert_eq!(snapshot.photo, Some(resized));
        assert!(snapshot.size_report.is_some());

        let notices = service.drain_notices().expect("notices");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn corrupt_selection_keeps_previous_photo() {
        let service = ImageServiceState::new();
        let first = service.select_source(png_source(300, 200)).await.expect("first select");

        let corrupt = ImageSource::Bytes {
            bytes: Bytes::from_static(b"corrupt bytes"),
            format: "image/jpeg".to_string(),
        };
        let result = service.select_source(corrupt).await;

        assert!(matches!(result, Err(ImageError::Decode(_))));
        let snapshot = service.snapshot().expect("snapshot");
        assert_eq!(snapshot.phase, ScreenPhase::Transformed);
        assert_eq!(snapshot.photo, Some(first));
    }

    #[tokio::test]
    async fn upload_without_uploader_is_config_error() {
        let service = ImageServiceState::new();
        service.select_source(png_source(64, 64)).await.expect("select");

        assert!(matches!(
            service.upload_current().await,
            Err(ImageError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_acquisition_surfaces_notice() {
        let service = ImageServiceState::new();
        let mut acquisition = Acquisition::new(
            Platform::Web,
            NoPermissionRequired,
            FileInputPicker::default(),
            FileInputPicker::default(),
        );

        let result = service.acquire_and_select(&mut acquisition).await;

        assert!(matches!(result, Err(ImageError::UserCancelled(_))));
        let notices = service.drain_notices().expect("notices");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(service.snapshot().expect("snapshot").phase, ScreenPhase::Idle);
    }

    #[tokio::test]
    async fn cancelled_acquisition_does_not_discard_pending_selection() {
        let service = ImageServiceState::new();
        let mut acquisition = Acquisition::new(
            Platform::Web,
            NoPermissionRequired,
            FileInputPicker::default(),
            FileInputPicker::default(),
        );

        let pending = service.select_source(png_source(640, 480));
        let cancelled = async {
            tokio::task::yield_now().await;
            service.acquire_and_select(&mut acquisition).await
        };
        let (selected, cancelled) = tokio::join!(pending, cancelled);

        assert!(matches!(cancelled, Err(ImageError::UserCancelled(_))));
        let selected = selected.expect("pending selection must still be applied");

        let snapshot = service.snapshot().expect("snapshot");
        assert_eq!(snapshot.phase, ScreenPhase::Transformed);
        assert_eq!(snapshot.photo, Some(selected));
    }

    #[test]
    fn select_many_drops_excess_with_notice() {
        let service = ImageServiceState::new();
        let sources: Vec<_> = (0..11)
            .map(|i| ImageSource::FilePath(PathBuf::from(format!("{}.jpg", i))))
            .collect();

        let outcome = service.select_many(&sources).expect("select many");

        assert_eq!(outcome.selected.len(), 10);
        assert_eq!(service.selected_sources().expect("selected").len(), 10);
        let notices = service.drain_notices().expect("notices");
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("选择数量超出上限"));
    }

    #[tokio::test]
    async fn remove_photo_clears_screen_and_selection() {
        let service = ImageServiceState::new();
        service.select_source(png_source(64, 64)).await.expect("select");
        service
            .select_many(&[ImageSource::FilePath(PathBuf::from("a.jpg"))])
            .expect("select many");

        service.remove_photo().expect("remove");

        let snapshot = service.snapshot().expect("snapshot");
        assert_eq!(snapshot.phase, ScreenPhase::Idle);
        assert!(snapshot.photo.is_none());
        assert!(service.selected_sources().expect("selected").is_empty());
    }

    #[test]
    fn service_profile_concurrent_access() {
        let service = Arc::new(ImageServiceState::new());

        let mut handles = Vec::new();
        for worker_id in 0..4 {
            let service = Arc::clone(&service);
            handles.push(thread::spawn(move || {
                let profiles = ["quality", "balanced", "speed"];
                for i in 0..50 {
                    let profile = profiles[(worker_id + i) % profiles.len()];
                    service.set_performance_profile(profile).expect("set profile should succeed");

                    let current = service.get_performance_profile().expect("get profile should succeed");
                    assert!(matches!(current.as_str(), "quality" | "balanced" | "speed"));
                }
            }));
        }

        for handle in handles {
            handle.join().expect("worker thread should not panic");
        }

        assert!(matches!(
            service.set_performance_profile("ultra"),
            Err(ImageError::InvalidFormat(_))
        ));
    }
}
