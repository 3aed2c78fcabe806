//! # 图片获取边界
//!
//! ## 设计思路
//!
//! 相机、相册与文件选择框都是外部能力，这里只定义它们需要满足的接口：
//! - `PermissionProvider`：查询 / 申请相机权限
//! - `ImagePicker`：弹出选择界面，返回来源或 `None`（用户取消）
//!
//! `Acquisition` 负责平台分支与权限流程：原生平台先查权限，未授权时最多申请一次；
//! 非原生平台直接走文件选择框，并同步读取所选文件内容。

use std::collections::VecDeque;
use std::path::PathBuf;

use super::selection::{MultiSelection, SelectionOutcome};
use super::source::{ImageBuffer, ImageSource};
use super::{ImageConfig, ImageError, ImageHandler};

/// 相机权限状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// 尚未询问过用户。
    Prompt,
}

/// 运行平台。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// 原生壳（可调用相机插件，需要权限）。
    Native,
    /// 浏览器 / 桌面文件选择框。
    #[default]
    Web,
}

pub trait PermissionProvider {
    fn check(&self) -> PermissionStatus;
    fn request(&self) -> PermissionStatus;
}

pub trait ImagePicker {
    /// 选择或拍摄一张图片；`Ok(None)` 表示用户取消。
    fn pick(&mut self) -> Result<Option<ImageSource>, ImageError>;

    /// 多选。默认实现退化为单选。
    fn pick_many(&mut self) -> Result<Vec<ImageSource>, ImageError> {
        Ok(self.pick()?.into_iter().collect())
    }
}

/// 非原生平台无需权限。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPermissionRequired;

impl PermissionProvider for NoPermissionRequired {
    fn check(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

/// 确保相机权限可用；未授权时最多申请一次。
pub fn ensure_permission<P>(permissions: &P) -> Result<(), ImageError>
where
    P: PermissionProvider + ?Sized,
{
    if permissions.check() == PermissionStatus::Granted {
        return Ok(());
    }

    log::info!("🔐 相机权限未授予，发起权限申请");
    match permissions.request() {
        PermissionStatus::Granted => Ok(()),
        status => {
            log::warn!("⚠️ 相机权限申请被拒绝：{:?}", status);
            Err(ImageError::PermissionDenied("需要相机权限".to_string()))
        }
    }
}

/// 文件选择框的桌面替身：按顺序弹出预先给定的来源。
#[derive(Debug, Clone, Default)]
pub struct FileInputPicker {
    queue: VecDeque<ImageSource>,
}

impl FileInputPicker {
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = ImageSource>,
    {
        Self {
            queue: sources.into_iter().collect(),
        }
    }

    /// 从命令行参数构造：`data:` 开头视为 Data URL，其余视为文件路径。
    pub fn from_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(inputs.into_iter().map(|input| {
            let input = input.as_ref();
            if input.trim_start().starts_with("data:") {
                ImageSource::DataUrl(input.to_string())
            } else {
                ImageSource::FilePath(PathBuf::from(input))
            }
        }))
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl ImagePicker for FileInputPicker {
    fn pick(&mut self) -> Result<Option<ImageSource>, ImageError> {
        Ok(self.queue.pop_front())
    }

    fn pick_many(&mut self) -> Result<Vec<ImageSource>, ImageError> {
        Ok(self.queue.drain(..).collect())
    }
}

/// 平台分支 + 权限流程。
pub struct Acquisition<P, C, F> {
    platform: Platform,
    permissions: P,
    camera: C,
    file_input: F,
}

impl<P, C, F> Acquisition<P, C, F>
where
    P: PermissionProvider,
    C: ImagePicker,
    F: ImagePicker,
{
    pub fn new(platform: Platform, permissions: P, camera: C, file_input: F) -> Self {
        Self {
            platform,
            permissions,
            camera,
            file_input,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// 选择或拍摄一张图片，返回来源（尚未读取内容）。
    pub fn pick_source(&mut self) -> Result<ImageSource, ImageError> {
        let picked = match self.platform {
            Platform::Native => {
                ensure_permission(&self.permissions)?;
                self.camera.pick()?
            }
            Platform::Web => self.file_input.pick()?,
        };

        picked.ok_or_else(|| ImageError::UserCancelled("未选择图片".to_string()))
    }

    /// 选择或拍摄一张图片并读取为 `ImageBuffer`。
    pub fn pick_or_capture(&mut self, config: &ImageConfig) -> Result<ImageBuffer, ImageError> {
        let source = self.pick_source()?;
        ImageHandler::load_source(source, config)
    }

    /// 多选并合并进已有选择（去重 + 上限截断）。
    pub fn pick_many_into(&mut self, selection: &mut MultiSelection) -> Result<SelectionOutcome, ImageError> {
        let picked = match self.platform {
            Platform::Native => {
                ensure_permission(&self.permissions)?;
                self.camera.pick_many()?
            }
            Platform::Web => self.file_input.pick_many()?,
        };

        if picked.is_empty() {
            return Err(ImageError::UserCancelled("未选择图片".to_string()));
        }

        Ok(selection.extend(&picked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::test_support::create_png_bytes;
    use std::cell::Cell;

    struct ScriptedPermissions {
        initial: PermissionStatus,
        after_request: PermissionStatus,
        requests: Cell<u32>,
    }

    impl ScriptedPermissions {
        fn new(initial: PermissionStatus, after_request: PermissionStatus) -> Self {
            Self {
                initial,
                after_request,
                requests: Cell::new(0),
            }
        }
    }

    impl PermissionProvider for ScriptedPermissions {
        fn check(&self) -> PermissionStatus {
            self.initial
        }

        fn request(&self) -> PermissionStatus {
            self.requests.set(self.requests.get() + 1);
            self.after_request
        }
    }

    #[test]
    fn granted_permission_skips_request() {
        let permissions = ScriptedPermissions::new(PermissionStatus::Granted, PermissionStatus::Denied);
        ensure_permission(&permissions).expect("already granted");
        assert_eq!(permissions.requests.get(), 0);
    }

    #[test]
    fn denied_permission_is_requested_exactly_once() {
        let permissions = ScriptedPermissions::new(PermissionStatus::Prompt, PermissionStatus::Denied);
        let result = ensure_permission(&permissions);

        assert!(matches!(result, Err(ImageError::PermissionDenied(_))));
        assert_eq!(permissions.requests.get(), 1);
    }

    #[test]
    fn native_platform_denied_never_opens_camera() {
        let permissions = ScriptedPermissions::new(PermissionStatus::Denied, PermissionStatus::Denied);
        let camera = FileInputPicker::from_inputs(["camera.jpg"]);
        let mut acquisition =
            Acquisition::new(Platform::Native, permissions, camera, FileInputPicker::default());

        let result = acquisition.pick_source();

        assert!(matches!(result, Err(ImageError::PermissionDenied(_))));
        assert_eq!(acquisition.camera.remaining(), 1);
    }

    #[test]
    fn empty_picker_is_user_cancelled() {
        let mut acquisition = Acquisition::new(
            Platform::Web,
            NoPermissionRequired,
            FileInputPicker::default(),
            FileInputPicker::default(),
        );

        assert!(matches!(acquisition.pick_source(), Err(ImageError::UserCancelled(_))));
    }

    #[test]
    fn web_platform_reads_selected_file() {
        let path = std::env::temp_dir().join(format!(
            "picture_uploader_acquire_{}.png",
            std::process::id()
        ));
        std::fs::write(&path, create_png_bytes(16, 16)).expect("write temp png");

        let file_input = FileInputPicker::new([ImageSource::FilePath(path.clone())]);
        let mut acquisition =
            Acquisition::new(Platform::Web, NoPermissionRequired, FileInputPicker::default(), file_input);

        let buffer = acquisition
            .pick_or_capture(&ImageConfig::default())
            .expect("file input should load");
        let _ = std::fs::remove_file(&path);

        assert_eq!(buffer.format, "image/png");
        assert_eq!(buffer.source_hint, "file");
    }

    #[test]
    fn from_inputs_detects_data_urls() {
        let mut picker = FileInputPicker::from_inputs(["data:image/png;base64,AAAA", "photo.jpg"]);

        assert!(matches!(picker.pick(), Ok(Some(ImageSource::DataUrl(_)))));
        assert!(matches!(picker.pick(), Ok(Some(ImageSource::FilePath(_)))));
        assert!(matches!(picker.pick(), Ok(None)));
    }

    #[test]
    fn pick_many_merges_with_dedupe_and_cap() {
        let first: Vec<String> = (0..6).map(|i| format!("{}.jpg", i)).collect();
        let second: Vec<String> = (3..12).map(|i| format!("{}.jpg", i)).collect();
        let mut selection = MultiSelection::default();

        let mut acquisition = Acquisition::new(
            Platform::Web,
            NoPermissionRequired,
            FileInputPicker::default(),
            FileInputPicker::from_inputs(&first),
        );
        acquisition.pick_many_into(&mut selection).expect("first batch");

        let mut acquisition = Acquisition::new(
            Platform::Web,
            NoPermissionRequired,
            FileInputPicker::default(),
            FileInputPicker::from_inputs(&second),
        );
        let outcome = acquisition.pick_many_into(&mut selection).expect("second batch");

        let expected: Vec<ImageSource> = (0..10)
            .map(|i| ImageSource::FilePath(PathBuf::from(format!("{}.jpg", i))))
            .collect();
        assert_eq!(selection.items(), expected.as_slice());
        assert_eq!(outcome.duplicates, 3);
        assert_eq!(outcome.dropped, 2);
    }
}
