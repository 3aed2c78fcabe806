//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“图片获取 → 加载校验 → 解码缩放编码 → 上传 → 画面状态”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `service`：承载一个画面实例的状态（`ImageServiceState`）
//! - `handler`：编排加载与缩放，记录阶段耗时
//! - `acquisition`：相机 / 相册 / 文件选择框的接口边界与权限流程
//! - `selection`：多选去重与数量上限
//! - `loader`：文件 / Data URL / 内存字节加载与签名校验
//! - `pipeline`：解码、像素限制、裁剪填充 / 拉伸、JPEG 编码
//! - `uploader`：multipart 上传
//! - `screen`：显式画面状态机与提示队列
//! - `config/error/source/size`：配置、错误、中间数据模型、体积格式化
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! main.rs（CLI 参数 / 配置）
//!    ↓
//! service.rs（画面实例、票据、锁）
//!    ├─ acquisition.rs（平台分支 + 权限最多申请一次）
//!    ├─ handler.rs（spawn_blocking + 阶段耗时日志）
//!    │    ├─ loader.rs（来源加载 + 体积/签名校验）
//!    │    └─ pipeline.rs（解码 + 像素限制 + 缩放 + JPEG）
//!    ├─ screen.rs（Idle → Selected → Transformed → Uploading → Uploaded/Failed）
//!    └─ uploader.rs（POST {base_url}/upload）
//! ```

mod acquisition;
mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod screen;
mod selection;
mod service;
mod size;
mod source;
mod uploader;

#[cfg(test)]
mod test_support;

pub use acquisition::{
    Acquisition, FileInputPicker, ImagePicker, NoPermissionRequired, PermissionProvider,
    PermissionStatus, Platform, ensure_permission,
};
pub use config::{
    DEFAULT_QUALITY, DEFAULT_TARGET_EDGE, ImageConfig, ImagePerformanceProfile, ResizeMode,
    ResizePolicy,
};
pub use error::ImageError;
pub use handler::ImageHandler;
pub use screen::{
    Notice, NoticeLevel, PictureScreen, ScreenPhase, ScreenSnapshot, SelectionTicket, UploadTicket,
};
pub use selection::{MAX_SELECTION, MultiSelection, SelectionOutcome, merge_selection};
pub use service::ImageServiceState;
pub use size::format_size;
pub use source::{ImageBuffer, ImageSource, ResizedImage, SizeReport, UploadAck};
pub use uploader::{UPLOAD_FAILED_MESSAGE, UPLOAD_FIELD, UploadClient};
