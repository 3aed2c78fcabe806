//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载“选图 → 缩放 → 上传”链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 所有错误都在触发它的用户操作处被恢复，并转换为一条可关闭的提示（`Notice`），
//! 没有任何一种会被自动重试。

/// 图片处理统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`，最终呈现给用户。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("权限错误：{0}")]
    PermissionDenied(String),

    #[error("已取消：{0}")]
    UserCancelled(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("渲染错误：{0}")]
    Render(String),

    #[error("上传错误：{0}")]
    Upload(String),

    #[error("选择数量超出上限：{0}")]
    SelectionLimitExceeded(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ImageError {
    /// 稳定错误码，供日志检索与调用方分支判断。
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "E_PERMISSION",
            Self::UserCancelled(_) => "E_CANCELLED",
            Self::Decode(_) => "E_DECODE",
            Self::Render(_) => "E_RENDER",
            Self::Upload(_) => "E_UPLOAD",
            Self::SelectionLimitExceeded(_) => "E_SELECTION_LIMIT",
            Self::InvalidFormat(_) => "E_INVALID_FORMAT",
            Self::FileSystem(_) => "E_FS",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
        }
    }

    /// 错误发生的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) | Self::UserCancelled(_) | Self::SelectionLimitExceeded(_) => {
                "acquire"
            }
            Self::FileSystem(_) => "load",
            Self::Decode(_) | Self::Render(_) | Self::ResourceLimit(_) => "transform",
            Self::Upload(_) => "upload",
            Self::InvalidFormat(_) => "config",
        }
    }
}
