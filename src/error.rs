//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 命令行入口统一返回 `Result<T, AppError>`，
//! 需要结构化输出时通过 `Serialize` 获得错误字符串。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` / `io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串。

use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（获取 / 解码 / 缩放 / 上传）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件读取或校验失败
    #[error("配置错误: {0}")]
    Settings(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_error_passes_through_message() {
        let err: AppError = ImageError::Upload("图片上传失败".to_string()).into();
        assert_eq!(err.to_string(), "上传错误：图片上传失败");
    }

    #[test]
    fn serializes_as_plain_string() {
        let err = AppError::Settings("bad json".to_string());
        let json = serde_json::to_string(&err).expect("serialize error");
        assert_eq!(json, "\"配置错误: bad json\"");
    }
}
