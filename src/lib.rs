//! # 图片选择与上传工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            外部能力（相机插件 / 相册 / 文件选择框）          │
//! │                 PermissionProvider · ImagePicker          │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ ImageSource
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↓            本库 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  ├─ settings ─── JSON 配置 + 环境变量覆盖                 │
//! │  └─ image_handler                                        │
//! │      ├─ service     画面实例入口（票据 / 单上传）          │
//! │      ├─ loader      文件 / Data URL / 字节加载与校验       │
//! │      ├─ pipeline    解码 · 裁剪填充/拉伸 · JPEG 编码       │
//! │      ├─ selection   多选去重 + 10 张上限                  │
//! │      ├─ screen      Idle→Selected→Transformed→Uploading   │
//! │      └─ uploader    multipart POST {base_url}/upload     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`settings`] | 上传地址、缩放策略、性能档位的加载与校验 |
//! | [`image_handler`] | 选图、缩放为固定正方形 JPEG、体积展示、上传 |

pub mod error;
pub mod image_handler;
pub mod settings;
