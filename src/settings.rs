use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::{ImagePerformanceProfile, ResizePolicy};

/// 默认配置文件名（相对当前工作目录）。
pub const DEFAULT_SETTINGS_FILE: &str = "picture-uploader.json";
/// 覆盖上传地址的环境变量。
pub const UPLOAD_BASE_URL_ENV: &str = "PICTURE_UPLOAD_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 上传服务基地址，实际请求 `{upload_base_url}/upload`。
    pub upload_base_url: Option<String>,
    pub resize: ResizePolicy,
    pub performance_profile: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            upload_base_url: None,
            resize: ResizePolicy::default(),
            performance_profile: ImagePerformanceProfile::Balanced.as_str().to_string(),
        }
    }
}

impl AppSettings {
    pub fn performance_profile(&self) -> Result<ImagePerformanceProfile, AppError> {
        Ok(ImagePerformanceProfile::from_str(&self.performance_profile)?)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.resize.validate()?;
        self.performance_profile()?;
        Ok(())
    }

    /// 用环境变量覆盖文件中的值。
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(UPLOAD_BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            log::debug!("使用环境变量 {} 覆盖上传地址", UPLOAD_BASE_URL_ENV);
            self.upload_base_url = Some(url.trim().to_string());
        }
    }
}

/// 读取配置文件；文件不存在时返回默认配置。
pub fn load_settings_from_path(path: &Path) -> Result<AppSettings, AppError> {
    if !path.exists() {
        log::info!("未找到配置文件 {}，使用默认配置", path.display());
        return Ok(AppSettings::default());
    }

    let content = fs::read_to_string(path)?;
    let settings = serde_json::from_str::<AppSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;
    settings.validate()?;

    Ok(settings)
}

pub fn save_settings_to_path(path: &Path, settings: &AppSettings) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}
