//! # 上传客户端
//!
//! ## 设计思路
//!
//! 将缩放结果打包为单字段 multipart 表单，向 `{base_url}/upload` 发起一次 POST。
//! HTTP 客户端由调用方显式构造并持有，不使用全局单例。
//!
//! ## 实现思路
//!
//! - 非 2xx 状态与无响应的网络失败统一映射为 `ImageError::Upload`，对用户展示固定文案。
//! - 单次尝试、单一结果：不重试、不退避、不续传。
//! - 2xx 响应体按 JSON 解析；解析失败不影响回执，只记录日志。

use std::time::Duration;

use reqwest::multipart::{Form, Part};

use super::source::{ResizedImage, UploadAck};
use super::{ImageConfig, ImageError};

/// multipart 字段名。
pub const UPLOAD_FIELD: &str = "image";
const UPLOAD_FILE_NAME: &str = "image.jpeg";
const UPLOAD_PATH: &str = "upload";
/// 上传失败时展示给用户的固定文案。
pub const UPLOAD_FAILED_MESSAGE: &str = "图片上传失败";

/// 图片上传客户端。
#[derive(Debug, Clone)]
pub struct UploadClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl UploadClient {
    /// 按配置构建 HTTP 客户端。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use picture_uploader::image_handler::{ImageConfig, UploadClient};
    ///
    /// let client = UploadClient::new("https://example.com/api", &ImageConfig::default())?;
    /// assert_eq!(client.endpoint().as_str(), "https://example.com/api/upload");
    /// # Ok::<(), picture_uploader::image_handler::ImageError>(())
    /// ```
    pub fn new(base_url: &str, config: &ImageConfig) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(|e| ImageError::InvalidFormat(format!("无法创建 HTTP 客户端：{}", e)))?;

        Self::with_client(client, base_url)
    }

    /// 使用外部构造的客户端（便于在应用生命周期内复用连接池）。
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ImageError> {
        Ok(Self {
            client,
            endpoint: upload_endpoint(base_url)?,
        })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    /// 上传一张缩放结果。
    pub async fn upload(&self, image: &ResizedImage) -> Result<UploadAck, ImageError> {
        log::info!(
            "📤 开始上传图片 - 地址: {} 体积: {} bytes",
            redact_url_for_log(&self.endpoint),
            image.resized_size
        );

        let part = Part::bytes(image.bytes.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(ResizedImage::MIME)
            .map_err(|e| ImageError::Upload(format!("构建上传表单失败：{}", e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                log::warn!("⚠️ 上传请求失败（无响应）：{}", e.without_url());
                ImageError::Upload(UPLOAD_FAILED_MESSAGE.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("⚠️ 上传被服务器拒绝 - HTTP {}", status.as_u16());
            return Err(ImageError::Upload(UPLOAD_FAILED_MESSAGE.to_string()));
        }

        let body = response.bytes().await.map_err(|e| {
            log::warn!("⚠️ 读取上传响应失败：{}", e.without_url());
            ImageError::Upload(UPLOAD_FAILED_MESSAGE.to_string())
        })?;

        let body = serde_json::from_slice(&body).unwrap_or_else(|e| {
            log::debug!("上传响应不是 JSON，忽略响应体：{}", e);
            serde_json::Value::Null
        });

        log::info!("✅ 图片上传成功 - HTTP {}", status.as_u16());

        Ok(UploadAck {
            status: status.as_u16(),
            body,
        })
    }
}

/// 拼接上传地址：无论 base 是否以 `/` 结尾，都追加 `upload` 路径段。
pub(crate) fn upload_endpoint(base_url: &str) -> Result<reqwest::Url, ImageError> {
    let mut base = reqwest::Url::parse(base_url.trim())
        .map_err(|e| ImageError::InvalidFormat(format!("上传地址格式错误：{}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ImageError::InvalidFormat("上传地址仅支持 HTTP/HTTPS".to_string()));
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(UPLOAD_PATH)
        .map_err(|e| ImageError::InvalidFormat(format!("上传地址拼接失败：{}", e)))
}

fn redact_url_for_log(url: &reqwest::Url) -> String {
    let host = url.host_str().unwrap_or("<unknown-host>");
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!("{}://{}{}{}", url.scheme(), host, port, url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_upload_segment() {
        let cases = [
            ("https://example.com/api", "https://example.com/api/upload"),
            ("https://example.com/api/", "https://example.com/api/upload"),
            ("http://10.0.0.1:8080", "http://10.0.0.1:8080/upload"),
        ];

        for (base, expected) in cases {
            let endpoint = upload_endpoint(base).expect("valid base url");
            assert_eq!(endpoint.as_str(), expected);
        }
    }

    #[test]
    fn endpoint_rejects_non_http_schemes() {
        assert!(matches!(
            upload_endpoint("ftp://example.com/api"),
            Err(ImageError::InvalidFormat(_))
        ));
        assert!(matches!(upload_endpoint("not a url"), Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn redact_drops_query_string() {
        let url = reqwest::Url::parse("https://example.com:8443/api/upload?token=abc#frag")
            .expect("valid url");
        assert_eq!(redact_url_for_log(&url), "https://example.com:8443/api/upload");
    }
}
