//! # 图片选择与上传工具 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与服务构造，
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use picture_uploader::error::AppError;
use picture_uploader::image_handler::{
    Acquisition, FileInputPicker, ImageConfig, ImagePicker, ImageServiceState, NoPermissionRequired,
    NoticeLevel, Platform, ResizeMode, ResizePolicy, ResizedImage, UploadClient,
};
use picture_uploader::settings::{self, AppSettings};

#[derive(Debug, Parser)]
#[command(name = "picture-uploader", version, about = "将图片缩放为正方形 JPEG 缩略图并上传")]
struct Cli {
    /// 图片文件路径或 `data:image/...;base64,` 字符串
    #[arg(required = true)]
    inputs: Vec<String>,

    /// 配置文件路径
    #[arg(long, default_value = settings::DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// 缩放策略：crop（裁剪填充）或 stretch（拉伸）
    #[arg(long)]
    mode: Option<String>,

    /// 输出边长（像素）
    #[arg(long)]
    size: Option<u32>,

    /// JPEG 质量（0.0–1.0）
    #[arg(long)]
    quality: Option<f32>,

    /// 性能档位：quality / balanced / speed
    #[arg(long)]
    profile: Option<String>,

    /// 上传服务基地址（覆盖配置文件与环境变量）
    #[arg(long)]
    upload_url: Option<String>,

    /// 缩放后上传
    #[arg(long)]
    upload: bool,

    /// 将缩放结果写入该目录
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("无法创建异步运行时: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<AppSettings, AppError> {
    let mut settings = settings::load_settings_from_path(&cli.config)?;
    settings.apply_env_overrides();

    if let Some(url) = &cli.upload_url {
        settings.upload_base_url = Some(url.clone());
    }
    if let Some(mode) = &cli.mode {
        settings.resize.mode = ResizeMode::from_str(mode)?;
    }
    if let Some(size) = cli.size {
        settings.resize.target_edge = size;
    }
    if let Some(quality) = cli.quality {
        settings.resize.quality = quality;
    }
    if let Some(profile) = &cli.profile {
        settings.performance_profile = profile.clone();
    }

    settings.validate()?;
    Ok(settings)
}

fn build_service(settings: &AppSettings, upload: bool) -> Result<ImageServiceState, AppError> {
    let mut config = ImageConfig::default();
    config.apply_performance_profile(settings.performance_profile()?);

    let policy = ResizePolicy::new(
        settings.resize.target_edge,
        settings.resize.quality,
        settings.resize.mode,
    )?;

    let service = ImageServiceState::with_config(config.clone(), policy);
    if !upload {
        return Ok(service);
    }

    let base_url = settings.upload_base_url.as_deref().ok_or_else(|| {
        AppError::Settings(format!(
            "未配置上传地址（--upload-url、{} 或配置文件 upload_base_url）",
            settings::UPLOAD_BASE_URL_ENV
        ))
    })?;

    Ok(service.with_uploader(UploadClient::new(base_url, &config)?))
}

fn write_output(out_dir: &Path, index: usize, image: &ResizedImage) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("thumbnail-{:02}.jpg", index + 1));
    std::fs::write(&path, &image.bytes)?;
    Ok(path)
}

fn flush_notices(service: &ImageServiceState) -> Result<(), AppError> {
    for notice in service.drain_notices()? {
        match notice.level {
            NoticeLevel::Info => log::info!("🔔 {}", notice.message),
            NoticeLevel::Error => log::warn!("🔔 {}", notice.message),
        }
    }
    Ok(())
}

/// 依次处理所有输入；返回是否全部成功。
async fn run(cli: Cli) -> Result<bool, AppError> {
    let settings = resolve_settings(&cli)?;
    let service = build_service(&settings, cli.upload)?;

    log::info!(
        "⚙️ 缩放策略: {} {}x{} quality={} profile={}",
        settings.resize.mode.as_str(),
        settings.resize.target_edge,
        settings.resize.target_edge,
        settings.resize.quality,
        service.get_performance_profile()?
    );

    let mut picker = FileInputPicker::from_inputs(&cli.inputs);
    let picked = picker.pick_many()?;
    let outcome = service.select_many(&picked)?;
    flush_notices(&service)?;

    let mut all_ok = true;
    for (index, source) in outcome.selected.into_iter().enumerate() {
        let mut acquisition = Acquisition::new(
            Platform::Web,
            NoPermissionRequired,
            FileInputPicker::default(),
            FileInputPicker::new([source]),
        );

        let resized = match service.acquire_and_select(&mut acquisition).await {
            Ok(resized) => resized,
            Err(_) => {
                all_ok = false;
                flush_notices(&service)?;
                continue;
            }
        };

        println!("[{}] {}", index + 1, resized.size_report());

        if let Some(out_dir) = &cli.out_dir {
            let path = write_output(out_dir, index, &resized)?;
            println!("[{}] 已写入 {}", index + 1, path.display());
        }

        if cli.upload {
            match service.upload_current().await {
                Ok(ack) => println!("[{}] 上传成功 HTTP {} {}", index + 1, ack.status, ack.body),
                Err(_) => all_ok = false,
            }
        }

        flush_notices(&service)?;
    }

    Ok(all_ok)
}
