//! # 画面状态机
//!
//! ## 设计思路
//!
//! 用显式状态迁移替代“状态变化即重绘”的隐式模型，与任何渲染框架无关：
//!
//! ```text
//! Idle ──select──▶ Selected ──transform ok──▶ Transformed ──upload──▶ Uploading ──▶ Uploaded
//!   ▲                 │                           ▲                       │
//!   │        transform err（回到选择前的稳定状态）  │                       └──▶ Failed
//!   └──────── remove ─┴───────────────────────────┘
//! ```
//!
//! ## 实现思路
//!
//! - 每次选择都会递增 generation 并发放票据（ticket）。异步结果回来时，
//!   票据过期（期间有新的选择或移除）则直接丢弃，不会覆盖更新的选择。
//! - 同一时刻最多一个上传在途。
//! - 所有错误都转换为一条 `Notice`，放入待展示队列，由界面层取走。

use std::collections::VecDeque;

use super::source::{ResizedImage, SizeReport, UploadAck};
use super::ImageError;

const SUCCESS_NOTICE_MS: u64 = 2_000;
const ERROR_NOTICE_MS: u64 = 3_000;

/// 画面阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenPhase {
    Idle,
    Selected,
    Transformed,
    Uploading,
    Uploaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// 短暂显示、可关闭的提示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub duration_ms: u64,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Info,
            duration_ms: SUCCESS_NOTICE_MS,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NoticeLevel::Error,
            duration_ms: ERROR_NOTICE_MS,
        }
    }
}

/// 一次选择的票据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket(u64);

/// 一次上传的票据。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

/// 界面展示所需的只读快照。
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSnapshot {
    pub phase: ScreenPhase,
    pub photo: Option<ResizedImage>,
    pub size_report: Option<SizeReport>,
    pub last_ack: Option<UploadAck>,
    pub last_error: Option<String>,
}

/// 选图画面状态。
#[derive(Debug)]
pub struct PictureScreen {
    phase: ScreenPhase,
    /// 选择开始前的稳定阶段，缩放失败时恢复。
    phase_before_selection: ScreenPhase,
    photo: Option<ResizedImage>,
    generation: u64,
    /// 在途上传的票据，与阶段无关：新的选择不会清除它。
    upload_in_flight: Option<UploadTicket>,
    last_ack: Option<UploadAck>,
    last_error: Option<String>,
    notices: VecDeque<Notice>,
}

impl Default for PictureScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl PictureScreen {
    pub fn new() -> Self {
        Self {
            phase: ScreenPhase::Idle,
            phase_before_selection: ScreenPhase::Idle,
            photo: None,
            generation: 0,
            upload_in_flight: None,
            last_ack: None,
            last_error: None,
            notices: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> ScreenPhase {
        self.phase
    }

    pub fn photo(&self) -> Option<&ResizedImage> {
        self.photo.as_ref()
    }

    pub fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot {
            phase: self.phase,
            photo: self.photo.clone(),
            size_report: self.photo.as_ref().map(ResizedImage::size_report),
            last_ack: self.last_ack.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// 取走所有待展示提示。
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// 用户发起一次新的选择。旧的在途结果随之作废。
    pub fn begin_selection(&mut self) -> SelectionTicket {
        if self.phase != ScreenPhase::Selected {
            self.phase_before_selection = self.stable_phase();
        }
        self.generation += 1;
        self.phase = ScreenPhase::Selected;
        SelectionTicket(self.generation)
    }

    /// 缩放结果返回。票据过期时返回 `false` 且不改变任何状态。
    pub fn complete_transform(
        &mut self,
        ticket: SelectionTicket,
        result: Result<ResizedImage, ImageError>,
    ) -> bool {
        if !self.is_current(ticket.0) {
            log::debug!(
                "丢弃过期的缩放结果 - ticket={} current={}",
                ticket.0,
                self.generation
            );
            return false;
        }

        match result {
            Ok(photo) => {
                self.photo = Some(photo);
                self.phase = ScreenPhase::Transformed;
                self.last_ack = None;
                self.last_error = None;
                self.notices.push_back(Notice::info("图片已选择"));
            }
            Err(err) => self.fail_selection(err),
        }

        true
    }

    /// 选择阶段（获取或缩放）失败：恢复到选择前的稳定状态，保留已有图片。
    fn fail_selection(&mut self, err: ImageError) {
        log::warn!("⚠️ 图片选择失败 [{}/{}]：{}", err.stage(), err.code(), err);
        self.phase = self.phase_before_selection;
        self.last_error = Some(err.to_string());
        self.notices
            .push_back(Notice::error(format!("选择图片时出错：{}", err)));
    }

    /// 开始上传，返回票据与待上传图片。
    pub fn begin_upload(&mut self) -> Result<(UploadTicket, ResizedImage), ImageError> {
        if self.upload_in_flight.is_some() {
            return Err(ImageError::ResourceLimit("已有上传任务进行中".to_string()));
        }

        let photo = self
            .photo
            .clone()
            .ok_or_else(|| ImageError::InvalidFormat("没有可上传的图片".to_string()))?;

        if self.phase == ScreenPhase::Selected {
            return Err(ImageError::ResourceLimit("图片仍在处理中".to_string()));
        }

        let ticket = UploadTicket(self.generation);
        self.phase = ScreenPhase::Uploading;
        self.upload_in_flight = Some(ticket);
        Ok((ticket, photo))
    }

    /// 上传结果返回，释放在途名额。若期间已有新的选择或移除，不改变阶段。
    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<UploadAck, ImageError>,
    ) -> bool {
        if self.upload_in_flight == Some(ticket) {
            self.upload_in_flight = None;
        }

        if !self.is_current(ticket.0) {
            log::debug!(
                "忽略过期的上传结果 - ticket={} current={}",
                ticket.0,
                self.generation
            );
            return false;
        }

        match result {
            Ok(ack) => {
                self.phase = ScreenPhase::Uploaded;
                self.last_ack = Some(ack);
                self.last_error = None;
                self.notices.push_back(Notice::info("图片上传成功"));
            }
            Err(err) => {
                log::warn!("⚠️ 图片上传失败 [{}]：{}", err.code(), err);
                self.phase = ScreenPhase::Failed;
                self.last_error = Some(err.to_string());
                self.notices.push_back(Notice::error(err.to_string()));
            }
        }

        true
    }

    /// 获取阶段失败（取消、权限被拒）。不发放票据，在途的缩放结果仍然有效。
    pub fn fail_acquisition(&mut self, err: ImageError) {
        log::warn!("⚠️ 图片获取失败 [{}/{}]：{}", err.stage(), err.code(), err);
        self.last_error = Some(err.to_string());
        self.notices
            .push_back(Notice::error(format!("选择图片时出错：{}", err)));
    }

    /// 是否有上传仍在途。
    pub fn upload_in_flight(&self) -> bool {
        self.upload_in_flight.is_some()
    }

    /// 移除当前图片，作废所有在途结果。
    pub fn remove_photo(&mut self) {
        self.generation += 1;
        self.photo = None;
        self.phase = ScreenPhase::Idle;
        self.phase_before_selection = ScreenPhase::Idle;
        self.last_ack = None;
        self.last_error = None;
        self.notices.push_back(Notice::info("图片已移除"));
    }

    /// 记录一条与阶段无关的提示（例如多选超限）。
    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// 当前可回退的稳定阶段：有图片时为 `Transformed`，上传结束状态保持不变。
    fn stable_phase(&self) -> ScreenPhase {
        match self.phase {
            ScreenPhase::Selected | ScreenPhase::Uploading => {
                if self.photo.is_some() {
                    ScreenPhase::Transformed
                } else {
                    ScreenPhase::Idle
                }
            }
            other => other,
        }
    }
}
