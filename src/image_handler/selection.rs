//! # 多选合并模块
//!
//! 连续两次多选 A、B 的结果为 `dedupe(A ∪ B)` 按合并顺序截断到上限。
//! 上限是软限制：超出部分直接丢弃并记录日志，不作为错误返回。

use std::collections::HashSet;

use super::ImageSource;

/// 多选最多保留的图片数量。
pub const MAX_SELECTION: usize = 10;

/// 一次合并的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub selected: Vec<ImageSource>,
    /// 因重复被忽略的数量。
    pub duplicates: usize,
    /// 因超过上限被丢弃的数量。
    pub dropped: usize,
}

/// 将新选择合并进已有选择。
///
/// # 示例
/// ```rust
/// use std::path::PathBuf;
/// use picture_uploader::image_handler::{merge_selection, ImageSource};
///
/// let a = ImageSource::FilePath(PathBuf::from("a.jpg"));
/// let outcome = merge_selection(&[a.clone()], &[a.clone()], 10);
/// assert_eq!(outcome.selected, vec![a]);
/// assert_eq!(outcome.duplicates, 1);
/// ```
pub fn merge_selection(existing: &[ImageSource], incoming: &[ImageSource], cap: usize) -> SelectionOutcome {
    let mut seen = HashSet::with_capacity(existing.len() + incoming.len());
    let mut selected = Vec::with_capacity(cap.min(existing.len() + incoming.len()));
    let mut duplicates = 0;
    let mut dropped = 0;

    for source in existing.iter().chain(incoming) {
        if !seen.insert(source.identity()) {
            duplicates += 1;
            continue;
        }

        if selected.len() >= cap {
            dropped += 1;
            continue;
        }

        selected.push(source.clone());
    }

    if dropped > 0 {
        log::warn!(
            "⚠️ 选择数量超出上限 {}，已丢弃 {} 张",
            cap,
            dropped
        );
    }

    SelectionOutcome {
        selected,
        duplicates,
        dropped,
    }
}

/// 持有当前多选结果的累加器。
#[derive(Debug, Clone)]
pub struct MultiSelection {
    cap: usize,
    items: Vec<ImageSource>,
}

impl Default for MultiSelection {
    fn default() -> Self {
        Self::with_cap(MAX_SELECTION)
    }
}

impl MultiSelection {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap,
            items: Vec::new(),
        }
    }

    /// 追加一批选择，返回本次合并统计。
    pub fn extend(&mut self, incoming: &[ImageSource]) -> SelectionOutcome {
        let outcome = merge_selection(&self.items, incoming, self.cap);
        self.items = outcome.selected.clone();
        outcome
    }

    pub fn remove(&mut self, source: &ImageSource) -> bool {
        let identity = source.identity();
        let before = self.items.len();
        self.items.retain(|item| item.identity() != identity);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[ImageSource] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
