//! 字节体积格式化。
//!
//! 纯展示用途：相同字节数必须得到相同字符串。

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// 将字节数格式化为 `N bytes` / `x.xx KB` / `x.xx MB`。
///
/// # 示例
/// ```rust
/// use picture_uploader::image_handler::format_size;
///
/// assert_eq!(format_size(0), "0 bytes");
/// assert_eq!(format_size(1500), "1.46 KB");
/// assert_eq!(format_size(1_048_576), "1.00 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{} bytes", bytes)
    } else if bytes < MIB {
        format!("{} KB", two_decimals(bytes, KIB))
    } else {
        format!("{} MB", two_decimals(bytes, MIB))
    }
}

/// 保留两位小数，恰好落在中点时向上取整。
fn two_decimals(bytes: u64, unit: u64) -> String {
    let hundredths = (bytes as u128 * 100 + unit as u128 / 2) / unit as u128;
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}
