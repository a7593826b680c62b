/// Blob 对象键前缀
pub const KEY_PREFIX: &str = "qr_codes/";

/// 对象后缀（PNG）
pub const KEY_SUFFIX: &str = ".png";

/// 由请求 URL 推导对象键：`qr_codes/<stem>.png`。
///
/// `<stem>` 为按 `"//"` 自左向右切分后的最后一段；不含 `"//"` 时为整个字符串。
/// 这里刻意不做 URL 解析：同一输入必须始终落到同一个键上（后写覆盖先写）。
pub fn object_key(url: &str) -> String {
    let stem = url.split("//").last().unwrap_or(url);
    format!("{KEY_PREFIX}{stem}{KEY_SUFFIX}")
}
