use std::io::Cursor;

use axum::body::Bytes;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

/// 每个模块（码元）的像素边长
pub const MODULE_SIZE: u32 = 10;

/// 静区宽度（模块数），与标准二维码一致
pub const QUIET_ZONE_MODULES: u32 = 4;

#[derive(Error, Debug)]
pub enum QrEncodeError {
    #[error("{0}")]
    Symbol(#[from] qrcode::types::QrError),

    #[error("PNG 编码失败: {0}")]
    Png(#[from] image::ImageError),
}

/// 以 L 级纠错编码二维码：从 version 1 开始，自动选取能容纳载荷的最小版本。
pub fn encode_symbol(payload: &str) -> Result<QrCode, QrEncodeError> {
    Ok(QrCode::with_error_correction_level(
        payload.as_bytes(),
        EcLevel::L,
    )?)
}

/// 将载荷渲染为黑白 PNG（内存缓冲，不落盘）。
pub fn encode_png(payload: &str) -> Result<Bytes, QrEncodeError> {
    let code = encode_symbol(payload)?;
    let bitmap = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(MODULE_SIZE, MODULE_SIZE)
        .dark_color(Luma([0u8]))
        .light_color(Luma([255u8]))
        .build();

    let mut buf = Cursor::new(Vec::with_capacity(4096));
    bitmap.write_to(&mut buf, ImageFormat::Png)?;
    Ok(Bytes::from(buf.into_inner()))
}
