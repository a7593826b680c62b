/// 探活
pub mod health;

/// 二维码生成与上传
pub mod qr;

/// Blob 存储后端
pub mod storage;
