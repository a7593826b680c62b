use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
///
/// 分类保持扁平：上传失败统一为 `Upload`，不区分瞬时/永久故障。
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 参数校验错误（如缺少 `url` 参数）
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 二维码编码失败（载荷超出容量等）
    #[error("二维码编码失败: {0}")]
    QrEncode(String),

    /// 上传到 Blob 存储失败，原样携带底层错误描述
    #[error("{0}")]
    Upload(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Internal Server Error")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 500)]
    pub status: u16,

    /// 人类可读的详细信息；上传失败时为底层错误的原始描述。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "UPLOAD_FAILED")]
    pub code: String,

    /// 请求追踪 ID（由 request-id 中间件注入）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::QrEncode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::QrEncode(_) => "QR_ENCODE_FAILED",
            AppError::Upload(_) => "UPLOAD_FAILED",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

impl From<crate::features::qr::encoder::QrEncodeError> for AppError {
    fn from(err: crate::features::qr::encoder::QrEncodeError) -> Self {
        AppError::QrEncode(err.to_string())
    }
}
