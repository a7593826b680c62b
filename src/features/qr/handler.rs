use axum::{
    Form, Router,
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
    routing::post,
};

use super::models::{GenerateQrParams, GenerateQrResponse};
use crate::error::AppError;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/generate-qr/",
    summary = "生成并上传二维码",
    description = "将 url 编码为 PNG 二维码，覆盖写入 Blob 存储 `qr_codes/<url 去掉 scheme>.png`，返回对象的公开地址。url 可通过查询串或表单传入。",
    params(GenerateQrParams),
    responses(
        (status = 200, description = "上传成功", body = GenerateQrResponse),
        (status = 422, description = "缺少 url 参数", body = crate::error::ProblemDetails, content_type = "application/problem+json"),
        (status = 500, description = "上传失败（detail 为底层错误描述）", body = crate::error::ProblemDetails, content_type = "application/problem+json")
    ),
    tag = "QR"
)]
pub async fn generate_qr(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    form: Option<Form<Vec<(String, String)>>>,
) -> Result<Json<GenerateQrResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;

    // 查询串优先，其次表单
    let url = GenerateQrParams::from_pairs(query)
        .url
        .or_else(|| form.and_then(|Form(f)| GenerateQrParams::from_pairs(f).url))
        .ok_or_else(|| AppError::Validation("缺少必需参数 url".to_string()))?;

    let generated = state.qr_service.generate(&url).await?;
    Ok(Json(GenerateQrResponse {
        qr_code_url: generated.qr_code_url,
    }))
}

pub fn create_qr_router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/generate-qr/", post(generate_qr))
        .route("/generate-qr", post(generate_qr))
}
