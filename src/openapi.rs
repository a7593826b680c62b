use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::qr::handler::generate_qr,
    ),
    components(
        schemas(
            crate::error::ProblemDetails,
            crate::features::health::handler::HealthResponse,
            crate::features::qr::models::GenerateQrResponse,
        )
    ),
    tags(
        (name = "QR", description = "二维码生成与上传"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "QR Upload API",
        version = "0.1.0",
        description = "将 URL 编码为二维码 PNG 并上传到 Azure Blob Storage"
    )
)]
pub struct ApiDoc;
