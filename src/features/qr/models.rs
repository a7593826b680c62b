use serde::{Deserialize, Serialize};

/// `POST /generate-qr/` 的参数（查询串或表单）
#[derive(Debug, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateQrParams {
    /// 需要编码为二维码的 URL（任意字符串，不做格式校验）
    #[param(example = "https://example.com/page")]
    pub url: Option<String>,
}

impl GenerateQrParams {
    /// 从原始键值对取参数；`url` 重复出现时取最后一个。
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            url: pairs
                .into_iter()
                .filter(|(k, _)| k == "url")
                .map(|(_, v)| v)
                .last(),
        }
    }
}

/// 生成成功的响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GenerateQrResponse {
    /// 上传后对象的公开访问地址
    #[schema(
        example = "https://myaccount.blob.core.windows.net/qr/qr_codes/example.com/page.png"
    )]
    pub qr_code_url: String,
}
