//! Azure Blob Storage 后端（REST `Put Blob`）
//!
//! 认证方式由连接字符串决定：
//! - `AccountKey` → Shared Key 签名（HMAC-SHA256）
//! - `SharedAccessSignature` → SAS 令牌附加在查询串上
//! - `UseDevelopmentStorage=true` → Azurite 本地模拟器的公开默认凭据

use std::collections::HashMap;
use std::fmt;

use axum::body::Bytes;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use futures_util::future::BoxFuture;
use hmac::{Hmac, Mac};
use reqwest::{Url, header};
use sha2::Sha256;
use thiserror::Error;

use super::{BlobStore, StorageError};

/// 所有请求使用的 REST API 版本
pub const AZURE_API_VERSION: &str = "2023-11-03";

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Azurite 模拟器的公开默认账户
const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

type HmacSha256 = Hmac<Sha256>;

/// 连接字符串解析错误
#[derive(Error, Debug)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("malformed connection string segment: {0}")]
    Malformed(String),

    #[error("connection string is missing {0}")]
    Missing(&'static str),

    #[error("invalid AccountKey in connection string: {0}")]
    InvalidAccountKey(String),

    #[error("invalid blob endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

/// 请求凭据
#[derive(Clone)]
pub enum Credential {
    SharedKey { account: String, key: Vec<u8> },
    Sas { token: String },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .field("key", &"<redacted>")
                .finish(),
            Credential::Sas { .. } => f
                .debug_struct("Sas")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// 解析后的存储连接字符串
#[derive(Debug, Clone)]
pub struct ConnectionString {
    /// Blob 服务端点（不含容器）
    pub blob_endpoint: Url,
    pub credential: Credential,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ConnectionStringError> {
        let mut fields: HashMap<String, String> = HashMap::new();
        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            // 值本身可能含 '='（base64 填充、SAS 参数），只切第一个
            let (k, v) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::Malformed(segment.to_string()))?;
            fields.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
        }
        if fields.is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        if fields
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self {
                blob_endpoint: parse_endpoint(DEV_BLOB_ENDPOINT)?,
                credential: Credential::SharedKey {
                    account: DEV_ACCOUNT_NAME.to_string(),
                    key: decode_account_key(DEV_ACCOUNT_KEY)?,
                },
            });
        }

        let account = fields.get("accountname").filter(|v| !v.is_empty()).cloned();

        let blob_endpoint = match fields.get("blobendpoint") {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => {
                let account = account
                    .as_deref()
                    .ok_or(ConnectionStringError::Missing("AccountName"))?;
                let protocol = fields
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = fields
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
                parse_endpoint(&format!("{protocol}://{account}.blob.{suffix}"))?
            }
        };

        let credential = if let Some(key) = fields.get("accountkey") {
            let account = account.ok_or(ConnectionStringError::Missing("AccountName"))?;
            Credential::SharedKey {
                account,
                key: decode_account_key(key)?,
            }
        } else if let Some(sas) = fields.get("sharedaccesssignature") {
            Credential::Sas {
                token: sas.trim_start_matches('?').to_string(),
            }
        } else {
            return Err(ConnectionStringError::Missing(
                "AccountKey or SharedAccessSignature",
            ));
        };

        Ok(Self {
            blob_endpoint,
            credential,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConnectionStringError> {
    let url = Url::parse(raw).map_err(|e| ConnectionStringError::InvalidEndpoint {
        endpoint: raw.to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConnectionStringError::InvalidEndpoint {
            endpoint: raw.to_string(),
            message: "endpoint cannot carry a path".to_string(),
        });
    }
    Ok(url)
}

fn decode_account_key(raw: &str) -> Result<Vec<u8>, ConnectionStringError> {
    BASE64_STANDARD
        .decode(raw)
        .map_err(|e| ConnectionStringError::InvalidAccountKey(e.to_string()))
}

/// 通过 REST API 写入单个容器的 Blob 后端
#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    client: reqwest::Client,
    blob_endpoint: Url,
    container: String,
    credential: Credential,
}

impl AzureBlobStore {
    pub fn new(
        connection: ConnectionString,
        container: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::Backend(format!("failed to create HTTP client: {e}")))?;
        let container = container.into();

        tracing::info!(
            "Azure Blob 后端已初始化: endpoint={} container={}",
            connection.blob_endpoint,
            container
        );

        Ok(Self {
            client,
            blob_endpoint: connection.blob_endpoint,
            container,
            credential: connection.credential,
        })
    }

    pub fn from_connection_string(
        raw: &str,
        container: impl Into<String>,
    ) -> Result<Self, StorageError> {
        Self::new(ConnectionString::parse(raw)?, container)
    }

    /// 构造对象的请求 URL；每个路径段单独做百分号编码。
    ///
    /// `.`/`..` 段按 URL 解析规则在容器内消解，与客户端访问公开 URL 时落到的对象一致；
    /// 越出容器的键直接拒绝。
    pub fn blob_url(&self, key: &str) -> Result<Url, StorageError> {
        let resolved = resolve_dot_segments(key)?;
        let mut url = self.blob_endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::InvalidPath(self.blob_endpoint.to_string()))?;
            segments.pop_if_empty().push(&self.container);
            segments.extend(resolved);
        }
        Ok(url)
    }

    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        let mut url = self.blob_url(key)?;
        let date = rfc1123_now();
        let ms_headers = [
            ("x-ms-blob-content-type", content_type),
            ("x-ms-blob-type", "BlockBlob"),
            ("x-ms-date", date.as_str()),
            ("x-ms-version", AZURE_API_VERSION),
        ];

        let authorization = match &self.credential {
            Credential::SharedKey { account, key } => {
                let resource = canonicalized_resource(account, &url);
                let to_sign =
                    string_to_sign("PUT", body.len(), content_type, &ms_headers, &resource);
                Some(format!("SharedKey {account}:{}", sign(key, &to_sign)?))
            }
            Credential::Sas { token } => {
                url.set_query(Some(token.as_str()));
                None
            }
        };

        let mut req = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, content_type);
        for (name, value) in ms_headers {
            req = req.header(name, value);
        }
        if let Some(authorization) = authorization {
            req = req.header(header::AUTHORIZATION, authorization);
        }

        let resp = req
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Request {
                context: "upload",
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(StorageError::Status {
                context: "upload",
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Blob 上传完成: {} ({})", key, status);
        Ok(())
    }
}

impl BlobStore for AzureBlobStore {
    fn put_blob<'a>(
        &'a self,
        key: &'a str,
        body: Bytes,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(self.upload(key, body, content_type))
    }
}

fn is_single_dot(segment: &str) -> bool {
    segment == "." || segment.eq_ignore_ascii_case("%2e")
}

fn is_double_dot(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().as_str(),
        ".." | ".%2e" | "%2e." | "%2e%2e"
    )
}

/// 按 WHATWG URL 的路径规则消解键中的点段（含 `%2e` 写法）。
fn resolve_dot_segments(key: &str) -> Result<Vec<&str>, StorageError> {
    let parts: Vec<&str> = key.split('/').collect();
    let last = parts.len() - 1;
    let mut resolved: Vec<&str> = Vec::with_capacity(parts.len());
    for (i, segment) in parts.into_iter().enumerate() {
        if is_double_dot(segment) {
            if resolved.pop().is_none() {
                return Err(StorageError::InvalidPath(format!(
                    "key escapes container: {key}"
                )));
            }
            if i == last {
                resolved.push("");
            }
        } else if is_single_dot(segment) {
            if i == last {
                resolved.push("");
            }
        } else {
            resolved.push(segment);
        }
    }
    Ok(resolved)
}

/// RFC1123 格式的当前 UTC 时间（`x-ms-date`）
fn rfc1123_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// `/{account}{path}`，path 取实际请求 URL 的（已编码）路径。
fn canonicalized_resource(account: &str, url: &Url) -> String {
    format!("/{account}{}", url.path())
}

/// Shared Key 待签名字符串：
///
/// ```text
/// VERB\nContent-Encoding\nContent-Language\nContent-Length\nContent-MD5\nContent-Type\n
/// Date\nIf-Modified-Since\nIf-Match\nIf-None-Match\nIf-Unmodified-Since\nRange\n
/// CanonicalizedHeaders\nCanonicalizedResource
/// ```
fn string_to_sign(
    method: &str,
    content_length: usize,
    content_type: &str,
    ms_headers: &[(&str, &str)],
    canonicalized_resource: &str,
) -> String {
    let content_length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut headers: Vec<(String, &str)> = ms_headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim()))
        .filter(|(k, _)| k.starts_with("x-ms-"))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));
    let canonicalized_headers = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("\n");

    [
        method,
        "",
        "",
        content_length.as_str(),
        "",
        content_type,
        "",
        "",
        "",
        "",
        "",
        "",
        canonicalized_headers.as_str(),
        canonicalized_resource,
    ]
    .join("\n")
}

fn sign(key: &[u8], string_to_sign: &str) -> Result<String, StorageError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| StorageError::Credentials(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}
