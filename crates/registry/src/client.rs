//! Registry API client.
//!
//! Async HTTP client using `reqwest` with `Token` authentication.

use std::time::Duration;

use boxreg_protocol::{
    ApiErrorBody, ContentHash, CreateUploadRequest, UploadScope, UploadSessionInfo,
};
use boxreg_transfer::Chunk;
use boxreg_upload::{ChunkAck, RemoteError, RemoteFuture, UploadRemote};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Characters left as-is in a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Errors building a registry client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid API token")]
    InvalidToken,

    #[error("invalid API root: {0:?}")]
    InvalidApiRoot(String),
}

/// Registry upload-session client.
pub struct RegistryClient {
    http: reqwest::Client,
    api_root: String,
}

impl RegistryClient {
    /// Creates a client for `api_root`, e.g. `https://registry.example/api/v1`.
    pub fn new(api_root: &str, token: Option<&str>, timeout: Duration) -> Result<Self, ClientError> {
        let api_root = api_root.trim().trim_end_matches('/');
        if !(api_root.starts_with("http://") || api_root.starts_with("https://")) {
            return Err(ClientError::InvalidApiRoot(api_root.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Token {token}"))
                .map_err(|_| ClientError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_root: api_root.to_string(),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// `…/boxes/{owner}/{box}/versions/{version}/providers/{provider}/uploads/`
    pub fn uploads_url(&self, scope: &UploadScope) -> String {
        format!(
            "{}/boxes/{}/{}/versions/{}/providers/{}/uploads/",
            self.api_root,
            encode(&scope.owner),
            encode(&scope.box_name),
            encode(&scope.version),
            encode(&scope.provider),
        )
    }

    pub fn session_url(&self, scope: &UploadScope, checksum: &ContentHash) -> String {
        format!("{}{}/", self.uploads_url(scope), encode(checksum.as_str()))
    }

    async fn get_session(
        &self,
        scope: &UploadScope,
        checksum: &ContentHash,
    ) -> Result<Option<UploadSessionInfo>, RemoteError> {
        let url = self.session_url(scope, checksum);
        let resp = self.http.get(&url).send().await.map_err(transport)?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(%url, "no upload session");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        decode(resp).await.map(Some)
    }

    async fn post_session(
        &self,
        scope: &UploadScope,
        request: &CreateUploadRequest,
    ) -> Result<UploadSessionInfo, RemoteError> {
        let url = self.uploads_url(scope);
        let resp = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        decode(resp).await
    }

    async fn put_chunk(
        &self,
        scope: &UploadScope,
        checksum: &ContentHash,
        chunk: Chunk,
    ) -> Result<ChunkAck, RemoteError> {
        let url = self.session_url(scope, checksum);
        let range = chunk.range;
        let resp = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_RANGE, range.header_value())
            .body(chunk.data)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(error_from_response(resp).await);
        }

        let body = resp.bytes().await.map_err(transport)?;
        let offset = match serde_json::from_slice::<UploadSessionInfo>(&body) {
            Ok(info) => Some(info.offset),
            Err(e) => {
                debug!(%range, error = %e, "chunk acknowledged without a session body");
                None
            }
        };
        debug!(%range, status = status.as_u16(), ?offset, "chunk acknowledged");
        Ok(ChunkAck { offset })
    }
}

impl UploadRemote for RegistryClient {
    fn fetch_session<'a>(
        &'a self,
        scope: &'a UploadScope,
        checksum: &'a ContentHash,
    ) -> RemoteFuture<'a, Option<UploadSessionInfo>> {
        Box::pin(self.get_session(scope, checksum))
    }

    fn create_session<'a>(
        &'a self,
        scope: &'a UploadScope,
        request: &'a CreateUploadRequest,
    ) -> RemoteFuture<'a, UploadSessionInfo> {
        Box::pin(self.post_session(scope, request))
    }

    fn upload_chunk<'a>(
        &'a self,
        scope: &'a UploadScope,
        checksum: &'a ContentHash,
        chunk: Chunk,
    ) -> RemoteFuture<'a, ChunkAck> {
        Box::pin(self.put_chunk(scope, checksum, chunk))
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
    let body = resp.bytes().await.map_err(transport)?;
    serde_json::from_slice(&body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

/// Maps a non-2xx response onto the remote error taxonomy.
///
/// Any 4xx carrying an `offset` is a range conflict, whatever the exact code.
async fn error_from_response(resp: reqwest::Response) -> RemoteError {
    let status = resp.status();
    let body = match resp.bytes().await {
        Ok(body) => ApiErrorBody::from_slice(&body),
        Err(e) => return transport(e),
    };

    if status.is_client_error()
        && let Some(offset) = body.offset()
    {
        return RemoteError::RangeConflict {
            offset,
            detail: body.message(),
        };
    }

    if status == StatusCode::BAD_REQUEST {
        let fields = body.field_errors();
        if !fields.is_empty() {
            return RemoteError::Validation(fields);
        }
    }

    RemoteError::Status {
        status: status.as_u16(),
        message: body.message(),
    }
}
