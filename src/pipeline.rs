//! Request pipeline
//!
//! Every API call is an [`OutboundRequest`] that passes through an ordered
//! list of [`RequestStage`]s before it reaches the [`Transport`], and whose
//! response then passes through an ordered list of [`ResponseStage`]s. A
//! response stage may replay the request through [`Dispatch`], which re-runs
//! the request stages but not the response stages.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::store::TokenStore;
use crate::transport::{RawResponse, Transport};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of an outbound request
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartPayload),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// One part of a multipart form
#[derive(Clone)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl MultipartPart {
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

impl fmt::Debug for MultipartPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { name, value } => f
                .debug_struct("Text")
                .field("name", name)
                .field("value", value)
                .finish(),
            Self::File {
                name,
                file_name,
                mime,
                bytes,
            } => f
                .debug_struct("File")
                .field("name", name)
                .field("file_name", file_name)
                .field("mime", mime)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// Multipart form kept as plain data so a request can be replayed;
/// the reqwest form is rebuilt on every send
#[derive(Debug, Clone, Default)]
pub struct MultipartPayload {
    parts: Vec<MultipartPart>,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        });
        self
    }

    /// Read a file from disk and attach it, guessing the MIME type from the extension
    pub async fn attach_path(self, name: impl Into<String>, path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ClientError::storage_from_error(format!("Failed to read {}", path.display()), e)
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = content_type_for(path);
        Ok(self.file(name, file_name, mime, bytes))
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn to_form(&self) -> Result<Form> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file_part = Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime)
                        .map_err(|e| {
                            ClientError::invalid_input(format!(
                                "Invalid MIME type '{}' for {}: {}",
                                mime, file_name, e
                            ))
                        })?;
                    form.part(name.clone(), file_part)
                }
            };
        }
        Ok(form)
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        Some("json") => JSON_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}

/// A request on its way to the API
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    retried: bool,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = RequestBody::json(value)?;
        Ok(self)
    }

    pub fn with_multipart(mut self, payload: MultipartPayload) -> Self {
        self.body = RequestBody::Multipart(payload);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this request has already been replayed after a refresh
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// The bearer credential currently attached, if any
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// Transforms a request before it is sent. Runs again on every replay.
pub trait RequestStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, request: &mut OutboundRequest) -> Result<()>;
}

/// Re-sends a request through the request stages and the transport only
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, request: &mut OutboundRequest) -> Result<RawResponse>;
}

/// Inspects a response and may replace it, e.g. by replaying the request
#[async_trait]
pub trait ResponseStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        request: &mut OutboundRequest,
        response: RawResponse,
        dispatch: &dyn Dispatch,
    ) -> Result<RawResponse>;
}

/// Ordered request and response stages
#[derive(Clone, Default)]
pub struct Pipeline {
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.request_stages.push(Arc::new(stage));
        self
    }

    pub fn with_response_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        self.response_stages.push(Arc::new(stage));
        self
    }

    pub fn request_stage_names(&self) -> Vec<&'static str> {
        self.request_stages.iter().map(|s| s.name()).collect()
    }

    pub fn response_stage_names(&self) -> Vec<&'static str> {
        self.response_stages.iter().map(|s| s.name()).collect()
    }

    /// Run the request stages in order
    pub fn prepare(&self, request: &mut OutboundRequest) -> Result<()> {
        for stage in &self.request_stages {
            stage.apply(request)?;
        }
        Ok(())
    }

    /// Prepare, send, then hand the response to each response stage in order.
    /// Transport failures are returned as-is without reaching the response stages.
    pub async fn execute(
        &self,
        transport: &dyn Transport,
        mut request: OutboundRequest,
    ) -> Result<RawResponse> {
        let dispatcher = Dispatcher {
            pipeline: self,
            transport,
        };

        let mut response = dispatcher.dispatch(&mut request).await?;
        for stage in &self.response_stages {
            response = stage.handle(&mut request, response, &dispatcher).await?;
        }
        Ok(response)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request_stages", &self.request_stage_names())
            .field("response_stages", &self.response_stage_names())
            .finish()
    }
}

struct Dispatcher<'a> {
    pipeline: &'a Pipeline,
    transport: &'a dyn Transport,
}

#[async_trait]
impl Dispatch for Dispatcher<'_> {
    async fn dispatch(&self, request: &mut OutboundRequest) -> Result<RawResponse> {
        self.pipeline.prepare(request)?;
        debug!(method = %request.method, path = %request.path, retried = request.is_retried(), "sending request");
        self.transport.send(request).await
    }
}

/// Attaches `Authorization: Bearer <access>` from the token store when signed in
/// and strips any leftover `Authorization` header otherwise
pub struct BearerAuth {
    store: Arc<TokenStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }
}

impl RequestStage for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    fn apply(&self, request: &mut OutboundRequest) -> Result<()> {
        if let Some(access) = self.store.access_credential() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", access)).map_err(|_| {
                ClientError::malformed_credential(
                    "access credential contains characters not allowed in a header",
                )
            })?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        } else {
            request.headers.remove(AUTHORIZATION);
        }
        Ok(())
    }
}

/// Multipart bodies carry no explicit content type so the transport can add
/// the boundary; everything else is declared JSON
#[derive(Debug, Default)]
pub struct ContentNegotiation;

impl RequestStage for ContentNegotiation {
    fn name(&self) -> &'static str {
        "content-negotiation"
    }

    fn apply(&self, request: &mut OutboundRequest) -> Result<()> {
        if request.body.is_multipart() {
            request.headers.remove(CONTENT_TYPE);
        } else {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockTransport;
    use crate::tests::utils::test_helpers::{memory_store, signed_in_store};
    use jobboard_protocol::Role;
    use reqwest::StatusCode;

    #[test]
    fn test_bearer_attached_when_signed_in() {
        let store = signed_in_store("4", Role::Candidate);
        let access = store.access_credential().unwrap();
        let mut request = OutboundRequest::get("/api/jobs/");

        BearerAuth::new(store).apply(&mut request).unwrap();

        assert_eq!(request.bearer(), Some(access.as_str()));
        assert!(request.headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_no_bearer_when_signed_out() {
        let mut request = OutboundRequest::get("/api/jobs/");
        BearerAuth::new(memory_store()).apply(&mut request).unwrap();
        assert!(request.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_multipart_request_has_no_content_type() {
        let payload = MultipartPayload::new()
            .text("cover_letter", "hello")
            .file("cv", "cv.pdf", "application/pdf", b"%PDF".to_vec());
        let mut request = OutboundRequest::post("/api/applications/")
            .with_header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .with_multipart(payload);

        ContentNegotiation.apply(&mut request).unwrap();
        assert!(request.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_json_request_declares_json() {
        let mut request = OutboundRequest::post("/api/jobs/favorites/")
            .with_json(&serde_json::json!({"job_id": 3}))
            .unwrap();
        ContentNegotiation.apply(&mut request).unwrap();
        assert_eq!(
            request.headers.get(CONTENT_TYPE).unwrap(),
            JSON_CONTENT_TYPE
        );

        let mut get = OutboundRequest::get("/api/notifications/");
        ContentNegotiation.apply(&mut get).unwrap();
        assert_eq!(get.headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_payload_builds_form() {
        let payload = MultipartPayload::new()
            .text("title", "Backend engineer")
            .file("logo", "logo.png", "image/png", vec![1, 2, 3]);
        assert_eq!(payload.parts().len(), 2);
        assert_eq!(payload.parts()[1].name(), "logo");
        assert!(payload.to_form().is_ok());

        let bad = MultipartPayload::new().file("x", "x.bin", "not a mime", vec![]);
        assert!(bad.to_form().is_err());
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for(Path::new("cv.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(
            content_type_for(Path::new("archive")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_attach_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let payload = MultipartPayload::new().attach_path("cv", &path).await.unwrap();
        match &payload.parts()[0] {
            MultipartPart::File {
                file_name,
                mime,
                bytes,
                ..
            } => {
                assert_eq!(file_name, "resume.pdf");
                assert_eq!(mime, "application/pdf");
                assert_eq!(bytes, b"%PDF-1.4");
            }
            other => panic!("unexpected part {other:?}"),
        }

        assert!(MultipartPayload::new()
            .attach_path("cv", &dir.path().join("missing.pdf"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_stages_run_in_order_before_send() {
        let store = signed_in_store("9", Role::Employer);
        let transport = MockTransport::new();
        transport.on(
            Method::GET,
            "/api/jobs/",
            RawResponse::new(StatusCode::OK, "[]"),
        );

        let pipeline = Pipeline::new()
            .with_request_stage(BearerAuth::new(store.clone()))
            .with_request_stage(ContentNegotiation);
        assert_eq!(
            pipeline.request_stage_names(),
            vec!["bearer-auth", "content-negotiation"]
        );

        let response = pipeline
            .execute(&transport, OutboundRequest::get("/api/jobs/"))
            .await
            .unwrap();
        assert!(response.is_success());

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].bearer().map(str::to_string),
            store.access_credential()
        );
        assert_eq!(sent[0].headers.get(CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_transport_error_skips_response_stages() {
        struct Panics;

        #[async_trait]
        impl ResponseStage for Panics {
            fn name(&self) -> &'static str {
                "panics"
            }

            async fn handle(
                &self,
                _request: &mut OutboundRequest,
                _response: RawResponse,
                _dispatch: &dyn Dispatch,
            ) -> Result<RawResponse> {
                panic!("response stage must not run");
            }
        }

        let transport = MockTransport::new();
        transport.fail(Method::GET, "/api/jobs/", ClientError::network("connection reset"));

        let err = Pipeline::new()
            .with_response_stage(Panics)
            .execute(&transport, OutboundRequest::get("/api/jobs/"))
            .await
            .unwrap_err();
        assert!(err.is_network_error());
    }
}
