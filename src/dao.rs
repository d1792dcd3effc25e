//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::accessor::Accessor;
use crate::auth::credential::Credential;
use crate::auth::token;
use crate::dao_builder::DaoBuilder;
use crate::error::{ia_err, user_agent, DaoError};

use bytes::Bytes;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::result::Result;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Etag value matching any version of a resource.
pub const ETAG_ANY: &str = "*";

pub(crate) const CONTENT_JSON: &str = "application/json";
pub(crate) const CONTENT_XML: &str = "application/xml";
pub(crate) const HEADER_IF_MATCH: &str = "if-match";
pub(crate) const HEADER_CREDENTIAL: &str = "x-personium-credential";
const HEADER_VERSION: &str = "x-personium-version";
const HEADER_REQUEST_ID: &str = "x-personium-requestkey";

/// **The main entry point**.
///
/// Holds the process-wide configuration and the http client. It should be
/// created once and shared across the application.
///
/// Note: there is no need to enclose this struct in an `Rc` or [`Arc`], as it uses an
/// [`Arc`] internally, so calling `.clone()` on this struct will always return the
/// same underlying connection pool.
#[derive(Clone, Debug)]
pub struct Dao {
    // Use an inner Arc so cloning keeps the same contents
    pub(crate) inner: Arc<DaoRef>,
}

#[derive(Debug)]
pub(crate) struct DaoRef {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) builder: DaoBuilder,
    request_id: AtomicUsize,
    timeout: Duration,
}

impl Dao {
    /// Create a new [`DaoBuilder`].
    pub fn builder() -> DaoBuilder {
        DaoBuilder::new()
    }

    // Create the new Dao based on builder configuration
    pub(crate) async fn new(b: &DaoBuilder) -> Result<Dao, DaoError> {
        if b.base_url.is_empty() {
            if b.from_environment {
                return ia_err!("can't determine the unit url: set PERSONIUM_BASE_URL");
            }
            return ia_err!("can't determine the unit url: call DaoBuilder::base_url()");
        }
        let builder = b.clone();
        // default timeout to 30 seconds
        let timeout = builder.timeout.unwrap_or(Duration::new(30, 0));
        let c = {
            if let Some(c) = &builder.client {
                c.clone()
            } else {
                let mut cb = reqwest::Client::builder()
                    .timeout(timeout)
                    .connect_timeout(timeout);
                if builder.accept_invalid_certs {
                    cb = cb.danger_accept_invalid_certs(true);
                }
                cb.build()?
            }
        };
        debug!(
            "Creating new Dao: base_url={}, version={:?}, async_event_log={}",
            builder.base_url, builder.protocol_version, builder.async_event_log
        );
        Ok(Dao {
            inner: Arc::new(DaoRef {
                client: c,
                base_url: builder.base_url.clone(),
                builder,
                timeout,
                request_id: AtomicUsize::new(1),
            }),
        })
    }

    /// Run the credential flow selected by `param` and return an [`Accessor`]
    /// holding the resulting token.
    ///
    /// See [`Credential::resolve()`] for the accepted shapes.
    pub async fn authenticate(&self, param: &Value) -> Result<Accessor, DaoError> {
        let credential = Credential::resolve(param)?;
        self.authenticate_with(credential).await
    }

    /// Run an already resolved credential flow.
    pub async fn authenticate_with(&self, credential: Credential) -> Result<Accessor, DaoError> {
        let tok = token::obtain(self, &credential).await?;
        Ok(Accessor::new(self.clone(), credential, tok))
    }

    /// A copy of this Dao whose `"client"` credential uses `token`.
    ///
    /// The copy shares the http connection pool.
    pub fn with_client_token(&self, token: &str) -> Dao {
        let mut builder = self.inner.builder.clone();
        builder.client_token = Some(token.to_string());
        Dao {
            inner: Arc::new(DaoRef {
                client: self.inner.client.clone(),
                base_url: self.inner.base_url.clone(),
                builder,
                timeout: self.inner.timeout,
                request_id: AtomicUsize::new(self.inner.request_id.load(Ordering::Relaxed)),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.inner.builder.protocol_version.as_deref()
    }

    pub fn async_event_log(&self) -> bool {
        self.inner.builder.async_event_log
    }

    /// Resolve a cell name or absolute cell URL to a cell URL ending with `/`.
    pub fn cell_url(&self, name_or_url: &str) -> Result<String, DaoError> {
        let trimmed = name_or_url.trim_end_matches('/');
        if trimmed.is_empty() {
            return ia_err!("cell name must not be empty");
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            url::Url::parse(trimmed)?;
            return Ok(format!("{}/", trimmed));
        }
        if trimmed.contains('/') {
            return ia_err!("invalid cell name '{}'", name_or_url);
        }
        Ok(format!("{}/{}/", self.inner.base_url, trimmed))
    }

    pub(crate) fn default_cell_url(&self) -> Result<Option<String>, DaoError> {
        match &self.inner.builder.default_cell {
            Some(c) => Ok(Some(self.cell_url(c)?)),
            None => Ok(None),
        }
    }

    /// Execute a request, mapping any non-success status into a [`DaoError`].
    pub(crate) async fn send(&self, req: DaoRequest) -> Result<DaoResponse, DaoError> {
        let request_id = self.inner.request_id.fetch_add(1, Ordering::Relaxed);
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(user_agent())?);
        headers.insert(ACCEPT, HeaderValue::from_static(CONTENT_JSON));
        headers.insert(HEADER_REQUEST_ID, HeaderValue::from(request_id));
        if let Some(v) = self.protocol_version() {
            headers.insert(HEADER_VERSION, HeaderValue::from_str(v)?);
        }
        if let Some(t) = &req.token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", t))?);
        }
        for (name, value) in &req.headers {
            headers.insert(name.clone(), HeaderValue::from_str(value)?);
        }
        trace!("{} {} (request {})", req.method, req.url, request_id);

        let mut rb = self
            .inner
            .client
            .request(req.method.clone(), &req.url)
            .timeout(self.inner.timeout)
            .headers(headers);
        if let Some(form) = &req.form {
            rb = rb.form(form);
        } else if let Some(body) = req.body {
            rb = rb.body(body);
        }
        let resp = rb.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            debug!(
                "{} {} failed with status {}: {}",
                req.method, req.url, status, text
            );
            return Err(DaoError::from_response(status.as_u16(), &text));
        }
        Ok(DaoResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

/// One http request against the unit.
#[derive(Debug, Clone)]
pub(crate) struct DaoRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) token: Option<String>,
    pub(crate) headers: Vec<(HeaderName, String)>,
    pub(crate) body: Option<Bytes>,
    pub(crate) form: Option<Vec<(String, String)>>,
}

impl DaoRequest {
    pub(crate) fn new(method: Method, url: &str) -> DaoRequest {
        DaoRequest {
            method,
            url: url.to_string(),
            token: None,
            headers: Vec::new(),
            body: None,
            form: None,
        }
    }

    /// Build a request for a WebDAV/OData extension method such as `MKCOL` or `MERGE`.
    pub(crate) fn extension(method: &str, url: &str) -> Result<DaoRequest, DaoError> {
        match Method::from_bytes(method.as_bytes()) {
            Ok(m) => Ok(DaoRequest::new(m, url)),
            Err(_) => ia_err!("invalid http method '{}'", method),
        }
    }

    pub(crate) fn bearer(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    // `name` must be lowercase
    pub(crate) fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers
            .push((HeaderName::from_static(name), value.to_string()));
        self
    }

    /// Add `If-Match`, defaulting to [`ETAG_ANY`].
    pub(crate) fn if_match(self, etag: Option<&str>) -> Self {
        self.header(HEADER_IF_MATCH, etag.unwrap_or(ETAG_ANY))
    }

    pub(crate) fn json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self, DaoError> {
        let body = serde_json::to_vec(payload)?;
        Ok(self.body(CONTENT_JSON, body))
    }

    pub(crate) fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.headers.push((CONTENT_TYPE, content_type.to_string()));
        self.body = Some(body.into());
        self
    }

    pub(crate) fn form(mut self, form: Vec<(String, String)>) -> Self {
        self.form = Some(form);
        self
    }
}

/// A successful http response.
#[derive(Debug, Clone)]
pub(crate) struct DaoResponse {
    pub(crate) status: u16,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl DaoResponse {
    pub(crate) fn json<T: DeserializeOwned>(&self) -> Result<T, DaoError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The body as JSON, or `Null` when the body is empty.
    pub(crate) fn value(&self) -> Result<Value, DaoError> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        self.json()
    }

    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub(crate) fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    pub(crate) fn etag(&self) -> Option<String> {
        self.header("etag")
    }
}
