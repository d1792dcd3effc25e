//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Request/response adapter for server-side scripts.
//!
//! A script is a handler taking a [`ScriptRequest`] and producing a
//! [`ScriptResponse`]; [`dispatch()`] runs it and turns failures into a 500
//! response.
//! ```no_run
//! use personium_dao::script::{dispatch, ScriptRequest, ScriptResponse};
//! use personium_dao::{Dao, DaoError};
//!
//! # async fn run(dao: Dao, req: ScriptRequest) {
//! let resp = dispatch(req, |mut req| async move {
//!     let acc = req.bind_client(&dao).authenticate(&"client".into()).await?;
//!     let name = req.input.read_all();
//!     let cell = acc.cell(None)?;
//!     Ok::<_, DaoError>(ScriptResponse::new(200)
//!         .header("Content-Type", "text/plain")
//!         .body_line(&format!("hello {} from {}", name, cell.name())))
//! })
//! .await;
//! # }
//! ```
use crate::dao::Dao;
use crate::error::{ia_err, DaoError};

use bytes::Bytes;
use serde_json::{json, Value};
use std::future::Future;
use std::result::Result;
use tracing::warn;

/// The request handed to a script.
#[derive(Debug, Clone, Default)]
pub struct ScriptRequest {
    pub method: String,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub query_string: String,
    pub input: ScriptInput,
}

impl ScriptRequest {
    pub fn new(method: &str, query_string: &str) -> ScriptRequest {
        ScriptRequest {
            method: method.to_uppercase(),
            query_string: query_string.trim_start_matches('?').to_string(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn input(mut self, data: impl Into<Bytes>) -> Self {
        self.input = ScriptInput::new(data);
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The bearer token the script was called with.
    pub fn client_token(&self) -> Option<&str> {
        let auth = self.header_value("authorization")?;
        let (scheme, token) = auth.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Decoded query parameters, in order.
    pub fn query_params(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query_string.as_bytes())
            .into_owned()
            .collect()
    }

    /// A [`Dao`] whose `"client"` credential is this request's bearer token.
    pub fn bind_client(&self, dao: &Dao) -> Dao {
        match self.client_token() {
            Some(t) => dao.with_client_token(t),
            None => dao.clone(),
        }
    }
}

/// The request body, read like a stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptInput {
    data: Bytes,
    pos: usize,
}

impl ScriptInput {
    pub fn new(data: impl Into<Bytes>) -> ScriptInput {
        ScriptInput {
            data: data.into(),
            pos: 0,
        }
    }

    /// Everything not read yet.
    pub fn read_all(&mut self) -> String {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        String::from_utf8_lossy(rest).to_string()
    }

    /// The next line without its line ending, or `None` at the end.
    pub fn read_line(&mut self) -> Option<String> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let (line, used) = match rest.iter().position(|b| *b == b'\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += used;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some(String::from_utf8_lossy(line).to_string())
    }

    pub fn read_json(&mut self) -> Result<Value, DaoError> {
        Ok(serde_json::from_str(&self.read_all())?)
    }
}

/// The response a script returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<String>,
}

impl ScriptResponse {
    pub fn new(status: u16) -> ScriptResponse {
        ScriptResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn json(status: u16, v: &Value) -> ScriptResponse {
        ScriptResponse::new(status)
            .header("Content-Type", "application/json")
            .body_line(&v.to_string())
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body_line(mut self, s: &str) -> Self {
        self.body.push(s.to_string());
        self
    }

    /// Build a response from a loosely-typed `{status, headers, body}` object.
    pub fn from_value(v: &Value) -> Result<ScriptResponse, DaoError> {
        let status = match v.get("status").and_then(|s| s.as_u64()) {
            Some(s) if s <= u16::MAX as u64 => s as u16,
            _ => return ia_err!("script response needs a numeric status"),
        };
        let mut resp = ScriptResponse::new(status);
        if let Some(h) = v.get("headers") {
            let obj = match h.as_object() {
                Some(o) => o,
                None => return ia_err!("script response headers must be an object"),
            };
            for (k, val) in obj {
                match val.as_str() {
                    Some(s) => resp = resp.header(k, s),
                    None => return ia_err!("script response header '{}' must be a string", k),
                }
            }
        }
        let body = match v.get("body").and_then(|b| b.as_array()) {
            Some(b) => b,
            None => return ia_err!("script response body must be an array"),
        };
        for (i, item) in body.iter().enumerate() {
            match item.as_str() {
                Some(s) => resp = resp.body_line(s),
                None => return ia_err!("script response body entry {} is not a string", i),
            }
        }
        resp.validate()?;
        Ok(resp)
    }

    /// Check the status range and header names.
    pub fn validate(&self) -> Result<(), DaoError> {
        if !(100..=599).contains(&self.status) {
            return ia_err!("invalid script response status {}", self.status);
        }
        for (k, v) in &self.headers {
            if reqwest::header::HeaderName::from_bytes(k.as_bytes()).is_err() {
                return ia_err!("invalid script response header name '{}'", k);
            }
            if reqwest::header::HeaderValue::from_str(v).is_err() {
                return ia_err!("invalid value for script response header '{}'", k);
            }
        }
        Ok(())
    }

    /// The body entries concatenated.
    pub fn body_text(&self) -> String {
        self.body.concat()
    }
}

/// Run a script handler, mapping errors and invalid responses to a 500 response.
pub async fn dispatch<F, Fut>(req: ScriptRequest, handler: F) -> ScriptResponse
where
    F: FnOnce(ScriptRequest) -> Fut,
    Fut: Future<Output = Result<ScriptResponse, DaoError>>,
{
    let method = req.method.clone();
    let resp = match handler(req).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Script failed on {}: {}", method, e);
            return server_error(&e);
        }
    };
    if let Err(e) = resp.validate() {
        warn!("Script returned an invalid response: {}", e);
        return server_error(&e);
    }
    resp
}

fn server_error(e: &DaoError) -> ScriptResponse {
    ScriptResponse::json(500, &json!({"code": e.code, "message": e.message}))
}
