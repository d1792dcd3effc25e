//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! `$batch` requests: several operations on one OData collection in a single
//! `multipart/mixed` round trip.
use crate::dao::{CONTENT_JSON, ETAG_ANY};
use crate::error::{ia_err, DaoError};
use crate::query::QuerySpec;
use crate::resource::{Context, ODataKey};

use reqwest::Method;
use serde_json::Value;
use std::result::Result;
use tracing::{debug, trace};

const CRLF: &str = "\r\n";

#[derive(Debug, Clone, PartialEq)]
struct BatchOp {
    method: Method,
    path: String,
    etag: Option<String>,
    body: Option<Value>,
}

impl BatchOp {
    fn write(&self, out: &mut String) {
        out.push_str("Content-Type: application/http");
        out.push_str(CRLF);
        out.push_str("Content-Transfer-Encoding: binary");
        out.push_str(CRLF);
        out.push_str(CRLF);
        out.push_str(&format!("{} {} HTTP/1.1{}", self.method, self.path, CRLF));
        if let Some(etag) = &self.etag {
            out.push_str(&format!("If-Match: {}{}", etag, CRLF));
        }
        match &self.body {
            Some(b) => {
                let body = b.to_string();
                out.push_str(&format!("Content-Type: {}{}", CONTENT_JSON, CRLF));
                out.push_str(&format!("Content-Length: {}{}", body.len(), CRLF));
                out.push_str(CRLF);
                out.push_str(&body);
                out.push_str(CRLF);
            }
            None => out.push_str(CRLF),
        }
    }
}

/// A group of writes the server applies atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    ops: Vec<BatchOp>,
}

impl ChangeSet {
    pub fn new() -> ChangeSet {
        ChangeSet::default()
    }

    pub fn create(mut self, entity_set: &str, payload: Value) -> Self {
        self.ops.push(BatchOp {
            method: Method::POST,
            path: entity_set.to_string(),
            etag: None,
            body: Some(payload),
        });
        self
    }

    pub fn update(
        mut self,
        entity_set: &str,
        key: impl Into<ODataKey>,
        payload: Value,
        etag: Option<&str>,
    ) -> Self {
        self.ops.push(BatchOp {
            method: Method::PUT,
            path: format!("{}{}", entity_set, key.into()),
            etag: Some(etag.unwrap_or(ETAG_ANY).to_string()),
            body: Some(payload),
        });
        self
    }

    pub fn del(mut self, entity_set: &str, key: impl Into<ODataKey>, etag: Option<&str>) -> Self {
        self.ops.push(BatchOp {
            method: Method::DELETE,
            path: format!("{}{}", entity_set, key.into()),
            etag: Some(etag.unwrap_or(ETAG_ANY).to_string()),
            body: None,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum BatchPart {
    Read(BatchOp),
    Changes(ChangeSet),
}

/// Status and body of one operation of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub status: u16,
    pub body: String,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, DaoError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }

    /// The error this operation failed with, if it failed.
    pub fn error(&self) -> Option<DaoError> {
        if self.is_success() {
            return None;
        }
        Some(DaoError::from_response(self.status, self.body.trim()))
    }
}

/// A `$batch` request under construction. Operations are sent in the order added.
#[derive(Debug, Clone)]
pub struct Batch {
    ctx: Context,
    url: String,
    parts: Vec<BatchPart>,
}

fn boundary(prefix: &str) -> String {
    format!("{}_{:016x}", prefix, rand::random::<u64>())
}

impl Batch {
    pub(crate) fn new(ctx: Context, url: &str) -> Batch {
        Batch {
            ctx,
            url: url.to_string(),
            parts: Vec::new(),
        }
    }

    /// Read one entity.
    pub fn get(mut self, entity_set: &str, key: impl Into<ODataKey>) -> Self {
        self.parts.push(BatchPart::Read(BatchOp {
            method: Method::GET,
            path: format!("{}{}", entity_set, key.into()),
            etag: None,
            body: None,
        }));
        self
    }

    /// Query an entity set.
    pub fn query(mut self, entity_set: &str, spec: &QuerySpec) -> Self {
        let path = if spec.is_empty() {
            entity_set.to_string()
        } else {
            format!("{}?{}", entity_set, spec.to_query_string())
        };
        self.parts.push(BatchPart::Read(BatchOp {
            method: Method::GET,
            path,
            etag: None,
            body: None,
        }));
        self
    }

    pub fn changeset(mut self, changes: ChangeSet) -> Self {
        if !changes.is_empty() {
            self.parts.push(BatchPart::Changes(changes));
        }
        self
    }

    fn to_body(&self, batch_boundary: &str) -> String {
        let mut out = String::new();
        for part in &self.parts {
            out.push_str(&format!("--{}{}", batch_boundary, CRLF));
            match part {
                BatchPart::Read(op) => op.write(&mut out),
                BatchPart::Changes(cs) => {
                    let cb = boundary("changeset");
                    out.push_str(&format!(
                        "Content-Type: multipart/mixed; boundary={}{}{}",
                        cb, CRLF, CRLF
                    ));
                    for op in &cs.ops {
                        out.push_str(&format!("--{}{}", cb, CRLF));
                        op.write(&mut out);
                    }
                    out.push_str(&format!("--{}--{}", cb, CRLF));
                }
            }
            out.push_str(CRLF);
        }
        out.push_str(&format!("--{}--{}", batch_boundary, CRLF));
        out
    }

    /// Send the batch. One result is returned per operation, in order.
    pub async fn send(&self) -> Result<Vec<BatchResult>, DaoError> {
        if self.parts.is_empty() {
            return ia_err!("batch has no operations");
        }
        let b = boundary("batch");
        let body = self.to_body(&b);
        debug!("Sending batch of {} parts to {}", self.parts.len(), self.url);
        trace!("batch body:\n{}", body);
        let req = self.ctx.request(Method::POST, &self.url).body(
            &format!("multipart/mixed; boundary={}", b),
            body.into_bytes(),
        );
        let resp = self.ctx.send(req).await?;
        let ct = resp.header("content-type").unwrap_or_default();
        let rb = match boundary_of(&ct) {
            Some(rb) => rb,
            None => return ia_err!("batch response is not multipart: '{}'", ct),
        };
        parse_multipart(&resp.text(), &rb)
    }
}

fn boundary_of(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(|s| s.trim())
        .find_map(|s| s.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_string())
}

// Split a multipart body into results, descending into nested changesets.
fn parse_multipart(body: &str, boundary: &str) -> Result<Vec<BatchResult>, DaoError> {
    let delim = format!("--{}", boundary);
    let mut results = Vec::new();
    for part in body.split(delim.as_str()).skip(1) {
        if part.starts_with("--") {
            break;
        }
        let part = part.trim_start_matches(CRLF).trim_start_matches('\n');
        let (headers, content) = split_head(part);
        let ct = headers
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                if k.trim().eq_ignore_ascii_case("content-type") {
                    Some(v.trim().to_string())
                } else {
                    None
                }
            })
            .unwrap_or_default();
        if ct.starts_with("multipart/mixed") {
            match boundary_of(&ct) {
                Some(inner) => results.extend(parse_multipart(content, &inner)?),
                None => return ia_err!("changeset without boundary in batch response"),
            }
            continue;
        }
        results.push(parse_http(content)?);
    }
    Ok(results)
}

// `HTTP/1.1 201 Created` + headers + body
fn parse_http(msg: &str) -> Result<BatchResult, DaoError> {
    let (head, body) = split_head(msg.trim_start());
    let status_line = head.lines().next().unwrap_or_default();
    let status = match status_line.split_whitespace().nth(1).map(|s| s.parse::<u16>()) {
        Some(Ok(s)) => s,
        _ => return ia_err!("invalid status line in batch response: '{}'", status_line),
    };
    Ok(BatchResult {
        status,
        body: body.trim_end_matches(['\r', '\n']).to_string(),
    })
}

fn split_head(s: &str) -> (&str, &str) {
    if let Some(i) = s.find("\r\n\r\n") {
        return (&s[..i], &s[i + 4..]);
    }
    if let Some(i) = s.find("\n\n") {
        return (&s[..i], &s[i + 2..]);
    }
    (s, "")
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn changeset_ops_default_to_any_etag() {
        let cs = ChangeSet::new()
            .update("Pet", "p1", json!({"name": "x"}), None)
            .del("Pet", "p2", Some("W/\"3\""));
        assert_eq!(cs.ops[0].etag.as_deref(), Some("*"));
        assert_eq!(cs.ops[0].path, "Pet('p1')");
        assert_eq!(cs.ops[1].etag.as_deref(), Some("W/\"3\""));
    }

    #[test]
    fn parts_have_no_empty_headers() {
        let op = BatchOp {
            method: Method::DELETE,
            path: "Pet('p2')".to_string(),
            etag: Some("*".to_string()),
            body: None,
        };
        let mut out = String::new();
        op.write(&mut out);
        assert!(out.contains("DELETE Pet('p2') HTTP/1.1\r\nIf-Match: *\r\n"));
        assert!(!out.contains("Host:"));
        assert!(out.lines().all(|l| !l.trim_end().ends_with(':')));
    }

    #[test]
    fn parses_nested_response() {
        let body = "--batch_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"d\":{\"results\":{\"__id\":\"p1\"}}}\r\n\
--batch_1\r\n\
Content-Type: multipart/mixed; boundary=changeset_2\r\n\
\r\n\
--changeset_2\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 201 Created\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"d\":{\"results\":{\"__id\":\"p3\"}}}\r\n\
--changeset_2\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 409 Conflict\r\n\
\r\n\
{\"code\":\"PR409-OD-0003\"}\r\n\
--changeset_2--\r\n\
\r\n\
--batch_1--\r\n";
        let r = parse_multipart(body, "batch_1").unwrap();
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].status, 200);
        assert_eq!(r[0].json().unwrap()["d"]["results"]["__id"], "p1");
        assert_eq!(r[1].status, 201);
        assert!(r[1].is_success());
        assert_eq!(r[2].status, 409);
        let e = r[2].error().unwrap();
        assert!(e.is_conflict());
        assert_eq!(e.server_code().as_deref(), Some("PR409-OD-0003"));
    }

    #[test]
    fn boundary_parsing() {
        assert_eq!(
            boundary_of("multipart/mixed; boundary=batch_abc").as_deref(),
            Some("batch_abc")
        );
        assert_eq!(
            boundary_of("multipart/mixed; boundary=\"q\"").as_deref(),
            Some("q")
        );
        assert_eq!(boundary_of("application/json"), None);
    }

    #[test]
    fn bad_status_line() {
        assert!(parse_http("garbage\r\n\r\n").is_err());
    }
}
