//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use num_enum::TryFromPrimitive;

include!(concat!(env!("OUT_DIR"), "/ua.rs"));

pub(crate) fn sdk_version() -> &'static str {
    SDK_VERSION
}

pub(crate) fn user_agent() -> &'static str {
    USER_AGENT
}

/// Structured error returned by every operation in this library.
///
/// `code` is the HTTP-status-like numeric code reported by the server (or 0 when
/// the failure did not come from a server response). Callers are expected to
/// branch on `code` (or on the derived [`DaoErrorKind`]).
#[derive(Debug, Clone, PartialEq)]
pub struct DaoError {
    pub code: i32,
    pub kind: DaoErrorKind,
    pub message: String,
}

impl std::error::Error for DaoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for DaoError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "code={} kind={:?} message=\"{}\"",
            self.code, self.kind, self.message
        )
    }
}

/// Classification of a [`DaoError`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DaoErrorKind {
    /// A malformed or missing credential or argument.
    InvalidParameter,
    /// The server answered 400.
    RemoteBadRequest,
    /// The server answered 404.
    RemoteNotFound,
    /// The server answered 405, e.g. creating a WebDAV collection that already exists.
    RemoteMethodNotAllowed,
    /// The server answered 409 (duplicate resource, concurrent link) or 412
    /// (etag mismatch).
    RemoteConflict,
    /// The server answered with any other non-success status (401, 403, 5xx...).
    RemoteFailure,
    /// The connection or (de)serialization of a request failed.
    TransportFailure,
    /// Code 0 with an arbitrary message.
    Unclassified,
}

// Statuses that have a dedicated kind.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
enum MappedStatus {
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    Conflict = 409,
    PreconditionFailed = 412,
}

impl DaoErrorKind {
    /// Derive the kind from a numeric code as reported by the server.
    pub fn from_code(code: i32) -> DaoErrorKind {
        if code == 0 {
            return DaoErrorKind::Unclassified;
        }
        match MappedStatus::try_from(code) {
            Ok(MappedStatus::BadRequest) => DaoErrorKind::RemoteBadRequest,
            Ok(MappedStatus::NotFound) => DaoErrorKind::RemoteNotFound,
            Ok(MappedStatus::MethodNotAllowed) => DaoErrorKind::RemoteMethodNotAllowed,
            Ok(MappedStatus::Conflict) | Ok(MappedStatus::PreconditionFailed) => {
                DaoErrorKind::RemoteConflict
            }
            Err(_) => DaoErrorKind::RemoteFailure,
        }
    }
}

impl DaoError {
    pub fn new(kind: DaoErrorKind, msg: &str) -> DaoError {
        DaoError {
            code: 0,
            kind,
            message: msg.to_string(),
        }
    }

    /// Create an error from a numeric code, deriving its kind.
    pub fn from_code(code: i32, msg: &str) -> DaoError {
        DaoError {
            code,
            kind: DaoErrorKind::from_code(code),
            message: msg.to_string(),
        }
    }

    /// Parse raw diagnostic text into a structured error.
    ///
    /// A leading implementation identifier (the text up to the first space) is
    /// dropped when it comes before the first comma. The rest is split on the
    /// first comma: an integer left side becomes the code and the right side
    /// the message. Without a comma, or with a non-integer left side, the code
    /// is 0 and the whole remainder is the message.
    ///
    /// ```
    /// use personium_dao::DaoError;
    /// let e = DaoError::from_diagnostic("DaoException: 409,already exists");
    /// assert_eq!(e.code, 409);
    /// assert_eq!(e.message, "already exists");
    /// ```
    pub fn from_diagnostic(raw: &str) -> DaoError {
        let rest = match (raw.find(' '), raw.find(',')) {
            (Some(sp), Some(comma)) if sp < comma => &raw[sp + 1..],
            (Some(sp), None) => &raw[sp + 1..],
            _ => raw,
        };
        if let Some((left, right)) = rest.split_once(',') {
            if let Ok(code) = left.trim().parse::<i32>() {
                return DaoError::from_code(code, right);
            }
        }
        DaoError::from_code(0, rest)
    }

    /// Map a non-success http response into a structured error.
    pub(crate) fn from_response(status: u16, body: &str) -> DaoError {
        DaoError::from_diagnostic(&format!("{},{}", status, body))
    }

    /// The platform error code (e.g. `PR409-OD-0003`) if the message is a JSON error body.
    pub fn server_code(&self) -> Option<String> {
        let v: serde_json::Value = serde_json::from_str(&self.message).ok()?;
        v.get("code")?.as_str().map(|s| s.to_string())
    }

    /// The human readable message from a JSON error body, if any.
    pub fn server_message(&self) -> Option<String> {
        let v: serde_json::Value = serde_json::from_str(&self.message).ok()?;
        match v.get("message")? {
            serde_json::Value::String(s) => Some(s.clone()),
            m => m.get("value")?.as_str().map(|s| s.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == DaoErrorKind::RemoteNotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == DaoErrorKind::RemoteConflict
    }
}

macro_rules! ia_error {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        DaoError {
            code: 0,
            kind: crate::error::DaoErrorKind::InvalidParameter,
            message: format!("{} ({})", m, crate::error::sdk_version()),
        }
    }};
}

pub(crate) use ia_error;

macro_rules! ia_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        Err(DaoError {
            code: 0,
            kind: crate::error::DaoErrorKind::InvalidParameter,
            message: format!("{} ({})", m, crate::error::sdk_version()),
        })
    }};
}

pub(crate) use ia_err;

impl From<reqwest::Error> for DaoError {
    fn from(e: reqwest::Error) -> Self {
        let mut message = format!("reqwest error: {} ({})", e, sdk_version());
        if e.is_timeout() {
            message.insert_str(0, "timed out: ");
        }
        DaoError {
            code: 0,
            kind: DaoErrorKind::TransportFailure,
            message,
        }
    }
}

impl From<serde_json::Error> for DaoError {
    fn from(e: serde_json::Error) -> Self {
        DaoError {
            code: 0,
            kind: DaoErrorKind::TransportFailure,
            message: format!("invalid json: {} ({})", e, sdk_version()),
        }
    }
}

impl From<roxmltree::Error> for DaoError {
    fn from(e: roxmltree::Error) -> Self {
        DaoError {
            code: 0,
            kind: DaoErrorKind::TransportFailure,
            message: format!("invalid xml: {} ({})", e, sdk_version()),
        }
    }
}

impl From<reqwest::header::InvalidHeaderValue> for DaoError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        ia_error!("invalid header value: {}", e)
    }
}

impl From<url::ParseError> for DaoError {
    fn from(e: url::ParseError) -> Self {
        ia_error!("error parsing url: {}", e)
    }
}

impl From<ini::Error> for DaoError {
    fn from(e: ini::Error) -> Self {
        ia_error!("error reading config file: {}", e)
    }
}
