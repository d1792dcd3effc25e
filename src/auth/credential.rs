//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::error::{ia_err, DaoError};
use serde_json::{Map, Value};

pub(crate) const SERVICE_SUBJECT: &str = "serviceSubject";
pub(crate) const CLIENT: &str = "client";

const CELL_URL: &str = "cellUrl";
const USER_ID: &str = "userId";
const PASSWORD: &str = "password";
const ACCESS_TOKEN: &str = "accessToken";
const REFRESH_TOKEN: &str = "refreshToken";
const SCHEMA_URL: &str = "schemaUrl";
const SCHEMA_USER_ID: &str = "schemaUserId";
const SCHEMA_PASSWORD: &str = "schemaPassword";

/// Credentials of an account in a schema (application) cell, used to obtain a
/// client secret for schema-authenticated logins.
#[derive(Clone, PartialEq)]
pub struct SchemaAuth {
    pub schema_url: String,
    pub schema_user_id: String,
    pub schema_password: String,
}

impl std::fmt::Debug for SchemaAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaAuth")
            .field("schema_url", &self.schema_url)
            .field("schema_user_id", &self.schema_user_id)
            .field("schema_password", &"<redacted>")
            .finish()
    }
}

/// The authentication flow selected for a call chain.
///
/// Usually produced by [`Credential::resolve()`] from a loosely-typed
/// parameter, but each variant can also be built directly.
#[derive(Clone, PartialEq)]
pub enum Credential {
    /// Log in as the service subject configured on the [`DaoBuilder`](crate::DaoBuilder).
    ServiceSubject,
    /// Reuse the bearer token of the client that invoked the current script.
    ClientToken,
    PasswordAuth {
        cell_url: String,
        user_id: String,
        password: String,
    },
    PasswordAuthWithSchema {
        cell_url: String,
        user_id: String,
        password: String,
        schema: SchemaAuth,
    },
    /// Exchange a token issued by another cell (transcell token) for a token of `cell_url`.
    TokenAuth {
        cell_url: String,
        access_token: String,
    },
    TokenAuthWithSchema {
        cell_url: String,
        access_token: String,
        schema: SchemaAuth,
    },
    RefreshTokenAuth {
        cell_url: String,
        refresh_token: String,
    },
    /// Use an already issued access token as is.
    BareToken {
        access_token: String,
    },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::PasswordAuth {
                cell_url, user_id, ..
            } => write!(f, "PasswordAuth({}, {})", cell_url, user_id),
            Credential::PasswordAuthWithSchema {
                cell_url,
                user_id,
                schema,
                ..
            } => write!(
                f,
                "PasswordAuthWithSchema({}, {}, {:?})",
                cell_url, user_id, schema
            ),
            Credential::TokenAuth { cell_url, .. } => write!(f, "TokenAuth({})", cell_url),
            Credential::TokenAuthWithSchema {
                cell_url, schema, ..
            } => write!(f, "TokenAuthWithSchema({}, {:?})", cell_url, schema),
            Credential::RefreshTokenAuth { cell_url, .. } => {
                write!(f, "RefreshTokenAuth({})", cell_url)
            }
            _ => f.write_str(self.flow_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    PasswordWithSchema,
    TokenWithSchema,
    Password,
    Token,
    Refresh,
    Bare,
}

// Checked in order; the first shape whose fields are all present wins.
const SHAPES: &[(Shape, &[&str])] = &[
    (
        Shape::PasswordWithSchema,
        &[
            CELL_URL,
            USER_ID,
            PASSWORD,
            SCHEMA_URL,
            SCHEMA_USER_ID,
            SCHEMA_PASSWORD,
        ],
    ),
    (
        Shape::TokenWithSchema,
        &[
            CELL_URL,
            ACCESS_TOKEN,
            SCHEMA_URL,
            SCHEMA_USER_ID,
            SCHEMA_PASSWORD,
        ],
    ),
    (Shape::Password, &[CELL_URL, USER_ID, PASSWORD]),
    (Shape::Token, &[CELL_URL, ACCESS_TOKEN]),
    (Shape::Refresh, &[CELL_URL, REFRESH_TOKEN]),
    (Shape::Bare, &[ACCESS_TOKEN]),
];

// A field is present when it holds a non-empty string.
fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    match obj.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

impl Credential {
    /// Select the credential flow for a parameter value.
    ///
    /// `param` is either the string `"serviceSubject"`, the string `"client"`,
    /// or an object of named string fields:
    /// ```
    /// use personium_dao::Credential;
    /// use serde_json::json;
    ///
    /// let c = Credential::resolve(&json!({"accessToken": "tok"})).unwrap();
    /// assert!(matches!(c, Credential::BareToken { .. }));
    ///
    /// let c = Credential::resolve(&json!({"cellUrl": "app", "accessToken": "tok"})).unwrap();
    /// assert!(matches!(c, Credential::TokenAuth { .. }));
    /// ```
    /// Objects matching none of the known shapes are rejected with an
    /// `InvalidParameter` error.
    pub fn resolve(param: &Value) -> Result<Credential, DaoError> {
        let obj = match param {
            Value::String(s) if s == SERVICE_SUBJECT => return Ok(Credential::ServiceSubject),
            Value::String(s) if s == CLIENT => return Ok(Credential::ClientToken),
            Value::String(s) => {
                return ia_err!(
                    "unknown credential '{}': expected '{}', '{}' or an object",
                    s,
                    SERVICE_SUBJECT,
                    CLIENT
                );
            }
            Value::Object(obj) => obj,
            other => {
                return ia_err!("credential must be a string or an object, got {}", other);
            }
        };
        let shape = SHAPES
            .iter()
            .find(|(_, required)| required.iter().all(|f| field(obj, f).is_some()))
            .map(|(shape, _)| *shape);
        let take = |name: &str| field(obj, name).unwrap_or_default().to_string();
        let schema = || SchemaAuth {
            schema_url: take(SCHEMA_URL),
            schema_user_id: take(SCHEMA_USER_ID),
            schema_password: take(SCHEMA_PASSWORD),
        };
        let credential = match shape {
            Some(Shape::PasswordWithSchema) => Credential::PasswordAuthWithSchema {
                cell_url: take(CELL_URL),
                user_id: take(USER_ID),
                password: take(PASSWORD),
                schema: schema(),
            },
            Some(Shape::TokenWithSchema) => Credential::TokenAuthWithSchema {
                cell_url: take(CELL_URL),
                access_token: take(ACCESS_TOKEN),
                schema: schema(),
            },
            Some(Shape::Password) => Credential::PasswordAuth {
                cell_url: take(CELL_URL),
                user_id: take(USER_ID),
                password: take(PASSWORD),
            },
            Some(Shape::Token) => Credential::TokenAuth {
                cell_url: take(CELL_URL),
                access_token: take(ACCESS_TOKEN),
            },
            Some(Shape::Refresh) => Credential::RefreshTokenAuth {
                cell_url: take(CELL_URL),
                refresh_token: take(REFRESH_TOKEN),
            },
            Some(Shape::Bare) => Credential::BareToken {
                access_token: take(ACCESS_TOKEN),
            },
            None => {
                let mut names: Vec<&String> = obj.keys().collect();
                names.sort();
                return ia_err!("no credential flow matches the given fields {:?}", names);
            }
        };
        Ok(credential)
    }

    pub fn password(cell_url: &str, user_id: &str, password: &str) -> Credential {
        Credential::PasswordAuth {
            cell_url: cell_url.to_string(),
            user_id: user_id.to_string(),
            password: password.to_string(),
        }
    }

    pub fn token(cell_url: &str, access_token: &str) -> Credential {
        Credential::TokenAuth {
            cell_url: cell_url.to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn refresh(cell_url: &str, refresh_token: &str) -> Credential {
        Credential::RefreshTokenAuth {
            cell_url: cell_url.to_string(),
            refresh_token: refresh_token.to_string(),
        }
    }

    pub fn bare(access_token: &str) -> Credential {
        Credential::BareToken {
            access_token: access_token.to_string(),
        }
    }

    /// Add schema authentication to a password or token credential.
    ///
    /// Other variants are returned unchanged.
    pub fn with_schema(self, schema: SchemaAuth) -> Credential {
        match self {
            Credential::PasswordAuth {
                cell_url,
                user_id,
                password,
            } => Credential::PasswordAuthWithSchema {
                cell_url,
                user_id,
                password,
                schema,
            },
            Credential::TokenAuth {
                cell_url,
                access_token,
            } => Credential::TokenAuthWithSchema {
                cell_url,
                access_token,
                schema,
            },
            other => other,
        }
    }

    /// Short name of the selected flow, safe to log.
    pub fn flow_name(&self) -> &'static str {
        match self {
            Credential::ServiceSubject => "ServiceSubject",
            Credential::ClientToken => "ClientToken",
            Credential::PasswordAuth { .. } => "PasswordAuth",
            Credential::PasswordAuthWithSchema { .. } => "PasswordAuthWithSchema",
            Credential::TokenAuth { .. } => "TokenAuth",
            Credential::TokenAuthWithSchema { .. } => "TokenAuthWithSchema",
            Credential::RefreshTokenAuth { .. } => "RefreshTokenAuth",
            Credential::BareToken { .. } => "BareToken",
        }
    }
}

impl TryFrom<&Value> for Credential {
    type Error = DaoError;

    fn try_from(param: &Value) -> Result<Self, Self::Error> {
        Credential::resolve(param)
    }
}
