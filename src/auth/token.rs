//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::auth::credential::{Credential, SchemaAuth};
use crate::dao::{Dao, DaoRequest};
use crate::error::{ia_error, DaoError};
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_derive::Deserialize;
use tracing::debug;

const GRANT_PASSWORD: &str = "password";
const GRANT_SAML2_BEARER: &str = "urn:ietf:params:oauth:grant-type:saml2-bearer";
const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Tokens returned by a cell's token endpoint.
#[derive(Clone, Default, Deserialize, PartialEq)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: String,
    /// Lifetime of the access token, in seconds.
    #[serde(default)]
    pub expires_in: i64,
    /// Lifetime of the refresh token, in seconds.
    #[serde(default)]
    pub refresh_token_expires_in: i64,
    #[serde(skip)]
    pub issued_at: DateTime<Utc>,
    /// The cell that issued the token, if known.
    #[serde(skip)]
    pub cell_url: Option<String>,
}

impl std::fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInfo")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .field("cell_url", &self.cell_url)
            .finish_non_exhaustive()
    }
}

impl TokenInfo {
    /// A token that was not issued by a token endpoint call.
    pub fn bare(access_token: &str, cell_url: Option<String>) -> TokenInfo {
        TokenInfo {
            access_token: access_token.to_string(),
            token_type: "Bearer".to_string(),
            issued_at: Utc::now(),
            cell_url,
            ..Default::default()
        }
    }

    /// When the access token expires, if the lifetime is known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.expires_in <= 0 {
            return None;
        }
        Some(self.issued_at + Duration::seconds(self.expires_in))
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(t) => t <= Utc::now(),
            None => false,
        }
    }
}

/// Run the token flow selected by `credential`.
pub(crate) async fn obtain(dao: &Dao, credential: &Credential) -> Result<TokenInfo, DaoError> {
    debug!("Obtaining token using {} flow", credential.flow_name());
    let builder = &dao.inner.builder;
    match credential {
        Credential::ServiceSubject => {
            let ss = builder.service_subject.as_ref().ok_or_else(|| {
                ia_error!("no service subject configured: call DaoBuilder::service_subject()")
            })?;
            let cell = dao.cell_url(&ss.cell)?;
            let form = password_form(&ss.username, &ss.password);
            request_token(dao, &cell, form).await
        }
        Credential::ClientToken => {
            let token = builder.client_token.as_ref().ok_or_else(|| {
                ia_error!("no client token available: call DaoBuilder::client_token()")
            })?;
            Ok(TokenInfo::bare(token, dao.default_cell_url()?))
        }
        Credential::PasswordAuth {
            cell_url,
            user_id,
            password,
        } => {
            let cell = dao.cell_url(cell_url)?;
            request_token(dao, &cell, password_form(user_id, password)).await
        }
        Credential::PasswordAuthWithSchema {
            cell_url,
            user_id,
            password,
            schema,
        } => {
            let cell = dao.cell_url(cell_url)?;
            let mut form = password_form(user_id, password);
            form.extend(schema_client(dao, &cell, schema).await?);
            request_token(dao, &cell, form).await
        }
        Credential::TokenAuth {
            cell_url,
            access_token,
        } => {
            let cell = dao.cell_url(cell_url)?;
            request_token(dao, &cell, assertion_form(access_token)).await
        }
        Credential::TokenAuthWithSchema {
            cell_url,
            access_token,
            schema,
        } => {
            let cell = dao.cell_url(cell_url)?;
            let mut form = assertion_form(access_token);
            form.extend(schema_client(dao, &cell, schema).await?);
            request_token(dao, &cell, form).await
        }
        Credential::RefreshTokenAuth {
            cell_url,
            refresh_token,
        } => {
            let cell = dao.cell_url(cell_url)?;
            let form = vec![
                ("grant_type".to_string(), GRANT_REFRESH_TOKEN.to_string()),
                ("refresh_token".to_string(), refresh_token.clone()),
            ];
            request_token(dao, &cell, form).await
        }
        Credential::BareToken { access_token } => {
            Ok(TokenInfo::bare(access_token, dao.default_cell_url()?))
        }
    }
}

fn password_form(user: &str, password: &str) -> Vec<(String, String)> {
    vec![
        ("grant_type".to_string(), GRANT_PASSWORD.to_string()),
        ("username".to_string(), user.to_string()),
        ("password".to_string(), password.to_string()),
    ]
}

fn assertion_form(token: &str) -> Vec<(String, String)> {
    vec![
        ("grant_type".to_string(), GRANT_SAML2_BEARER.to_string()),
        ("assertion".to_string(), token.to_string()),
    ]
}

// Log in to the schema cell targeting `cell` and return the client_id/client_secret pair.
async fn schema_client(
    dao: &Dao,
    cell: &str,
    schema: &SchemaAuth,
) -> Result<Vec<(String, String)>, DaoError> {
    let schema_cell = dao.cell_url(&schema.schema_url)?;
    let mut form = password_form(&schema.schema_user_id, &schema.schema_password);
    form.push(("p_target".to_string(), cell.to_string()));
    let schema_token = request_token(dao, &schema_cell, form).await?;
    Ok(vec![
        ("client_id".to_string(), schema_cell),
        ("client_secret".to_string(), schema_token.access_token),
    ])
}

async fn request_token(
    dao: &Dao,
    cell: &str,
    form: Vec<(String, String)>,
) -> Result<TokenInfo, DaoError> {
    let url = format!("{}__token", cell);
    let resp = dao
        .send(DaoRequest::new(Method::POST, &url).form(form))
        .await?;
    let mut token: TokenInfo = resp.json()?;
    token.issued_at = Utc::now();
    token.cell_url = Some(cell.to_string());
    debug!("Received token from {}: {:?}", url, token);
    Ok(token)
}
