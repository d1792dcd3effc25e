//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Builder for creating a [`Dao`](crate::Dao)
//!
use std::env;
use std::result::Result;
use std::time::Duration;

use crate::auth::config_file::{ConfigProfile, DEFAULT_CONFIG_FILE_PATH};
use crate::dao::Dao;
use crate::error::{ia_err, DaoError};
use reqwest::Client;

/// Builder used to set all the parameters to create a [`Dao`](crate::Dao).
///
/// The only required parameter is the base URL of the unit. Everything else
/// has a usable default.
#[derive(Default, Debug, Clone)]
pub struct DaoBuilder {
    pub(crate) base_url: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) protocol_version: Option<String>,
    pub(crate) async_event_log: bool,
    pub(crate) default_cell: Option<String>,
    pub(crate) service_subject: Option<ServiceSubject>,
    pub(crate) client_token: Option<String>,
    pub(crate) client: Option<Client>,
    pub(crate) accept_invalid_certs: bool,
    // For error messaging
    pub(crate) from_environment: bool,
}

/// Account used by [`Credential::ServiceSubject`](crate::Credential::ServiceSubject).
#[derive(Clone, PartialEq)]
pub(crate) struct ServiceSubject {
    pub(crate) cell: String,
    pub(crate) username: String,
    pub(crate) password: String,
}

impl std::fmt::Debug for ServiceSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ServiceSubject({}, {})", self.cell, self.username)
    }
}

impl DaoBuilder {
    /// Create a new DaoBuilder struct.
    ///
    /// Consider calling [`from_environment()`](DaoBuilder::from_environment()) to
    /// collect all parameters from the local environment.
    pub fn new() -> Self {
        DaoBuilder {
            ..Default::default()
        }
    }
    /// Build a new [`Dao`].
    ///
    /// If the builder holds an existing [`reqwest::Client`] it is cloned and
    /// used; otherwise a new client is created. See
    /// [`reqwest_client()`](DaoBuilder::reqwest_client()).
    pub async fn build(self) -> Result<Dao, DaoError> {
        Dao::new(&self).await
    }
    /// Gather configuration settings from the current environment.
    ///
    /// Values can be overridden in code by calling other methods afterwards:
    ///```no_run
    /// # use personium_dao::Dao;
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    ///   let dao = Dao::builder()
    ///       .from_environment()?
    ///       .protocol_version("1.7")?
    ///       .build()
    ///       .await?;
    /// # Ok(())
    /// # }
    ///```
    /// The following environment variables are used:
    ///
    /// | variable | description |
    /// | -------- | ----------- |
    /// | `PERSONIUM_CONFIG_FILE` | Path of an INI config file, read first (see [`DaoBuilder::from_config_file()`]). |
    /// | `PERSONIUM_PROFILE` | Profile to read from the config file. Defaults to `DEFAULT`. |
    /// | `PERSONIUM_BASE_URL` | The unit URL. See [`DaoBuilder::base_url()`]. |
    /// | `PERSONIUM_CELL` | The default cell. See [`DaoBuilder::default_cell()`]. |
    /// | `PERSONIUM_VERSION` | Value of the `X-Personium-Version` header. |
    /// | `PERSONIUM_ASYNC_EVENT` | If `1` or `true`, event log posts do not wait for the server. |
    ///
    pub fn from_environment(mut self) -> Result<Self, DaoError> {
        self.from_environment = true;
        if let Ok(path) = env::var("PERSONIUM_CONFIG_FILE") {
            let profile = env::var("PERSONIUM_PROFILE").unwrap_or_else(|_| "DEFAULT".to_string());
            self = self.from_config_file(&path, &profile)?;
        }
        if let Ok(val) = env::var("PERSONIUM_BASE_URL") {
            self = self.base_url(&val)?;
        }
        if let Ok(val) = env::var("PERSONIUM_CELL") {
            self = self.default_cell(&val)?;
        }
        if let Ok(val) = env::var("PERSONIUM_VERSION") {
            self = self.protocol_version(&val)?;
        }
        if let Ok(val) = env::var("PERSONIUM_ASYNC_EVENT") {
            let lv = val.to_lowercase();
            self = self.async_event_log(lv == "true" || lv == "1")?;
        }
        Ok(self)
    }
    /// Read settings from a profile of an INI config file.
    ///
    /// Pass an empty `path` to use `~/.personium/config`. The file format:
    /// ```ini
    /// [DEFAULT]
    /// base_url=https://personium.example.com
    /// cell=app-cell
    /// username=service-user
    /// password=secret
    /// version=1.7
    /// ```
    /// `username` and `password` configure the service subject of `cell`.
    pub fn from_config_file(mut self, path: &str, profile: &str) -> Result<Self, DaoError> {
        let path = if path.is_empty() {
            DEFAULT_CONFIG_FILE_PATH
        } else {
            path
        };
        let p = ConfigProfile::load(path, profile)?;
        self = self.base_url(&p.base_url)?;
        if let Some(cell) = &p.cell {
            self = self.default_cell(cell)?;
        }
        if let Some(v) = &p.version {
            self = self.protocol_version(v)?;
        }
        if let (Some(user), Some(pass)) = (&p.username, &p.password) {
            let cell = match &p.cell {
                Some(c) => c.clone(),
                None => {
                    return ia_err!(
                        "config profile '{}' sets a service subject but no cell",
                        profile
                    );
                }
            };
            self = self.service_subject(&cell, user, pass)?;
        }
        Ok(self)
    }
    /// Set the URL of the unit, e.g. `https://personium.example.com`.
    ///
    /// Cell names given elsewhere are resolved against this URL.
    pub fn base_url(mut self, base_url: &str) -> Result<Self, DaoError> {
        let u = match url::Url::parse(base_url) {
            Ok(u) => u,
            Err(e) => {
                return ia_err!("invalid base url '{}': {}", base_url, e);
            }
        };
        if u.scheme() != "http" && u.scheme() != "https" {
            return ia_err!("invalid base url '{}': scheme must be http or https", base_url);
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }
    /// Set the request timeout. The default is 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Result<Self, DaoError> {
        self.timeout = Some(timeout);
        Ok(self)
    }
    /// Send `X-Personium-Version: {version}` with every request.
    pub fn protocol_version(mut self, version: &str) -> Result<Self, DaoError> {
        if version.is_empty() {
            self.protocol_version = None;
        } else {
            self.protocol_version = Some(version.to_string());
        }
        Ok(self)
    }
    /// Post event log entries in the background instead of waiting for the response.
    pub fn async_event_log(mut self, async_event_log: bool) -> Result<Self, DaoError> {
        self.async_event_log = async_event_log;
        Ok(self)
    }
    /// The cell used by `cell(None)` when the token does not say which cell issued it.
    pub fn default_cell(mut self, cell: &str) -> Result<Self, DaoError> {
        if cell.is_empty() {
            return ia_err!("default cell must not be empty");
        }
        self.default_cell = Some(cell.to_string());
        Ok(self)
    }
    /// Configure the account used by the `"serviceSubject"` credential.
    pub fn service_subject(
        mut self,
        cell: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, DaoError> {
        if cell.is_empty() || username.is_empty() {
            return ia_err!("service subject requires a cell and a username");
        }
        self.service_subject = Some(ServiceSubject {
            cell: cell.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        });
        Ok(self)
    }
    /// Set the bearer token used by the `"client"` credential.
    ///
    /// Scripts usually take this from the incoming request, see
    /// [`ScriptRequest::client_token()`](crate::script::ScriptRequest::client_token()).
    pub fn client_token(mut self, token: &str) -> Result<Self, DaoError> {
        self.client_token = Some(token.to_string());
        Ok(self)
    }
    /// Use an existing [`reqwest::Client`] for all requests.
    ///
    /// The timeout and certificate settings of this builder are ignored in that case.
    pub fn reqwest_client(mut self, client: &Client) -> Result<Self, DaoError> {
        self.client = Some(client.clone());
        Ok(self)
    }
    /// Do not validate server certificates. Only use this against test units.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Result<Self, DaoError> {
        self.accept_invalid_certs = accept;
        Ok(self)
    }
}
