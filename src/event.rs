//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::error::{ia_err, DaoError};
use crate::resource::Context;

use reqwest::Method;
use serde_derive::{Deserialize, Serialize};
use std::result::Result;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    #[default]
    Info,
    Warn,
    Error,
}

/// An entry for a cell's event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub level: EventLevel,
    pub action: String,
    pub object: String,
    pub result: String,
}

impl Event {
    pub fn new(level: EventLevel, action: &str, object: &str, result: &str) -> Event {
        Event {
            level,
            action: action.to_string(),
            object: object.to_string(),
            result: result.to_string(),
        }
    }
}

/// Posts events to a cell and reads its event log.
#[derive(Debug, Clone)]
pub struct EventManager {
    ctx: Context,
    cell_url: String,
}

impl EventManager {
    pub(crate) fn new(ctx: Context, cell_url: &str) -> EventManager {
        EventManager {
            ctx,
            cell_url: cell_url.to_string(),
        }
    }

    /// Post an event.
    ///
    /// When the [`Dao`](crate::Dao) was built with `async_event_log(true)` the
    /// request runs in the background and this returns at once; a failure is
    /// only logged.
    pub async fn post(&self, event: &Event) -> Result<(), DaoError> {
        let url = format!("{}__event", self.cell_url);
        let req = self.ctx.request(Method::POST, &url).json(event)?;
        if self.ctx.dao.async_event_log() {
            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                if let Err(e) = ctx.send(req).await {
                    warn!("Background event post to {} failed: {}", url, e);
                }
            });
            return Ok(());
        }
        debug!("Posting event {:?} to {}", event.action, url);
        self.ctx.send(req).await?;
        Ok(())
    }

    /// Contents of the current event log file.
    pub async fn current_log(&self) -> Result<String, DaoError> {
        self.log_file("current/default.log").await
    }

    /// Contents of a rotated log file, e.g. `default.log.1`.
    pub async fn archived_log(&self, name: &str) -> Result<String, DaoError> {
        if name.is_empty() || name.contains('/') {
            return ia_err!("invalid log file name '{}'", name);
        }
        self.log_file(&format!("archive/{}", name)).await
    }

    async fn log_file(&self, path: &str) -> Result<String, DaoError> {
        let url = format!("{}__log/{}", self.cell_url, path);
        let req = self
            .ctx
            .request(Method::GET, &url)
            .header("accept", "text/plain");
        Ok(self.ctx.send(req).await?.text())
    }
}
