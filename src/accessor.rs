//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::auth::credential::Credential;
use crate::auth::token::TokenInfo;
use crate::cell::Cell;
use crate::crud::{CellManager, ResourceManager};
use crate::dao::Dao;
use crate::error::{ia_err, DaoError};
use crate::resource::Context;

use std::result::Result;

/// An authenticated session: the starting point of every navigation chain.
///
/// Created by [`Dao::authenticate()`]. Objects derived from an accessor
/// (cells, boxes, collections...) share its token; deriving a child never
/// changes the parent.
#[derive(Debug, Clone)]
pub struct Accessor {
    ctx: Context,
    credential: Credential,
}

impl Accessor {
    pub(crate) fn new(dao: Dao, credential: Credential, token: TokenInfo) -> Accessor {
        Accessor {
            ctx: Context::new(dao, token),
            credential,
        }
    }

    /// A cell by name or url. `None` is the cell that issued the token.
    pub fn cell(&self, name: Option<&str>) -> Result<Cell, DaoError> {
        let url = match name {
            Some(n) => self.ctx.dao.cell_url(n)?,
            None => match &self.ctx.token.cell_url {
                Some(u) => u.clone(),
                None => {
                    return ia_err!(
                        "no cell given and the {} token does not name one: set DaoBuilder::default_cell()",
                        self.credential.flow_name()
                    );
                }
            },
        };
        Ok(Cell::new(self.ctx.clone(), &url))
    }

    /// Cells of the unit. Requires a unit-level token.
    pub fn unit(&self) -> CellManager {
        let url = format!("{}/__ctl", self.ctx.dao.base_url());
        ResourceManager::under(self.ctx.clone(), &url)
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn token(&self) -> &TokenInfo {
        &self.ctx.token
    }

    pub fn access_token(&self) -> &str {
        &self.ctx.token.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.ctx.token.refresh_token.as_deref()
    }

    /// Exchange the refresh token for a new accessor.
    pub async fn refresh(&self) -> Result<Accessor, DaoError> {
        let rt = match self.refresh_token() {
            Some(rt) => rt,
            None => return ia_err!("the current token has no refresh token"),
        };
        let cell = match &self.ctx.token.cell_url {
            Some(c) => c.clone(),
            None => return ia_err!("the current token does not name its cell"),
        };
        self.ctx
            .dao
            .authenticate_with(Credential::refresh(&cell, rt))
            .await
    }
}
