//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::acl::{AclManager, DEFAULT_BOX};
use crate::box_resource::BoxResource;
use crate::crud::{
    AccountManager, BoxManager, ExtCellManager, ExtRoleManager, RelationManager, ResourceManager,
    RoleManager,
};
use crate::dao::HEADER_CREDENTIAL;
use crate::error::{ia_err, DaoError};
use crate::event::EventManager;
use crate::resource::Context;

use reqwest::Method;
use std::result::Result;

/// A cell and the managers for everything it contains.
#[derive(Debug, Clone)]
pub struct Cell {
    ctx: Context,
    url: String,
}

impl Cell {
    pub(crate) fn new(ctx: Context, url: &str) -> Cell {
        Cell {
            ctx,
            url: url.to_string(),
        }
    }

    /// Url of the cell, ending with `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Name of the cell: the last segment of its url.
    pub fn name(&self) -> &str {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    fn ctl(&self) -> String {
        format!("{}__ctl", self.url)
    }

    /// A box of this cell; `None` is the default box `__`.
    pub fn box_(&self, name: Option<&str>) -> Result<BoxResource, DaoError> {
        let name = name.unwrap_or(DEFAULT_BOX);
        if name.is_empty() || name.contains('/') {
            return ia_err!("invalid box name '{}'", name);
        }
        Ok(BoxResource::new(self.ctx.clone(), &self.url, name))
    }

    pub fn boxes(&self) -> BoxManager {
        ResourceManager::under(self.ctx.clone(), &self.ctl())
    }

    pub fn accounts(&self) -> AccountManager {
        ResourceManager::under(self.ctx.clone(), &self.ctl())
    }

    pub fn roles(&self) -> RoleManager {
        ResourceManager::under(self.ctx.clone(), &self.ctl())
    }

    pub fn relations(&self) -> RelationManager {
        ResourceManager::under(self.ctx.clone(), &self.ctl())
    }

    pub fn ext_cells(&self) -> ExtCellManager {
        ResourceManager::under(self.ctx.clone(), &self.ctl())
    }

    pub fn ext_roles(&self) -> ExtRoleManager {
        ResourceManager::under(self.ctx.clone(), &self.ctl())
    }

    pub fn event(&self) -> EventManager {
        EventManager::new(self.ctx.clone(), &self.url)
    }

    /// ACL of the cell itself. Role hrefs are relative to the default box.
    pub fn acl(&self) -> AclManager {
        AclManager::new(self.ctx.clone(), &self.url, &self.url, DEFAULT_BOX)
    }

    /// Change the password of the account the current token was issued to.
    pub async fn change_my_password(&self, new_password: &str) -> Result<(), DaoError> {
        let url = format!("{}__mypassword", self.url);
        let req = self
            .ctx
            .request(Method::PUT, &url)
            .header(HEADER_CREDENTIAL, new_password);
        self.ctx.send(req).await?;
        Ok(())
    }
}
