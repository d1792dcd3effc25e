//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::crud::{ResourceManager, UserData};
use crate::error::DaoError;
use crate::query::Query;
use crate::resource::{nav_segment, Context, ODataKey};
use crate::types::ODataEntity;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::result::Result;

/// Entities of one user-defined entity type.
pub type EntitySet = ResourceManager<UserData>;

impl ResourceManager<UserData> {
    /// Address one entity by key.
    pub fn key(&self, key: impl Into<ODataKey>) -> EntityRef {
        EntityRef {
            ctx: self.ctx.clone(),
            set: self.clone(),
            key: key.into(),
        }
    }
}

/// One entity of an [`EntitySet`], with operations bound to its key.
#[derive(Debug, Clone)]
pub struct EntityRef {
    ctx: Context,
    set: EntitySet,
    key: ODataKey,
}

impl EntityRef {
    pub fn url(&self) -> String {
        self.set.entity_url(&self.key)
    }

    pub async fn retrieve(&self) -> Result<ODataEntity<Value>, DaoError> {
        self.set.retrieve(self.key.clone()).await
    }

    pub async fn update(
        &self,
        payload: &Value,
        etag: Option<&str>,
    ) -> Result<Option<String>, DaoError> {
        self.set.update(self.key.clone(), payload, etag).await
    }

    pub async fn merge<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        etag: Option<&str>,
    ) -> Result<Option<String>, DaoError> {
        self.set.merge(self.key.clone(), payload, etag).await
    }

    pub async fn del(&self, etag: Option<&str>) -> Result<(), DaoError> {
        self.set.del(self.key.clone(), etag).await
    }

    /// Navigate to the entities related through navigation property `prop`.
    pub fn nav(&self, prop: &str) -> NavProperty {
        NavProperty {
            ctx: self.ctx.clone(),
            url: format!("{}/{}", self.url(), nav_segment(prop)),
        }
    }

    pub async fn link(&self, nav: &str, target_uri: &str) -> Result<(), DaoError> {
        self.set.link(self.key.clone(), nav, target_uri).await
    }

    pub async fn unlink(&self, nav: &str, target: impl Into<ODataKey>) -> Result<(), DaoError> {
        self.set.unlink(self.key.clone(), nav, target).await
    }

    pub async fn links(&self, nav: &str) -> Result<Vec<String>, DaoError> {
        self.set.links(self.key.clone(), nav).await
    }
}

/// Entities reached through a navigation property.
#[derive(Debug, Clone)]
pub struct NavProperty {
    ctx: Context,
    url: String,
}

impl NavProperty {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create an entity already linked to the source entity.
    pub async fn create(&self, payload: &Value) -> Result<ODataEntity<Value>, DaoError> {
        let req = self.ctx.request(Method::POST, &self.url).json(payload)?;
        let resp = self.ctx.send(req).await?;
        let mut entity = ODataEntity::from_value(resp.value()?)?;
        if entity.metadata.etag.is_none() {
            entity.metadata.etag = resp.etag();
        }
        Ok(entity)
    }

    pub fn query(&self) -> Query {
        Query::new(self.ctx.clone(), &self.url)
    }
}
