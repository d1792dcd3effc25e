//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The create/retrieve/update/merge/delete operations shared by every entity set.
use crate::dao::HEADER_CREDENTIAL;
use crate::error::{ia_err, DaoError};
use crate::query::Query;
use crate::resource::{join, nav_segment, Context, ODataKey};
use crate::types::{self, HasKey, ODataEntity};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::marker::PhantomData;
use std::result::Result;
use tracing::debug;

/// An entity set kind: its url segment and payload model.
pub trait ResourceKind {
    const ENTITY_SET: &'static str;
    type Model: Serialize + DeserializeOwned + HasKey;
}

macro_rules! resource_kind {
    ($(#[$doc:meta])* $kind:ident, $set:expr, $model:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $kind;

        impl ResourceKind for $kind {
            const ENTITY_SET: &'static str = $set;
            type Model = $model;
        }
    };
}

resource_kind!(
    /// Cells of a unit.
    Cells, "Cell", types::CellInfo);
resource_kind!(Boxes, "Box", types::BoxInfo);
resource_kind!(Accounts, "Account", types::Account);
resource_kind!(Roles, "Role", types::Role);
resource_kind!(Relations, "Relation", types::Relation);
resource_kind!(ExtCells, "ExtCell", types::ExtCell);
resource_kind!(ExtRoles, "ExtRole", types::ExtRole);
resource_kind!(EntityTypes, "EntityType", types::EntityType);
resource_kind!(Properties, "Property", types::Property);
resource_kind!(ComplexTypes, "ComplexType", types::ComplexType);
resource_kind!(
    ComplexTypeProperties,
    "ComplexTypeProperty",
    types::ComplexTypeProperty
);
resource_kind!(AssociationEnds, "AssociationEnd", types::AssociationEnd);
resource_kind!(
    /// Entities of a user-defined entity type. The set name is given at runtime.
    UserData, "", Value);

/// CRUD operations over one entity set.
///
/// Every write takes an optional etag; `None` sends `If-Match: *`, an
/// unconditional write. Remote failures are returned as [`DaoError`]s and
/// nothing is retried.
pub struct ResourceManager<K: ResourceKind> {
    pub(crate) ctx: Context,
    url: String,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> Clone for ResourceManager<K> {
    fn clone(&self) -> Self {
        ResourceManager {
            ctx: self.ctx.clone(),
            url: self.url.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> fmt::Debug for ResourceManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl<K: ResourceKind> ResourceManager<K> {
    /// Manager for the entity set at `url`.
    pub(crate) fn at(ctx: Context, url: &str) -> Self {
        ResourceManager {
            ctx,
            url: url.trim_end_matches('/').to_string(),
            _kind: PhantomData,
        }
    }

    /// Manager for `K::ENTITY_SET` below `parent`.
    pub(crate) fn under(ctx: Context, parent: &str) -> Self {
        let url = join(parent, K::ENTITY_SET);
        Self::at(ctx, &url)
    }

    /// Url of the entity set.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn entity_url(&self, key: &ODataKey) -> String {
        format!("{}{}", self.url, key)
    }

    /// Create an entity. Fails with a 409 error when the key already exists.
    pub async fn create(&self, model: &K::Model) -> Result<ODataEntity<K::Model>, DaoError> {
        debug!("Creating entity in {}", self.url);
        let req = self.ctx.request(Method::POST, &self.url).json(model)?;
        let resp = self.ctx.send(req).await?;
        let mut v = resp.value()?;
        if v.is_null() {
            v = serde_json::to_value(model)?;
        }
        let mut entity = ODataEntity::from_value(v)?;
        if entity.metadata.etag.is_none() {
            entity.metadata.etag = resp.etag();
        }
        Ok(entity)
    }

    /// Fetch one entity. Fails with a 404 error when it does not exist.
    pub async fn retrieve(
        &self,
        key: impl Into<ODataKey>,
    ) -> Result<ODataEntity<K::Model>, DaoError> {
        let url = self.entity_url(&key.into());
        let resp = self.ctx.send(self.ctx.request(Method::GET, &url)).await?;
        let mut entity = ODataEntity::from_value(resp.value()?)?;
        if entity.metadata.etag.is_none() {
            entity.metadata.etag = resp.etag();
        }
        Ok(entity)
    }

    /// Replace an entity. Returns the new etag if the server sent one.
    pub async fn update(
        &self,
        key: impl Into<ODataKey>,
        model: &K::Model,
        etag: Option<&str>,
    ) -> Result<Option<String>, DaoError> {
        let url = self.entity_url(&key.into());
        let req = self
            .ctx
            .request(Method::PUT, &url)
            .if_match(etag)
            .json(model)?;
        Ok(self.ctx.send(req).await?.etag())
    }

    /// Partially update an entity with the fields in `payload`.
    pub async fn merge<P: Serialize + ?Sized>(
        &self,
        key: impl Into<ODataKey>,
        payload: &P,
        etag: Option<&str>,
    ) -> Result<Option<String>, DaoError> {
        let url = self.entity_url(&key.into());
        let req = self
            .ctx
            .extension("MERGE", &url)?
            .if_match(etag)
            .json(payload)?;
        Ok(self.ctx.send(req).await?.etag())
    }

    /// Replace an entity, addressed by the key of `model`.
    pub async fn save(
        &self,
        model: &K::Model,
        etag: Option<&str>,
    ) -> Result<Option<String>, DaoError> {
        let key = model.key();
        if key.is_empty() {
            return ia_err!("can't save to {}: the entity has no key", self.url);
        }
        self.update(key, model, etag).await
    }

    pub async fn del(&self, key: impl Into<ODataKey>, etag: Option<&str>) -> Result<(), DaoError> {
        let url = self.entity_url(&key.into());
        let req = self.ctx.request(Method::DELETE, &url).if_match(etag);
        self.ctx.send(req).await?;
        Ok(())
    }

    /// Start a query over this entity set.
    pub fn query(&self) -> Query {
        Query::new(self.ctx.clone(), &self.url)
    }

    /// Every entity of the set (as far as the server's default page size allows).
    pub async fn list(&self) -> Result<Vec<ODataEntity<K::Model>>, DaoError> {
        Ok(self.query().run_entities().await?.results)
    }

    fn links_url(&self, key: &ODataKey, nav: &str) -> String {
        format!("{}/$links/{}", self.entity_url(key), nav_segment(nav))
    }

    /// Link an entity to the resource at `target_uri` through navigation property `nav`.
    ///
    /// A link that already exists is reported as a 409 error.
    pub async fn link(
        &self,
        key: impl Into<ODataKey>,
        nav: &str,
        target_uri: &str,
    ) -> Result<(), DaoError> {
        let url = self.links_url(&key.into(), nav);
        let req = self
            .ctx
            .request(Method::POST, &url)
            .json(&json!({ "uri": target_uri }))?;
        self.ctx.send(req).await?;
        Ok(())
    }

    pub async fn unlink(
        &self,
        key: impl Into<ODataKey>,
        nav: &str,
        target: impl Into<ODataKey>,
    ) -> Result<(), DaoError> {
        let url = format!("{}{}", self.links_url(&key.into(), nav), target.into());
        self.ctx.send(self.ctx.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    /// Uris of the resources linked through `nav`.
    pub async fn links(
        &self,
        key: impl Into<ODataKey>,
        nav: &str,
    ) -> Result<Vec<String>, DaoError> {
        let url = self.links_url(&key.into(), nav);
        let resp = self.ctx.send(self.ctx.request(Method::GET, &url)).await?;
        let results = match types::unwrap_results(resp.value()?) {
            Value::Array(a) => a,
            other => {
                return ia_err!("expected an array of links, got {}", other);
            }
        };
        Ok(results
            .iter()
            .filter_map(|l| l.get("uri").and_then(|u| u.as_str()))
            .map(|s| s.to_string())
            .collect())
    }
}

pub type CellManager = ResourceManager<Cells>;
pub type BoxManager = ResourceManager<Boxes>;
pub type AccountManager = ResourceManager<Accounts>;
pub type RoleManager = ResourceManager<Roles>;
pub type RelationManager = ResourceManager<Relations>;
pub type ExtCellManager = ResourceManager<ExtCells>;
pub type ExtRoleManager = ResourceManager<ExtRoles>;
pub type EntityTypeManager = ResourceManager<EntityTypes>;
pub type PropertyManager = ResourceManager<Properties>;
pub type ComplexTypeManager = ResourceManager<ComplexTypes>;
pub type ComplexTypePropertyManager = ResourceManager<ComplexTypeProperties>;
pub type AssociationEndManager = ResourceManager<AssociationEnds>;

impl ResourceManager<Accounts> {
    /// Create an account with a login password.
    pub async fn create_with_password(
        &self,
        account: &types::Account,
        password: &str,
    ) -> Result<ODataEntity<types::Account>, DaoError> {
        debug!("Creating account {} in {}", account.name, self.url);
        let req = self
            .ctx
            .request(Method::POST, &self.url)
            .header(HEADER_CREDENTIAL, password)
            .json(account)?;
        let resp = self.ctx.send(req).await?;
        let mut v = resp.value()?;
        if v.is_null() {
            v = serde_json::to_value(account)?;
        }
        ODataEntity::from_value(v)
    }

    /// Set a new password on an account.
    pub async fn change_password(&self, name: &str, new_password: &str) -> Result<(), DaoError> {
        let url = self.entity_url(&ODataKey::from(name));
        let req = self
            .ctx
            .request(Method::PUT, &url)
            .if_match(None)
            .header(HEADER_CREDENTIAL, new_password)
            .json(&json!({ "Name": name }))?;
        self.ctx.send(req).await?;
        Ok(())
    }
}
