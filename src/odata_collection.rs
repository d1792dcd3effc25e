//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::acl::AclManager;
use crate::batch::Batch;
use crate::crud::{
    AssociationEndManager, ComplexTypeManager, ComplexTypePropertyManager, EntityTypeManager,
    PropertyManager, ResourceManager,
};
use crate::dao::CONTENT_XML;
use crate::dav::Location;
use crate::entity_set::EntitySet;
use crate::error::DaoError;
use crate::resource::{join, Context};

use reqwest::Method;
use std::result::Result;

/// An OData collection: user data entity sets and the schema describing them.
#[derive(Debug, Clone)]
pub struct ODataCollection {
    ctx: Context,
    loc: Location,
}

impl ODataCollection {
    pub(crate) fn new(ctx: Context, loc: Location) -> ODataCollection {
        ODataCollection { ctx, loc }
    }

    pub fn url(&self) -> &str {
        &self.loc.url
    }

    /// Entities of the entity type `name`.
    pub fn entity_set(&self, name: &str) -> EntitySet {
        ResourceManager::at(self.ctx.clone(), &join(&self.loc.url, name))
    }

    /// The schema of this collection.
    pub fn schema(&self) -> SchemaManager {
        SchemaManager {
            ctx: self.ctx.clone(),
            url: join(&self.loc.url, "$metadata"),
        }
    }

    /// Start an empty `$batch` request.
    pub fn batch(&self) -> Batch {
        Batch::new(self.ctx.clone(), &join(&self.loc.url, "$batch"))
    }

    pub fn acl(&self) -> AclManager {
        AclManager::new(
            self.ctx.clone(),
            &self.loc.url,
            &self.loc.cell_url,
            &self.loc.box_name,
        )
    }
}

/// Manages the schema (`$metadata`) of an OData collection.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    ctx: Context,
    url: String,
}

impl SchemaManager {
    pub fn entity_types(&self) -> EntityTypeManager {
        ResourceManager::under(self.ctx.clone(), &self.url)
    }

    pub fn properties(&self) -> PropertyManager {
        ResourceManager::under(self.ctx.clone(), &self.url)
    }

    pub fn complex_types(&self) -> ComplexTypeManager {
        ResourceManager::under(self.ctx.clone(), &self.url)
    }

    pub fn complex_type_properties(&self) -> ComplexTypePropertyManager {
        ResourceManager::under(self.ctx.clone(), &self.url)
    }

    pub fn association_ends(&self) -> AssociationEndManager {
        ResourceManager::under(self.ctx.clone(), &self.url)
    }

    /// The CSDL document describing user data, as XML.
    pub async fn document(&self) -> Result<String, DaoError> {
        let url = self.url.trim_end_matches('/').to_string();
        let req = self
            .ctx
            .request(Method::GET, &url)
            .header("accept", CONTENT_XML);
        Ok(self.ctx.send(req).await?.text())
    }
}
