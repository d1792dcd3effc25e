//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::acl::AclManager;
use crate::dav::{DavCollection, Location};
use crate::error::DaoError;
use crate::odata_collection::ODataCollection;
use crate::resource::Context;

use bytes::Bytes;
use std::result::Result;

/// A box: the root collection of an application's data inside a cell.
///
/// Every collection operation is relative to the box root.
#[derive(Debug, Clone)]
pub struct BoxResource {
    name: String,
    root: DavCollection,
}

impl BoxResource {
    pub(crate) fn new(ctx: Context, cell_url: &str, name: &str) -> BoxResource {
        let loc = Location {
            url: format!("{}{}", cell_url, name),
            cell_url: cell_url.to_string(),
            box_name: name.to_string(),
        };
        BoxResource {
            name: name.to_string(),
            root: DavCollection::new(ctx, loc),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        self.root.url()
    }

    /// The box itself as a WebDAV collection.
    pub fn root(&self) -> &DavCollection {
        &self.root
    }

    pub fn col(&self, name: &str) -> DavCollection {
        self.root.col(name)
    }

    pub fn odata(&self, name: &str) -> ODataCollection {
        self.root.odata(name)
    }

    pub async fn mkcol(&self, name: &str) -> Result<DavCollection, DaoError> {
        self.root.mkcol(name).await
    }

    pub async fn mkodata(&self, name: &str) -> Result<ODataCollection, DaoError> {
        self.root.mkodata(name).await
    }

    pub async fn mkservice(&self, name: &str) -> Result<DavCollection, DaoError> {
        self.root.mkservice(name).await
    }

    pub async fn put(
        &self,
        name: &str,
        content_type: &str,
        body: impl Into<Bytes>,
        etag: Option<&str>,
    ) -> Result<Option<String>, DaoError> {
        self.root.put(name, content_type, body, etag).await
    }

    pub async fn get_string(&self, name: &str) -> Result<String, DaoError> {
        self.root.get_string(name).await
    }

    pub async fn del(&self, name: &str, etag: Option<&str>) -> Result<(), DaoError> {
        self.root.del(name, etag).await
    }

    pub fn acl(&self) -> AclManager {
        self.root.acl()
    }
}
