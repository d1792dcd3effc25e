//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! WebDAV collections and files inside a box.
use crate::acl::AclManager;
use crate::dao::CONTENT_XML;
use crate::error::{ia_err, DaoError};
use crate::odata_collection::ODataCollection;
use crate::resource::{join, Context};

use bytes::Bytes;
use reqwest::Method;
use std::result::Result;
use tracing::debug;

/// Kind of collection created by `MKCOL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectionKind {
    Dav,
    OData,
    Service,
}

impl CollectionKind {
    fn mkcol_body(self) -> String {
        let extra = match self {
            CollectionKind::Dav => "",
            CollectionKind::OData => "<p:odata/>",
            CollectionKind::Service => "<p:service/>",
        };
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <D:mkcol xmlns:D=\"DAV:\" xmlns:p=\"urn:x-personium:xmlns\">\
             <D:set><D:prop><D:resourcetype><D:collection/>{}</D:resourcetype></D:prop></D:set>\
             </D:mkcol>",
            extra
        )
    }
}

/// Where a collection lives: its url, the owning cell and box.
#[derive(Debug, Clone)]
pub(crate) struct Location {
    pub(crate) url: String,
    pub(crate) cell_url: String,
    pub(crate) box_name: String,
}

impl Location {
    pub(crate) fn child(&self, name: &str) -> Location {
        Location {
            url: join(&self.url, name),
            cell_url: self.cell_url.clone(),
            box_name: self.box_name.clone(),
        }
    }
}

fn check_name(name: &str) -> Result<(), DaoError> {
    if name.is_empty() || name.contains('/') {
        return ia_err!("invalid resource name '{}'", name);
    }
    Ok(())
}

/// A WebDAV collection.
#[derive(Debug, Clone)]
pub struct DavCollection {
    pub(crate) ctx: Context,
    pub(crate) loc: Location,
}

impl DavCollection {
    pub(crate) fn new(ctx: Context, loc: Location) -> DavCollection {
        DavCollection { ctx, loc }
    }

    pub fn url(&self) -> &str {
        &self.loc.url
    }

    /// A child WebDAV collection. Nothing is sent to the server.
    pub fn col(&self, name: &str) -> DavCollection {
        DavCollection::new(self.ctx.clone(), self.loc.child(name))
    }

    /// A child OData collection. Nothing is sent to the server.
    pub fn odata(&self, name: &str) -> ODataCollection {
        ODataCollection::new(self.ctx.clone(), self.loc.child(name))
    }

    async fn make(&self, name: &str, kind: CollectionKind) -> Result<Location, DaoError> {
        check_name(name)?;
        let loc = self.loc.child(name);
        debug!("Creating {:?} collection {}", kind, loc.url);
        let req = self
            .ctx
            .extension("MKCOL", &loc.url)?
            .body(CONTENT_XML, kind.mkcol_body());
        self.ctx.send(req).await?;
        Ok(loc)
    }

    /// Create a child WebDAV collection. Fails with a 405 error when it exists.
    pub async fn mkcol(&self, name: &str) -> Result<DavCollection, DaoError> {
        let loc = self.make(name, CollectionKind::Dav).await?;
        Ok(DavCollection::new(self.ctx.clone(), loc))
    }

    /// Create a child OData collection. Fails with a 405 error when it exists.
    pub async fn mkodata(&self, name: &str) -> Result<ODataCollection, DaoError> {
        let loc = self.make(name, CollectionKind::OData).await?;
        Ok(ODataCollection::new(self.ctx.clone(), loc))
    }

    /// Create a child service (script) collection.
    pub async fn mkservice(&self, name: &str) -> Result<DavCollection, DaoError> {
        let loc = self.make(name, CollectionKind::Service).await?;
        Ok(DavCollection::new(self.ctx.clone(), loc))
    }

    /// Store a file. Returns the new etag if the server sent one.
    pub async fn put(
        &self,
        name: &str,
        content_type: &str,
        body: impl Into<Bytes>,
        etag: Option<&str>,
    ) -> Result<Option<String>, DaoError> {
        check_name(name)?;
        let url = join(&self.loc.url, name);
        let req = self
            .ctx
            .request(Method::PUT, &url)
            .if_match(etag)
            .body(content_type, body);
        Ok(self.ctx.send(req).await?.etag())
    }

    pub async fn get_bytes(&self, name: &str) -> Result<Bytes, DaoError> {
        check_name(name)?;
        let url = join(&self.loc.url, name);
        let req = self.ctx.request(Method::GET, &url).header("accept", "*/*");
        Ok(self.ctx.send(req).await?.body)
    }

    pub async fn get_string(&self, name: &str) -> Result<String, DaoError> {
        let b = self.get_bytes(name).await?;
        Ok(String::from_utf8_lossy(&b).to_string())
    }

    /// Delete a file or an empty child collection.
    pub async fn del(&self, name: &str, etag: Option<&str>) -> Result<(), DaoError> {
        check_name(name)?;
        let url = join(&self.loc.url, name);
        let req = self.ctx.request(Method::DELETE, &url).if_match(etag);
        self.ctx.send(req).await?;
        Ok(())
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

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mkcol_bodies() {
        let b = CollectionKind::OData.mkcol_body();
        assert!(b.contains("<D:collection/><p:odata/></D:resourcetype>"));
        let b = CollectionKind::Service.mkcol_body();
        assert!(b.contains("<p:service/>"));
        let b = CollectionKind::Dav.mkcol_body();
        assert!(b.contains("<D:resourcetype><D:collection/></D:resourcetype>"));
    }

    #[test]
    fn names() {
        assert!(check_name("a.txt").is_ok());
        assert!(check_name("").is_err());
        assert!(check_name("a/b").is_err());
    }
}
