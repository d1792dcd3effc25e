//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Personium DAO Rust SDK
//!
//! This is a Rust client for a [Personium](https://personium.io) unit. It lets
//! an application (or a server-side script running next to the unit) obtain
//! tokens, walk the unit's resource tree, and read and write the data in it:
//! cells, boxes, accounts, roles, WebDAV collections, OData entity sets, ACLs
//! and event logs.
//!
//! This SDK supplies and uses Rust `async` methods throughout, using the [tokio](https://crates.io/crates/tokio) runtime. There is currently no blocking support.
//!
//! The general flow for an application is:
//! - Create a [`DaoBuilder`] with the unit url and any other needed parameters
//! - Create a [`Dao`] from the [`DaoBuilder`]; it is cheap to clone and meant to be shared across tasks
//! - Authenticate with [`Dao::authenticate()`] to get an [`Accessor`]
//! - Navigate from the accessor: [`Accessor::cell()`] → [`Cell::box_()`] → [`BoxResource::odata()`] → [`ODataCollection::entity_set()`], and call operations on what you reach
//!
//! ## Simple Example
//! The following code logs in to a cell with a password and queries an entity set.
//! ```no_run
//! use personium_dao::Dao;
//! use serde_json::json;
//! use std::error::Error;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn Error>> {
//!     let dao = Dao::builder()
//!         .base_url("https://personium.example.com")?
//!         .build()
//!         .await?;
//!     let acc = dao
//!         .authenticate(&json!({
//!             "cellUrl": "app-cell",
//!             "userId": "me",
//!             "password": "secret"
//!         }))
//!         .await?;
//!     let pets = acc
//!         .cell(None)?
//!         .box_(Some("box1"))?
//!         .odata("col")
//!         .entity_set("Pet");
//!     let res = pets
//!         .query()
//!         .filter("age eq 2 and cute eq true")
//!         .inlinecount(true)
//!         .run()
//!         .await?;
//!     println!("found {:?} pets: {:?}", res.count, res.results);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuring the SDK
//!
//! The [`DaoBuilder`] can be filled from code, from an INI config file with
//! [`DaoBuilder::from_config_file()`], or from the environment with
//! [`DaoBuilder::from_environment()`]. The default config file is
//! `~/.personium/config`:
//!
//! ```ini
//! [DEFAULT]
//! base_url=https://personium.example.com
//! cell=app-cell
//! username=service-user
//! password=secret
//! ```
//!
//! `username` and `password` are used for the `"serviceSubject"` credential.
//!
//! ## Credentials
//!
//! [`Dao::authenticate()`] takes a loosely-typed JSON value and picks the
//! authentication flow from its shape (see [`Credential::resolve()`]):
//!
//! | Value | Flow |
//! |-------|------|
//! | `"serviceSubject"` | password login with the configured service subject |
//! | `"client"` | reuse the bearer token of the calling client |
//! | `{cellUrl, userId, password}` | password login |
//! | `{cellUrl, accessToken}` | transcell token exchange |
//! | `{cellUrl, refreshToken}` | token refresh |
//! | `{accessToken}` | use the token as is |
//!
//! The password and token shapes also accept `schemaUrl`, `schemaUserId`
//! and `schemaPassword` to obtain a schema-authorized token.
//!
//! ## Errors
//!
//! Every operation returns a [`DaoError`]. Errors reported by the server keep
//! the http status as their code and map to a [`DaoErrorKind`]:
//! ```
//! use personium_dao::{DaoError, DaoErrorKind};
//!
//! let e = DaoError::from_code(409, "already exists");
//! assert_eq!(e.kind, DaoErrorKind::RemoteConflict);
//! assert!(e.is_conflict());
//! ```
//!
//! ## Logging
//!
//! The SDK logs through [tracing](https://crates.io/crates/tracing). Install a
//! subscriber (for example `tracing-subscriber` with `RUST_LOG=personium_dao=debug`)
//! to see the requests it sends.
//!
//! ## License
//!
//! Copyright (C) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//!
//! This SDK is licensed under the Universal Permissive License 1.0.
//!

pub(crate) mod dao_builder;
pub use crate::dao_builder::DaoBuilder;

pub(crate) mod dao;
pub use crate::dao::{Dao, ETAG_ANY};

pub(crate) mod accessor;
pub use crate::accessor::Accessor;

pub(crate) mod acl;
pub use crate::acl::{Ace, Acl, AclManager};

pub(crate) mod auth;
pub use crate::auth::credential::{Credential, SchemaAuth};
pub use crate::auth::token::TokenInfo;

pub(crate) mod batch;
pub use crate::batch::{Batch, BatchResult, ChangeSet};

pub(crate) mod box_resource;
pub use crate::box_resource::BoxResource;

pub(crate) mod cell;
pub use crate::cell::Cell;

pub(crate) mod crud;
pub use crate::crud::{
    AccountManager, AssociationEndManager, BoxManager, CellManager, ComplexTypeManager,
    ComplexTypePropertyManager, EntityTypeManager, ExtCellManager, ExtRoleManager,
    PropertyManager, RelationManager, ResourceKind, ResourceManager, RoleManager,
};

pub(crate) mod dav;
pub use crate::dav::DavCollection;

pub(crate) mod entity_set;
pub use crate::entity_set::{EntityRef, EntitySet, NavProperty};

pub(crate) mod error;
pub use crate::error::{DaoError, DaoErrorKind};


pub(crate) mod event;
pub use crate::event::{Event, EventLevel, EventManager};

pub(crate) mod odata_collection;
pub use crate::odata_collection::{ODataCollection, SchemaManager};

pub(crate) mod query;
pub use crate::query::{Query, QueryResult, QuerySpec};


pub(crate) mod resource;
pub use crate::resource::ODataKey;

pub mod script;

pub mod types;
