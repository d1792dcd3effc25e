//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Access control lists of cells, boxes and collections.
use crate::dao::CONTENT_XML;
use crate::error::{ia_err, ia_error, DaoError};
use crate::resource::Context;
use crate::types::Role;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_derive::{Deserialize, Serialize};
use std::result::Result;
use tracing::debug;
use url::Url;

const DAV_NS: &str = "DAV:";
const PERSONIUM_NS: &str = "urn:x-personium:xmlns";
pub(crate) const DEFAULT_BOX: &str = "__";

// Privileges defined by WebDAV; everything else lives in the platform namespace.
const DAV_PRIVILEGES: &[&str] = &[
    "read",
    "write",
    "read-acl",
    "write-acl",
    "read-properties",
    "write-properties",
    "bind",
    "unbind",
    "all",
];

/// One grant: a role and the privileges it receives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ace {
    pub role: Role,
    pub privilege: Vec<String>,
}

/// An access control list.
///
/// `require_schema_authz` is `none`, `public` or `confidential`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_schema_authz: Option<String>,
    #[serde(default)]
    pub ace: Vec<Ace>,
}

impl Acl {
    pub fn new() -> Acl {
        Acl::default()
    }

    pub fn require_schema_authz(mut self, level: &str) -> Self {
        self.require_schema_authz = Some(level.to_string());
        self
    }

    /// Grant `privileges` to `role`.
    pub fn grant(mut self, role: Role, privileges: &[&str]) -> Self {
        self.ace.push(Ace {
            role,
            privilege: privileges.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    /// Write the `D:acl` document sent with the `ACL` method.
    ///
    /// Role hrefs are relative to the roles of `base_box` in `cell_url`.
    /// A privilege that is not a valid XML name is rejected.
    pub fn to_xml(&self, cell_url: &str, base_box: &str) -> Result<String, DaoError> {
        let mut w = Writer::new(Vec::new());
        put(&mut w, Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        let base = format!("{}__role/{}/", cell_url, base_box);
        let mut root = BytesStart::new("D:acl");
        root.push_attribute(("xmlns:D", DAV_NS));
        root.push_attribute(("xmlns:p", PERSONIUM_NS));
        root.push_attribute(("xml:base", base.as_str()));
        if let Some(level) = &self.require_schema_authz {
            root.push_attribute(("p:requireSchemaAuthz", level.as_str()));
        }
        put(&mut w, Event::Start(root))?;
        for ace in &self.ace {
            let role_box = ace.role.box_name.as_deref().unwrap_or(DEFAULT_BOX);
            let href = if role_box == base_box {
                ace.role.name.clone()
            } else {
                format!("../{}/{}", role_box, ace.role.name)
            };
            start(&mut w, "D:ace")?;
            start(&mut w, "D:principal")?;
            start(&mut w, "D:href")?;
            put(&mut w, Event::Text(BytesText::new(&href)))?;
            end(&mut w, "D:href")?;
            end(&mut w, "D:principal")?;
            start(&mut w, "D:grant")?;
            for p in &ace.privilege {
                if !is_xml_name(p) {
                    return ia_err!("invalid privilege name '{}'", p);
                }
                let prefix = if DAV_PRIVILEGES.contains(&p.as_str()) {
                    "D"
                } else {
                    "p"
                };
                let tag = format!("{}:{}", prefix, p);
                start(&mut w, "D:privilege")?;
                put(&mut w, Event::Empty(BytesStart::new(tag.as_str())))?;
                end(&mut w, "D:privilege")?;
            }
            end(&mut w, "D:grant")?;
            end(&mut w, "D:ace")?;
        }
        end(&mut w, "D:acl")?;
        match String::from_utf8(w.into_inner()) {
            Ok(x) => Ok(x),
            Err(e) => ia_err!("error writing acl document: {}", e),
        }
    }

    /// Read the first `D:acl` element of a PROPFIND response.
    ///
    /// Aces whose principal is not a role href (e.g. `D:all`) are skipped.
    pub fn from_xml(xml: &str) -> Result<Acl, DaoError> {
        let doc = roxmltree::Document::parse(xml)?;
        let acl = match doc
            .descendants()
            .find(|n| n.has_tag_name((DAV_NS, "acl")))
        {
            Some(a) => a,
            None => return ia_err!("no acl element in response"),
        };
        let base = acl
            .attribute(("http://www.w3.org/XML/1998/namespace", "base"))
            .and_then(|b| Url::parse(b).ok());
        let mut out = Acl {
            require_schema_authz: acl
                .attribute((PERSONIUM_NS, "requireSchemaAuthz"))
                .map(|s| s.to_string()),
            ace: Vec::new(),
        };
        for ace in acl.children().filter(|n| n.has_tag_name((DAV_NS, "ace"))) {
            let href = ace
                .descendants()
                .find(|n| n.has_tag_name((DAV_NS, "principal")))
                .and_then(|p| p.children().find(|n| n.has_tag_name((DAV_NS, "href"))))
                .and_then(|h| h.text());
            let href = match href {
                Some(h) => h.trim(),
                None => continue,
            };
            let role = match role_from_href(base.as_ref(), href) {
                Some(r) => r,
                None => continue,
            };
            let privilege = ace
                .descendants()
                .filter(|n| n.has_tag_name((DAV_NS, "privilege")))
                .flat_map(|p| p.children().filter(|c| c.is_element()))
                .map(|c| c.tag_name().name().to_string())
                .collect();
            out.ace.push(Ace { role, privilege });
        }
        Ok(out)
    }
}

fn put(w: &mut Writer<Vec<u8>>, ev: Event<'_>) -> Result<(), DaoError> {
    w.write_event(ev)
        .map_err(|e| ia_error!("error writing acl document: {}", e))
}

fn start(w: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), DaoError> {
    put(w, Event::Start(BytesStart::new(tag)))
}

fn end(w: &mut Writer<Vec<u8>>, tag: &str) -> Result<(), DaoError> {
    put(w, Event::End(BytesEnd::new(tag)))
}

// An XML name without a namespace prefix.
fn is_xml_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
}

// `.../__role/{box}/{role}` -> Role; the default box maps to no box.
fn role_from_href(base: Option<&Url>, href: &str) -> Option<Role> {
    let resolved = match base {
        Some(b) => b.join(href).ok()?,
        None => Url::parse("http://localhost/__role/__/").ok()?.join(href).ok()?,
    };
    let mut segs: Vec<&str> = resolved.path_segments()?.filter(|s| !s.is_empty()).collect();
    let name = segs.pop()?;
    let box_name = segs.pop()?;
    Some(Role {
        name: name.to_string(),
        box_name: if box_name == DEFAULT_BOX {
            None
        } else {
            Some(box_name.to_string())
        },
    })
}

/// Reads and replaces the ACL of one resource.
#[derive(Debug, Clone)]
pub struct AclManager {
    ctx: Context,
    url: String,
    cell_url: String,
    base_box: String,
}

impl AclManager {
    pub(crate) fn new(ctx: Context, url: &str, cell_url: &str, base_box: &str) -> AclManager {
        AclManager {
            ctx,
            url: url.to_string(),
            cell_url: cell_url.to_string(),
            base_box: base_box.to_string(),
        }
    }

    /// Replace the ACL.
    pub async fn set(&self, acl: &Acl) -> Result<(), DaoError> {
        debug!("Setting acl of {}", self.url);
        let body = acl.to_xml(&self.cell_url, &self.base_box)?;
        let req = self.ctx.extension("ACL", &self.url)?.body(CONTENT_XML, body);
        self.ctx.send(req).await?;
        Ok(())
    }

    pub async fn get(&self) -> Result<Acl, DaoError> {
        let body = "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\
                    <D:propfind xmlns:D=\"DAV:\"><D:allprop/></D:propfind>";
        let req = self
            .ctx
            .extension("PROPFIND", &self.url)?
            .header("depth", "0")
            .header("accept", CONTENT_XML)
            .body(CONTENT_XML, body);
        let resp = self.ctx.send(req).await?;
        Acl::from_xml(&resp.text())
    }
}
