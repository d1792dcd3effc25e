//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Shared pieces of the resource path builder: the connection context every
//! navigation step carries, and OData key predicates.
use crate::auth::token::TokenInfo;
use crate::dao::{Dao, DaoRequest, DaoResponse};
use crate::error::DaoError;
use reqwest::Method;
use std::fmt;
use std::sync::Arc;

/// Connection context shared by every object derived from one [`Accessor`](crate::Accessor).
#[derive(Clone, Debug)]
pub(crate) struct Context {
    pub(crate) dao: Dao,
    pub(crate) token: Arc<TokenInfo>,
}

impl Context {
    pub(crate) fn new(dao: Dao, token: TokenInfo) -> Context {
        Context {
            dao,
            token: Arc::new(token),
        }
    }

    /// A request carrying this context's bearer token.
    pub(crate) fn request(&self, method: Method, url: &str) -> DaoRequest {
        DaoRequest::new(method, url).bearer(&self.token.access_token)
    }

    pub(crate) fn extension(&self, method: &str, url: &str) -> Result<DaoRequest, DaoError> {
        Ok(DaoRequest::extension(method, url)?.bearer(&self.token.access_token))
    }

    pub(crate) async fn send(&self, req: DaoRequest) -> Result<DaoResponse, DaoError> {
        self.dao.send(req).await
    }
}

/// Key predicate identifying one entity in an entity set.
///
/// ```
/// use personium_dao::ODataKey;
///
/// assert_eq!(ODataKey::from("alice").to_string(), "('alice')");
/// assert_eq!(
///     ODataKey::name_in_box("admin", Some("app")).to_string(),
///     "(Name='admin',_Box.Name='app')"
/// );
/// assert_eq!(
///     ODataKey::name_in_box("admin", None).to_string(),
///     "(Name='admin',_Box.Name=null)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ODataKey {
    Single(String),
    /// Named components; `None` is written as `null`.
    Compound(Vec<(String, Option<String>)>),
}

impl ODataKey {
    /// Key of a resource that is unique per box (roles, relations).
    pub fn name_in_box(name: &str, box_name: Option<&str>) -> ODataKey {
        ODataKey::Compound(vec![
            ("Name".to_string(), Some(name.to_string())),
            ("_Box.Name".to_string(), box_name.map(|b| b.to_string())),
        ])
    }

    /// True for a single key with an empty value, which addresses nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            ODataKey::Single(v) => v.is_empty(),
            ODataKey::Compound(parts) => parts.is_empty(),
        }
    }

    pub fn compound(parts: &[(&str, Option<&str>)]) -> ODataKey {
        ODataKey::Compound(
            parts
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(|s| s.to_string())))
                .collect(),
        )
    }
}

// Quote a key literal, doubling embedded quotes and encoding characters that
// would otherwise end the path segment.
fn literal(v: &str) -> String {
    let mut s = String::with_capacity(v.len() + 2);
    s.push('\'');
    for c in v.chars() {
        match c {
            '\'' => s.push_str("''"),
            '/' => s.push_str("%2F"),
            '?' => s.push_str("%3F"),
            '#' => s.push_str("%23"),
            '%' => s.push_str("%25"),
            _ => s.push(c),
        }
    }
    s.push('\'');
    s
}

impl fmt::Display for ODataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ODataKey::Single(v) => write!(f, "({})", literal(v)),
            ODataKey::Compound(parts) => {
                f.write_str("(")?;
                for (i, (k, v)) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    match v {
                        Some(v) => write!(f, "{}={}", k, literal(v))?,
                        None => write!(f, "{}=null", k)?,
                    }
                }
                f.write_str(")")
            }
        }
    }
}

impl From<&str> for ODataKey {
    fn from(v: &str) -> Self {
        ODataKey::Single(v.to_string())
    }
}

impl From<String> for ODataKey {
    fn from(v: String) -> Self {
        ODataKey::Single(v)
    }
}

impl From<&String> for ODataKey {
    fn from(v: &String) -> Self {
        ODataKey::Single(v.clone())
    }
}

/// Navigation property segment: `_Box` for `Box`, unchanged when already prefixed.
pub(crate) fn nav_segment(name: &str) -> String {
    if name.starts_with('_') {
        name.to_string()
    } else {
        format!("_{}", name)
    }
}

/// Append a path segment to a url, with exactly one `/` between them.
pub(crate) fn join(base: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_key_escaping() {
        assert_eq!(ODataKey::from("O'Neil").to_string(), "('O''Neil')");
        assert_eq!(ODataKey::from("a/b?c").to_string(), "('a%2Fb%3Fc')");
    }

    #[test]
    fn compound_key() {
        let k = ODataKey::compound(&[
            ("ExtRole", Some("https://x/cell/__role/__/r")),
            ("_Relation.Name", Some("rel")),
            ("_Relation._Box.Name", None),
        ]);
        assert_eq!(
            k.to_string(),
            "(ExtRole='https:%2F%2Fx%2Fcell%2F__role%2F__%2Fr',_Relation.Name='rel',_Relation._Box.Name=null)"
        );
    }

    #[test]
    fn nav_and_join() {
        assert_eq!(nav_segment("Box"), "_Box");
        assert_eq!(nav_segment("_Role"), "_Role");
        assert_eq!(join("http://h/c/", "/box"), "http://h/c/box");
        assert_eq!(join("http://h/c", "box"), "http://h/c/box");
    }
}
