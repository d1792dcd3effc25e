//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::error::{ia_err, DaoError};
use crate::resource::Context;
use crate::types::{unwrap_results, ODataEntity};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::result::Result;
use tracing::trace;

/// The clauses of an OData query.
///
/// Clauses can be set in any order; [`to_query_string()`](QuerySpec::to_query_string())
/// always writes them as `$filter`, `$select`, `$expand`, `$orderby`, `$top`,
/// `$skip`, `$inlinecount`, `q`. Setting a clause twice keeps the last value.
///
/// ```
/// use personium_dao::QuerySpec;
///
/// let a = QuerySpec::new().top(10).skip(5);
/// let b = QuerySpec::new().skip(5).top(10);
/// assert_eq!(a.to_query_string(), "$top=10&$skip=5");
/// assert_eq!(a.to_query_string(), b.to_query_string());
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct QuerySpec {
    filter: Option<String>,
    select: Option<String>,
    expand: Option<String>,
    orderby: Option<String>,
    top: Option<u32>,
    skip: Option<u32>,
    inlinecount: Option<bool>,
    q: Option<String>,
}

impl QuerySpec {
    pub fn new() -> QuerySpec {
        QuerySpec::default()
    }

    /// Raw OData filter expression, e.g. `age eq 2 and cute eq true`.
    ///
    /// The expression is not validated; the server rejects malformed ones
    /// with a 400 error.
    pub fn filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    /// Comma separated property names.
    pub fn select(mut self, select: &str) -> Self {
        self.select = Some(select.to_string());
        self
    }

    /// Comma separated navigation properties to expand inline.
    pub fn expand(mut self, expand: &str) -> Self {
        self.expand = Some(expand.to_string());
        self
    }

    /// e.g. `name desc,age`.
    pub fn orderby(mut self, orderby: &str) -> Self {
        self.orderby = Some(orderby.to_string());
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Ask the server to report the total number of matches (`allpages`) or not (`none`).
    pub fn inlinecount(mut self, inlinecount: bool) -> Self {
        self.inlinecount = Some(inlinecount);
        self
    }

    /// Full-text search keyword.
    pub fn q(mut self, q: &str) -> Self {
        self.q = Some(q.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == QuerySpec::default()
    }

    /// Serialize the clauses, percent-encoding the values.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut add = |name: &str, value: &str| {
            parts.push(format!("{}={}", name, urlencoding::encode(value)));
        };
        if let Some(v) = &self.filter {
            add("$filter", v);
        }
        if let Some(v) = &self.select {
            add("$select", v);
        }
        if let Some(v) = &self.expand {
            add("$expand", v);
        }
        if let Some(v) = &self.orderby {
            add("$orderby", v);
        }
        if let Some(v) = self.top {
            add("$top", &v.to_string());
        }
        if let Some(v) = self.skip {
            add("$skip", &v.to_string());
        }
        if let Some(v) = self.inlinecount {
            add("$inlinecount", if v { "allpages" } else { "none" });
        }
        if let Some(v) = &self.q {
            add("q", v);
        }
        parts.join("&")
    }
}

/// Results of a query, with the total count when `inlinecount(true)` was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub results: Vec<T>,
    pub count: Option<u64>,
}

impl<T> QueryResult<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl QueryResult<Value> {
    pub(crate) fn from_body(body: Value) -> Result<QueryResult<Value>, DaoError> {
        let count = body
            .get("d")
            .and_then(|d| d.get("__count"))
            .and_then(|c| match c {
                Value::String(s) => s.parse::<u64>().ok(),
                Value::Number(n) => n.as_u64(),
                _ => None,
            });
        let results = match unwrap_results(body) {
            Value::Array(a) => a,
            Value::Null => Vec::new(),
            other => {
                return ia_err!("expected an array of query results, got {}", other);
            }
        };
        Ok(QueryResult { results, count })
    }

    fn try_map<U>(
        self,
        f: impl Fn(Value) -> Result<U, DaoError>,
    ) -> Result<QueryResult<U>, DaoError> {
        let results = self
            .results
            .into_iter()
            .map(f)
            .collect::<Result<Vec<U>, DaoError>>()?;
        Ok(QueryResult {
            results,
            count: self.count,
        })
    }
}

/// A query bound to an entity set (or navigation property) url.
///
/// Created by the `query()` methods of the resource managers:
/// ```no_run
/// # use personium_dao::Accessor;
/// # async fn run(acc: &Accessor) -> Result<(), Box<dyn std::error::Error>> {
/// let pets = acc.cell(None)?.box_(Some("app"))?.odata("odata")
///     .entity_set("Pet")
///     .query()
///     .filter("age eq 2 and cute eq true")
///     .orderby("name")
///     .top(10)
///     .run()
///     .await?;
/// println!("{} pets", pets.results.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    ctx: Context,
    url: String,
    spec: QuerySpec,
}

impl Query {
    pub(crate) fn new(ctx: Context, url: &str) -> Query {
        Query {
            ctx,
            url: url.to_string(),
            spec: QuerySpec::new(),
        }
    }

    pub fn filter(mut self, filter: &str) -> Self {
        self.spec = self.spec.filter(filter);
        self
    }

    pub fn select(mut self, select: &str) -> Self {
        self.spec = self.spec.select(select);
        self
    }

    pub fn expand(mut self, expand: &str) -> Self {
        self.spec = self.spec.expand(expand);
        self
    }

    pub fn orderby(mut self, orderby: &str) -> Self {
        self.spec = self.spec.orderby(orderby);
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.spec = self.spec.top(top);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.spec = self.spec.skip(skip);
        self
    }

    pub fn inlinecount(mut self, inlinecount: bool) -> Self {
        self.spec = self.spec.inlinecount(inlinecount);
        self
    }

    pub fn q(mut self, q: &str) -> Self {
        self.spec = self.spec.q(q);
        self
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// The full request url.
    pub fn url(&self) -> String {
        if self.spec.is_empty() {
            return self.url.clone();
        }
        format!("{}?{}", self.url, self.spec.to_query_string())
    }

    /// Execute the query and return the raw JSON results.
    pub async fn run(&self) -> Result<QueryResult<Value>, DaoError> {
        let url = self.url();
        trace!("Running query {}", url);
        let resp = self.ctx.send(self.ctx.request(Method::GET, &url)).await?;
        QueryResult::from_body(resp.value()?)
    }

    /// Execute the query, deserializing every result into `T`.
    pub async fn run_as<T: DeserializeOwned>(&self) -> Result<QueryResult<T>, DaoError> {
        self.run()
            .await?
            .try_map(|v| Ok(serde_json::from_value(v)?))
    }

    /// Execute the query, keeping the metadata of every result.
    pub async fn run_entities<T: DeserializeOwned>(
        &self,
    ) -> Result<QueryResult<ODataEntity<T>>, DaoError> {
        self.run().await?.try_map(ODataEntity::from_value)
    }
}
