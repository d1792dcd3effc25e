//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//

// This is an example program showing the basic flow against a Personium unit.
// It logs in to a cell, creates an OData collection with a small schema in a
// box, writes and queries a few entities, posts an event and then removes what
// it created.

// To run this example, point it at a unit and a cell account:
//    PERSONIUM_BASE_URL=https://personium.example.com PERSONIUM_CELL=app-cell \
//    PERSONIUM_USER=me PERSONIUM_PASSWORD=secret cargo run --example quickstart
//
// for extra output:
//    RUST_LOG=debug cargo run --example quickstart
//
// or, for a LOT of tracing output:
//    RUST_LOG=trace cargo run --example quickstart

use personium_dao::types::{EntityType, Property};
use personium_dao::Accessor;
use personium_dao::Dao;
use personium_dao::DaoError;
use personium_dao::Event;
use personium_dao::EventLevel;
use serde_json::json;
use std::error::Error;
use std::time::Duration;
use tracing::info;

// This method shows the ways to configure a Dao.
async fn get_dao() -> Result<Dao, DaoError> {
    // Note: later methods called on this builder will override earlier methods.
    Dao::builder()
        // The unit to talk to:
        .base_url("http://localhost:8080")?
        //
        // Or read everything from a config file (default ~/.personium/config):
        // .from_config_file("", "DEFAULT")?
        //
        // To read all of the above from environment variables:
        // or, to override above from environment;
        .from_environment()?
        //
        // Optional: set a different default timeout (default is 30 seconds)
        .timeout(Duration::from_secs(15))?
        //
        // Build the dao
        .build()
        .await
}

async fn login(dao: &Dao) -> Result<Accessor, DaoError> {
    let cell = std::env::var("PERSONIUM_CELL").unwrap_or_else(|_| "app-cell".to_string());
    let user = std::env::var("PERSONIUM_USER").unwrap_or_else(|_| "me".to_string());
    let password = std::env::var("PERSONIUM_PASSWORD").unwrap_or_default();
    dao.authenticate(&json!({"cellUrl": cell, "userId": user, "password": password}))
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Set up a tracing subscriber to see output based on RUST_LOG environment setting
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .with_ansi(false)
        .compact()
        .init();

    info!("Creating new dao...");
    let dao = get_dao().await?;
    let acc = login(&dao).await?;
    let cell = acc.cell(None)?;
    info!("Logged in to {}", cell.url());

    // Create an OData collection in the default box
    let bx = cell.box_(None)?;
    let col = match bx.mkodata("quickstart").await {
        Ok(c) => c,
        // 405: it is already there
        Err(e) if e.code == 405 => bx.odata("quickstart"),
        Err(e) => return Err(e.into()),
    };

    // Describe the Pet entity type
    let schema = col.schema();
    let et = EntityType {
        name: "Pet".to_string(),
    };
    if let Err(e) = schema.entity_types().create(&et).await {
        if !e.is_conflict() {
            return Err(e.into());
        }
    }
    for (name, ty) in [("name", "Edm.String"), ("age", "Edm.Int32"), ("cute", "Edm.Boolean")] {
        let p = Property {
            name: name.to_string(),
            entity_type_name: "Pet".to_string(),
            property_type: ty.to_string(),
            nullable: Some(true),
            ..Default::default()
        };
        if let Err(e) = schema.properties().create(&p).await {
            if !e.is_conflict() {
                return Err(e.into());
            }
        }
    }

    // Write a few pets
    let pets = col.entity_set("Pet");
    for (id, name, age, cute) in [
        ("p1", "mike", 2, true),
        ("p2", "pochi", 5, true),
        ("p3", "kuro", 2, false),
        ("p4", "tama", 2, true),
    ] {
        let res = pets
            .create(&json!({"__id": id, "name": name, "age": age, "cute": cute}))
            .await;
        match res {
            Ok(e) => println!("created {:?} etag={:?}", e.id, e.etag()),
            Err(e) if e.is_conflict() => println!("{} already exists", id),
            Err(e) => return Err(e.into()),
        }
    }

    // Conditional update using the etag we just read
    let p1 = pets.key("p1").retrieve().await?;
    let etag = pets
        .key("p1")
        .merge(&json!({"age": 3}), p1.etag())
        .await?;
    println!("p1 updated, new etag={:?}", etag);

    // Query
    let res = pets
        .query()
        .filter("age eq 2 and cute eq true")
        .orderby("name")
        .inlinecount(true)
        .run()
        .await?;
    println!("found {:?} pets: {:?}", res.count, res.results);

    // Record what we did in the cell's event log
    cell.event()
        .post(&Event::new(EventLevel::Info, "quickstart", col.url(), "ok"))
        .await?;

    // Clean up the entities
    for id in ["p1", "p2", "p3", "p4"] {
        pets.key(id).del(None).await?;
    }

    Ok(())
}
