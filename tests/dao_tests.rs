//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use httpmock::prelude::*;
use serde_json::json;

use personium_dao::script::ScriptRequest;
use personium_dao::types::Role;
use personium_dao::Accessor;
use personium_dao::Acl;
use personium_dao::ChangeSet;
use personium_dao::Dao;
use personium_dao::DaoErrorKind;
use personium_dao::Event;
use personium_dao::EventLevel;
use personium_dao::QuerySpec;

use std::error::Error;

const TOKEN_RESPONSE: &str = r#"{
    "access_token": "AA~apptoken",
    "refresh_token": "reftok",
    "token_type": "Bearer",
    "expires_in": 3600,
    "refresh_token_expires_in": 86400
}"#;

async fn get_dao(server: &MockServer) -> Result<Dao, Box<dyn Error>> {
    Ok(Dao::builder()
        .base_url(&server.base_url())?
        .build()
        .await?)
}

// Password login to cell `app` as `me`.
async fn login(server: &MockServer) -> Result<Accessor, Box<dyn Error>> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/app/__token")
            .body_includes("grant_type=password")
            .body_includes("username=me");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOKEN_RESPONSE);
    });
    let dao = get_dao(server).await?;
    Ok(dao
        .authenticate(&json!({"cellUrl": "app", "userId": "me", "password": "secret"}))
        .await?)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn password_login() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__token")
            .header("content-type", "application/x-www-form-urlencoded")
            .body_includes("grant_type=password")
            .body_includes("username=me")
            .body_includes("password=secret");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOKEN_RESPONSE);
    });
    let dao = get_dao(&server).await?;
    let acc = dao
        .authenticate(&json!({"cellUrl": "app", "userId": "me", "password": "secret"}))
        .await?;
    token.assert();
    assert_eq!(acc.access_token(), "AA~apptoken");
    assert_eq!(acc.refresh_token(), Some("reftok"));
    assert_eq!(acc.token().expires_in, 3600);
    let cell = acc.cell(None)?;
    assert_eq!(cell.url(), format!("{}/app/", server.base_url()));
    assert_eq!(cell.name(), "app");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_login_is_an_error() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/app/__token");
        then.status(400)
            .header("content-type", "application/json")
            .body(r#"{"error":"invalid_grant","error_description":"failed"}"#);
    });
    let dao = get_dao(&server).await?;
    let err = dao
        .authenticate(&json!({"cellUrl": "app", "userId": "me", "password": "bad"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, 400);
    assert_eq!(err.kind, DaoErrorKind::RemoteBadRequest);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unmatched_credential_sends_nothing() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });
    let dao = get_dao(&server).await?;
    let err = dao
        .authenticate(&json!({"userId": "me", "password": "secret"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, DaoErrorKind::InvalidParameter);
    any.assert_calls(0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn schema_authenticated_login() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let schema = server.mock(|when, then| {
        when.method(POST)
            .path("/appschema/__token")
            .body_includes("username=appuser")
            .body_includes("p_target=");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"access_token": "schematok", "token_type": "Bearer", "expires_in": 3600}"#);
    });
    let app = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__token")
            .body_includes("username=me")
            .body_includes("client_id=")
            .body_includes("client_secret=schematok");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOKEN_RESPONSE);
    });
    let dao = get_dao(&server).await?;
    let acc = dao
        .authenticate(&json!({
            "cellUrl": "app",
            "userId": "me",
            "password": "secret",
            "schemaUrl": "appschema",
            "schemaUserId": "appuser",
            "schemaPassword": "apppass"
        }))
        .await?;
    schema.assert();
    app.assert();
    assert_eq!(acc.access_token(), "AA~apptoken");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refresh_exchanges_refresh_token() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let refresh = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__token")
            .body_includes("grant_type=refresh_token")
            .body_includes("refresh_token=reftok");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"access_token": "AA~fresh", "refresh_token": "reftok2"}"#);
    });
    let acc2 = acc.refresh().await?;
    refresh.assert();
    assert_eq!(acc2.access_token(), "AA~fresh");
    assert_eq!(acc2.refresh_token(), Some("reftok2"));
    // the original accessor is unchanged
    assert_eq!(acc.access_token(), "AA~apptoken");
    Ok(())
}

const SAML2_GRANT: &str = "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Asaml2-bearer";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transcell_token_exchange() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__token")
            .header("content-type", "application/x-www-form-urlencoded")
            .body_includes(SAML2_GRANT)
            .body_includes("assertion=transtok");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOKEN_RESPONSE);
    });
    let dao = get_dao(&server).await?;
    let acc = dao
        .authenticate(&json!({"cellUrl": "app", "accessToken": "transtok"}))
        .await?;
    token.assert();
    assert_eq!(acc.access_token(), "AA~apptoken");
    assert_eq!(acc.cell(None)?.name(), "app");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn schema_authenticated_token_exchange() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let schema = server.mock(|when, then| {
        when.method(POST)
            .path("/appschema/__token")
            .body_includes("grant_type=password")
            .body_includes("username=appuser")
            .body_includes("password=apppass")
            .body_includes("p_target=");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"access_token": "schematok", "token_type": "Bearer", "expires_in": 3600}"#);
    });
    let app = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__token")
            .body_includes(SAML2_GRANT)
            .body_includes("assertion=transtok")
            .body_includes("client_id=http")
            .body_includes("client_secret=schematok");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOKEN_RESPONSE);
    });
    let dao = get_dao(&server).await?;
    let acc = dao
        .authenticate(&json!({
            "cellUrl": "app",
            "accessToken": "transtok",
            "schemaUrl": "appschema",
            "schemaUserId": "appuser",
            "schemaPassword": "apppass"
        }))
        .await?;
    schema.assert();
    app.assert();
    assert_eq!(acc.access_token(), "AA~apptoken");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn service_subject_login() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/svc/__token")
            .body_includes("grant_type=password")
            .body_includes("username=engine")
            .body_includes("password=enginepw");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOKEN_RESPONSE);
    });
    let dao = Dao::builder()
        .base_url(&server.base_url())?
        .service_subject("svc", "engine", "enginepw")?
        .build()
        .await?;
    let acc = dao.authenticate(&json!("serviceSubject")).await?;
    token.assert();
    assert_eq!(acc.access_token(), "AA~apptoken");
    assert_eq!(acc.cell(None)?.name(), "svc");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn service_subject_must_be_configured() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.any_request();
        then.status(200);
    });
    let dao = get_dao(&server).await?;
    let err = dao
        .authenticate(&json!("serviceSubject"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, DaoErrorKind::InvalidParameter);
    assert!(err.message.contains("service subject"));
    any.assert_calls(0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bare_token_needs_a_cell() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let dao = get_dao(&server).await?;
    let acc = dao.authenticate(&json!({"accessToken": "AA~bare"})).await?;
    assert_eq!(acc.access_token(), "AA~bare");
    let err = acc.cell(None).unwrap_err();
    assert_eq!(err.kind, DaoErrorKind::InvalidParameter);
    assert!(acc.cell(Some("other")).is_ok());

    let dao = Dao::builder()
        .base_url(&server.base_url())?
        .default_cell("app")?
        .build()
        .await?;
    let acc = dao.authenticate(&json!({"accessToken": "AA~bare"})).await?;
    assert_eq!(acc.cell(None)?.name(), "app");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_token_from_script_request() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let get = server.mock(|when, then| {
        when.method(GET)
            .path("/app/box1/notes.txt")
            .header("authorization", "Bearer AA~caller");
        then.status(200).body("hello");
    });
    let dao = Dao::builder()
        .base_url(&server.base_url())?
        .default_cell("app")?
        .build()
        .await?;
    let req = ScriptRequest::new("GET", "").header("Authorization", "Bearer AA~caller");
    let acc = req.bind_client(&dao).authenticate(&json!("client")).await?;
    assert_eq!(acc.access_token(), "AA~caller");
    let text = acc
        .cell(None)?
        .box_(Some("box1"))?
        .get_string("notes.txt")
        .await?;
    get.assert();
    assert_eq!(text, "hello");

    // without a bearer header there is no client token
    let req = ScriptRequest::new("GET", "");
    let err = req
        .bind_client(&dao)
        .authenticate(&json!("client"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, DaoErrorKind::InvalidParameter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_then_retrieve() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let entity = json!({"d": {"results": {
        "__id": "p1",
        "__published": "/Date(1700000000000)/",
        "__updated": "/Date(1700000000000)/",
        "__metadata": {
            "uri": format!("{}/app/box1/col/Pet('p1')", server.base_url()),
            "etag": "W/\"1-1700000000000\"",
            "type": "UserData.Pet"
        },
        "name": "tama",
        "age": 2
    }}});
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/app/box1/col/Pet")
            .header("authorization", "Bearer AA~apptoken")
            .body_includes("\"name\":\"tama\"");
        then.status(201).json_body(entity.clone());
    });
    let get = server.mock(|when, then| {
        when.method(GET).path("/app/box1/col/Pet('p1')");
        then.status(200).json_body(entity.clone());
    });
    let pets = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .entity_set("Pet");
    let created = pets
        .create(&json!({"__id": "p1", "name": "tama", "age": 2}))
        .await?;
    create.assert();
    assert_eq!(created.id.as_deref(), Some("p1"));
    assert_eq!(created.etag(), Some("W/\"1-1700000000000\""));

    let got = pets.key("p1").retrieve().await?;
    get.assert();
    assert_eq!(got.value["name"], "tama");
    assert_eq!(got.metadata.type_name, "UserData.Pet");
    assert_eq!(got.published, created.published);
    assert!(got.published.is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_create_conflicts() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    server.mock(|when, then| {
        when.method(POST).path("/app/box1/col/Pet");
        then.status(409)
            .header("content-type", "application/json")
            .body(r#"{"code":"PR409-OD-0003","message":{"lang":"en","value":"The entity already exists."}}"#);
    });
    let pets = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .entity_set("Pet");
    let err = pets.create(&json!({"__id": "p1"})).await.unwrap_err();
    assert_eq!(err.code, 409);
    assert!(err.is_conflict());
    assert_eq!(err.server_code().as_deref(), Some("PR409-OD-0003"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retrieve_missing_is_not_found() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    server.mock(|when, then| {
        when.method(GET).path("/app/box1/col/Pet('nope')");
        then.status(404)
            .body(r#"{"code":"PR404-OD-0002","message":{"lang":"en","value":"not found"}}"#);
    });
    let err = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .entity_set("Pet")
        .retrieve("nope")
        .await
        .unwrap_err();
    assert_eq!(err.kind, DaoErrorKind::RemoteNotFound);
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn writes_default_to_any_etag() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/app/box1/col/Pet('p1')")
            .header("if-match", "*");
        then.status(204).header("etag", "W/\"2-1\"");
    });
    // MERGE is not a standard method: match it by its own key
    let merge = server.mock(|when, then| {
        when.path("/app/box1/col/Pet('p2')")
            .header("if-match", "W/\"1-1\"")
            .body_includes("\"age\":3");
        then.status(204).header("etag", "W/\"2-2\"");
    });
    let del = server.mock(|when, then| {
        when.method(DELETE)
            .path("/app/box1/col/Pet('p3')")
            .header("if-match", "*");
        then.status(204);
    });
    let pets = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .entity_set("Pet");
    let etag = pets
        .key("p1")
        .update(&json!({"name": "tama", "age": 3}), None)
        .await?;
    assert_eq!(etag.as_deref(), Some("W/\"2-1\""));
    let etag = pets
        .key("p2")
        .merge(&json!({"age": 3}), Some("W/\"1-1\""))
        .await?;
    assert_eq!(etag.as_deref(), Some("W/\"2-2\""));
    pets.key("p3").del(None).await?;
    put.assert();
    merge.assert();
    del.assert();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn save_needs_an_id() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let any = server.mock(|when, then| {
        when.any_request();
        then.status(204);
    });
    let pets = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .entity_set("Pet");
    let err = pets
        .save(&json!({"name": "tama"}), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, DaoErrorKind::InvalidParameter);
    any.assert_calls(0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_etag_conflicts() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    server.mock(|when, then| {
        when.method(PUT).path("/app/box1/col/Pet('p1')");
        then.status(412)
            .body(r#"{"code":"PR412-OD-0003","message":{"lang":"en","value":"etag mismatch"}}"#);
    });
    let err = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .entity_set("Pet")
        .key("p1")
        .update(&json!({"name": "x"}), Some("W/\"1-0\""))
        .await
        .unwrap_err();
    assert_eq!(err.code, 412);
    assert_eq!(err.kind, DaoErrorKind::RemoteConflict);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn filtered_query() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    // of the four pets stored, two are 2 years old and cute
    let query = server.mock(|when, then| {
        when.method(GET)
            .path("/app/box1/col/Pet")
            .query_param("$filter", "age eq 2 and cute eq true")
            .query_param("$orderby", "name")
            .query_param("$inlinecount", "allpages");
        then.status(200).json_body(json!({"d": {
            "__count": "2",
            "results": [
                {"__id": "p1", "name": "mike", "age": 2, "cute": true},
                {"__id": "p4", "name": "tama", "age": 2, "cute": true}
            ]
        }}));
    });
    let pets = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .entity_set("Pet");
    let res = pets
        .query()
        .filter("age eq 2 and cute eq true")
        .orderby("name")
        .inlinecount(true)
        .run()
        .await?;
    query.assert();
    assert_eq!(res.count, Some(2));
    assert_eq!(res.len(), 2);
    assert_eq!(res.results[0]["name"], "mike");
    assert!(res.results.iter().all(|p| p["age"] == 2));

    let typed = pets
        .query()
        .filter("age eq 2 and cute eq true")
        .orderby("name")
        .inlinecount(true)
        .run_entities::<serde_json::Value>()
        .await?;
    assert_eq!(typed.results[1].id.as_deref(), Some("p4"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mkcol_on_existing_collection() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    server.mock(|when, then| {
        when.path("/app/box1/col")
            .body_includes("<D:mkcol")
            .body_includes("<p:odata/>");
        then.status(405)
            .body(r#"{"code":"PR405-DV-0002","message":{"lang":"en","value":"already exists"}}"#);
    });
    let err = acc
        .cell(None)?
        .box_(Some("box1"))?
        .mkodata("col")
        .await
        .unwrap_err();
    assert_eq!(err.kind, DaoErrorKind::RemoteMethodNotAllowed);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn acl_set_and_get() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let set = server.mock(|when, then| {
        when.path("/app/box1/col")
            .body_includes("<D:acl")
            .body_includes("<D:href>reader</D:href>")
            .body_includes("<D:read/>");
        then.status(200);
    });
    let xml = format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<multistatus xmlns="DAV:">
  <response>
    <href>{base}/app/box1/col</href>
    <propstat>
      <prop>
        <acl xmlns:p="urn:x-personium:xmlns" xml:base="{base}/app/__role/box1/">
          <ace>
            <principal><href>reader</href></principal>
            <grant><privilege><read/></privilege></grant>
          </ace>
        </acl>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#,
        base = server.base_url()
    );
    let get = server.mock(|when, then| {
        when.path("/app/box1/col")
            .header("depth", "0")
            .body_includes("propfind");
        then.status(207)
            .header("content-type", "application/xml")
            .body(xml);
    });
    let role = Role {
        name: "reader".to_string(),
        box_name: Some("box1".to_string()),
    };
    let col = acc.cell(None)?.box_(Some("box1"))?.odata("col");
    col.acl()
        .set(&Acl::new().grant(role.clone(), &["read"]))
        .await?;
    set.assert();
    let acl = col.acl().get().await?;
    get.assert();
    assert_eq!(acl.ace.len(), 1);
    assert_eq!(acl.ace[0].role, role);
    assert_eq!(acl.ace[0].privilege, vec!["read"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_event() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let post = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__event")
            .body_includes("\"level\":\"INFO\"")
            .body_includes("\"action\":\"login\"");
        then.status(200);
    });
    let log = server.mock(|when, then| {
        when.method(GET).path("/app/__log/current/default.log");
        then.status(200).body("2024-01-01,INFO,login,app,ok\n");
    });
    let events = acc.cell(None)?.event();
    events
        .post(&Event::new(EventLevel::Info, "login", "app", "ok"))
        .await?;
    post.assert();
    let text = events.current_log().await?;
    log.assert();
    assert!(text.contains("login"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_event_post() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/app/__token");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOKEN_RESPONSE);
    });
    let post = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__event")
            .body_includes("\"action\":\"login\"");
        then.status(500)
            .header("content-type", "application/json")
            .body(r#"{"code":"PR500-SV-0000","message":{"lang":"en","value":"down"}}"#);
    });
    let dao = Dao::builder()
        .base_url(&server.base_url())?
        .async_event_log(true)?
        .build()
        .await?;
    let acc = dao
        .authenticate(&json!({"cellUrl": "app", "userId": "me", "password": "secret"}))
        .await?;
    // the server error is logged, not returned
    acc.cell(None)?
        .event()
        .post(&Event::new(EventLevel::Error, "login", "app", "failed"))
        .await?;
    for _ in 0..100 {
        if post.calls_async().await > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    post.assert_async().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_round_trip() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let body = "--batchresp\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"d\":{\"results\":[{\"__id\":\"p1\"}]}}\r\n\
--batchresp\r\n\
Content-Type: multipart/mixed; boundary=changesetresp\r\n\
\r\n\
--changesetresp\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 201 Created\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"d\":{\"results\":{\"__id\":\"p9\"}}}\r\n\
--changesetresp\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 204 No Content\r\n\
\r\n\
\r\n\
--changesetresp--\r\n\
\r\n\
--batchresp--\r\n";
    let batch = server.mock(|when, then| {
        when.method(POST)
            .path("/app/box1/col/$batch")
            .header_exists("content-type")
            .body_includes("GET Pet?$top=1 HTTP/1.1")
            .body_includes("POST Pet HTTP/1.1")
            .body_includes("DELETE Pet('p2') HTTP/1.1")
            .body_includes("If-Match: *");
        then.status(202)
            .header("content-type", "multipart/mixed; boundary=batchresp")
            .body(body);
    });
    let results = acc
        .cell(None)?
        .box_(Some("box1"))?
        .odata("col")
        .batch()
        .query("Pet", &QuerySpec::new().top(1))
        .changeset(
            ChangeSet::new()
                .create("Pet", json!({"__id": "p9"}))
                .del("Pet", "p2", None),
        )
        .send()
        .await?;
    batch.assert();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, 200);
    assert_eq!(results[1].status, 201);
    assert_eq!(results[1].json()?["d"]["results"]["__id"], "p9");
    assert_eq!(results[2].status, 204);
    assert!(results.iter().all(|r| r.is_success()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn account_password_header() -> Result<(), Box<dyn Error>> {
    let server = MockServer::start();
    let acc = login(&server).await?;
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/app/__ctl/Account")
            .header("x-personium-credential", "newsecret")
            .body_includes("\"Name\":\"bob\"");
        then.status(201).json_body(json!({"d": {"results": {
            "Name": "bob",
            "Type": "basic",
            "__metadata": {"uri": "x", "etag": "W/\"1-1\"", "type": "CellCtl.Account"}
        }}}));
    });
    let mine = server.mock(|when, then| {
        when.method(PUT)
            .path("/app/__mypassword")
            .header("x-personium-credential", "changed");
        then.status(204);
    });
    let cell = acc.cell(None)?;
    let account = personium_dao::types::Account {
        name: "bob".to_string(),
        ..Default::default()
    };
    let created = cell
        .accounts()
        .create_with_password(&account, "newsecret")
        .await?;
    create.assert();
    assert_eq!(created.value.name, "bob");
    assert_eq!(created.etag(), Some("W/\"1-1\""));
    cell.change_my_password("changed").await?;
    mine.assert();
    Ok(())
}
