mod common;

use anyhow::Result;
use axum::http::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = common::TestApp::spawn()?;
    let res = app.get("/health", None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.data()["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_lists_the_resources() -> Result<()> {
    let app = common::TestApp::spawn()?;
    let res = app.get("/", None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["name"], "shopfront-api");
    assert_eq!(res.data()["endpoints"]["products"], "/api/products");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_use_the_failure_envelope() -> Result<()> {
    let app = common::TestApp::spawn()?;
    let res = app.get("/api/nope", None).await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["code"], "NOT_FOUND");
    assert_eq!(res.problems(), vec!["Route GET /api/nope not found"]);
    assert!(res.body["timestamp"].as_str().is_some());
    Ok(())
}
