mod common;

#[tokio::test]
async fn livez_returns_ok() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .get(format!("{}/livez", app.mgmt_url))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn readyz_returns_status_body() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .get(format!("{}/readyz", app.mgmt_url))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn health_endpoints_not_on_api_listener() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .get(format!("{}/livez", app.server_url))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}
