mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, send, TestApp};
use serde_json::json;

const STARTING_BALANCE: i64 = 25;
const WITHDRAWAL: i64 = 3;
const CONCURRENT_REQUESTS: usize = 20;
const POOL_CONNECTIONS: u32 = 10;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_outbound_never_oversells() {
    let app = TestApp::with_pool(POOL_CONNECTIONS).await;

    let material = app
        .create_material("RACE-1", "Contended", STARTING_BALANCE)
        .await;
    let id = material["id"].as_str().expect("material id").to_string();

    let mut handles = Vec::with_capacity(CONCURRENT_REQUESTS);
    for _ in 0..CONCURRENT_REQUESTS {
        let router = app.router();
        let token = app.operator.token.clone();
        let body = json!({ "type": "OUTBOUND", "quantity": WITHDRAWAL, "materialId": id });
        handles.push(tokio::spawn(async move {
            send(router, Method::POST, "/movements", Some(body), Some(&token))
                .await
                .status()
        }));
    }

    let mut succeeded = 0i64;
    for handle in handles {
        match handle.await.expect("request task panicked") {
            StatusCode::CREATED => succeeded += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(succeeded, STARTING_BALANCE / WITHDRAWAL);

    let detail = response_json(
        app.request_as(&app.viewer, Method::GET, &format!("/materials/{id}"), None)
            .await,
    )
    .await;
    let balance = detail["quantity"].as_i64().expect("balance");
    assert_eq!(balance, STARTING_BALANCE - succeeded * WITHDRAWAL);
    assert!(balance >= 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inbound_is_fully_applied() {
    let app = TestApp::with_pool(POOL_CONNECTIONS).await;

    let material = app.create_material("RACE-2", "Restocked", 0).await;
    let id = material["id"].as_str().expect("material id").to_string();

    let mut handles = Vec::with_capacity(CONCURRENT_REQUESTS);
    for _ in 0..CONCURRENT_REQUESTS {
        let router = app.router();
        let token = app.operator.token.clone();
        let body = json!({ "type": "INBOUND", "quantity": 2, "materialId": id });
        handles.push(tokio::spawn(async move {
            send(router, Method::POST, "/movements", Some(body), Some(&token))
                .await
                .status()
        }));
    }

    for handle in handles {
        assert_eq!(
            handle.await.expect("request task panicked"),
            StatusCode::CREATED
        );
    }

    let detail = response_json(
        app.request_as(&app.viewer, Method::GET, &format!("/materials/{id}"), None)
            .await,
    )
    .await;
    assert_eq!(detail["quantity"], (CONCURRENT_REQUESTS * 2) as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_with_one_sku_yield_one_material() {
    let app = TestApp::with_pool(POOL_CONNECTIONS).await;

    let mut handles = Vec::with_capacity(CONCURRENT_REQUESTS);
    for i in 0..CONCURRENT_REQUESTS {
        let router = app.router();
        let token = app.operator.token.clone();
        let body = json!({ "name": format!("Clash {i}"), "sku": "SAME-SKU", "quantity": 5 });
        handles.push(tokio::spawn(async move {
            send(router, Method::POST, "/materials", Some(body), Some(&token))
                .await
                .status()
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.expect("request task panicked") {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);

    let listed = response_json(
        app.request_as(&app.viewer, Method::GET, "/movements", None)
            .await,
    )
    .await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}
