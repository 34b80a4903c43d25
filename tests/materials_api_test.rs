mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use materialops_api::entities::{movement, Movement};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn create_applies_defaults_and_records_seed_movement() {
    let app = TestApp::new().await;

    let created = app.create_material("STL-10", "Steel Rod", 100).await;
    assert_eq!(created["name"], "Steel Rod");
    assert_eq!(created["sku"], "STL-10");
    assert_eq!(created["quantity"], 100);
    assert_eq!(created["unit"], "pieces");
    assert_eq!(created["description"], "");
    assert_eq!(created["location"], "");
    assert!(created["createdAt"].is_string());
    assert!(created["updatedAt"].is_string());

    let id = created["id"].as_str().expect("material id");
    let detail = response_json(
        app.request_as(&app.viewer, Method::GET, &format!("/materials/{id}"), None)
            .await,
    )
    .await;

    let movements = detail["movements"].as_array().expect("movements array");
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0]["type"], "INBOUND");
    assert_eq!(movements[0]["quantity"], 100);
    assert_eq!(
        movements[0]["note"],
        "Initial creation by operator@example.com"
    );
    assert_eq!(movements[0]["userId"], app.operator.id().to_string());
    assert_eq!(movements[0]["user"]["email"], "operator@example.com");
}

#[tokio::test]
async fn create_with_zero_quantity_has_no_movements() {
    let app = TestApp::new().await;

    let created = app.create_material("EMPTY-1", "Empty Bin", 0).await;
    assert_eq!(created["quantity"], 0);

    let id = created["id"].as_str().expect("material id");
    let detail = response_json(
        app.request_as(&app.viewer, Method::GET, &format!("/materials/{id}"), None)
            .await,
    )
    .await;
    assert_eq!(detail["movements"], json!([]));
}

#[tokio::test]
async fn create_keeps_supplied_descriptive_fields() {
    let app = TestApp::new().await;

    let response = app
        .request_as(
            &app.operator,
            Method::POST,
            "/materials",
            Some(json!({
                "name": "Copper Wire 2mm",
                "sku": "CU-2",
                "description": "Bare copper",
                "quantity": 50,
                "unit": "spools",
                "location": "Warehouse A - Shelf 3"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["unit"], "spools");
    assert_eq!(body["description"], "Bare copper");
    assert_eq!(body["location"], "Warehouse A - Shelf 3");
}

#[tokio::test]
async fn create_requires_name_and_sku() {
    let app = TestApp::new().await;

    for payload in [
        json!({ "sku": "NO-NAME" }),
        json!({ "name": "No Sku" }),
        json!({ "name": "  ", "sku": "BLANK" }),
    ] {
        let response = app
            .request_as(&app.operator, Method::POST, "/materials", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Name and SKU are required");
    }

    let listed = response_json(
        app.request_as(&app.viewer, Method::GET, "/materials", None)
            .await,
    )
    .await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn create_rejects_negative_quantity() {
    let app = TestApp::new().await;

    let response = app
        .request_as(
            &app.operator,
            Method::POST,
            "/materials",
            Some(json!({ "name": "Negative", "sku": "NEG-1", "quantity": -5 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_sku_conflicts_and_leaves_original_alone() {
    let app = TestApp::new().await;

    let original = app.create_material("DUP-1", "Original", 7).await;

    let response = app
        .request_as(
            &app.operator,
            Method::POST,
            "/materials",
            Some(json!({ "name": "Impostor", "sku": "DUP-1", "quantity": 99 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["message"], "A material with this SKU already exists");

    let listed = response_json(
        app.request_as(&app.viewer, Method::GET, "/materials", None)
            .await,
    )
    .await;
    let listed = listed.as_array().expect("material list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], original["id"]);
    assert_eq!(listed[0]["name"], "Original");
    assert_eq!(listed[0]["quantity"], 7);

    let ledger = Movement::find()
        .count(app.state.db.as_ref())
        .await
        .expect("count movements");
    assert_eq!(ledger, 1);
}

#[tokio::test]
async fn list_is_newest_first() {
    let app = TestApp::new().await;

    app.create_material("ORD-1", "First", 0).await;
    app.create_material("ORD-2", "Second", 0).await;
    app.create_material("ORD-3", "Third", 0).await;

    let listed = response_json(
        app.request_as(&app.viewer, Method::GET, "/materials", None)
            .await,
    )
    .await;
    let skus: Vec<&str> = listed
        .as_array()
        .expect("material list")
        .iter()
        .map(|m| m["sku"].as_str().expect("sku"))
        .collect();
    assert_eq!(skus, vec!["ORD-3", "ORD-2", "ORD-1"]);
}

#[tokio::test]
async fn patch_is_partial_and_never_touches_quantity() {
    let app = TestApp::new().await;

    let created = app.create_material("PATCH-1", "Before", 12).await;
    let uri = format!("/materials/{}", created["id"].as_str().expect("material id"));

    let response = app
        .request_as(
            &app.operator,
            Method::PATCH,
            &uri,
            Some(json!({ "name": "After", "location": "Dock 2", "quantity": 9999 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;

    assert_eq!(updated["name"], "After");
    assert_eq!(updated["location"], "Dock 2");
    assert_eq!(updated["sku"], "PATCH-1");
    assert_eq!(updated["unit"], "pieces");
    assert_eq!(updated["quantity"], 12);
    assert_eq!(updated["createdAt"], created["createdAt"]);
}

#[tokio::test]
async fn patch_validates_name_and_sku() {
    let app = TestApp::new().await;

    app.create_material("TAKEN", "Holder", 0).await;
    let target = app.create_material("MINE", "Mine", 0).await;
    let uri = format!("/materials/{}", target["id"].as_str().expect("material id"));

    let blank = app
        .request_as(&app.operator, Method::PATCH, &uri, Some(json!({ "name": "" })))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let clash = app
        .request_as(&app.operator, Method::PATCH, &uri, Some(json!({ "sku": "TAKEN" })))
        .await;
    assert_eq!(clash.status(), StatusCode::CONFLICT);

    // Re-submitting its own SKU is not a clash
    let same = app
        .request_as(&app.operator, Method::PATCH, &uri, Some(json!({ "sku": "MINE" })))
        .await;
    assert_eq!(same.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_material_is_not_found() {
    let app = TestApp::new().await;
    let missing = format!("/materials/{}", Uuid::new_v4());

    for (user, method, body) in [
        (&app.viewer, Method::GET, None),
        (&app.operator, Method::PATCH, Some(json!({ "name": "Ghost" }))),
        (&app.admin, Method::DELETE, None),
    ] {
        let response = app.request_as(user, method.clone(), &missing, body).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
        let body = response_json(response).await;
        assert_eq!(body["message"], "Material not found");
    }

    let malformed = app
        .request_as(&app.viewer, Method::GET, "/materials/not-a-uuid", None)
        .await;
    assert_eq!(malformed.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_material_and_its_movements() {
    let app = TestApp::new().await;

    let doomed = app.create_material("DEL-1", "Doomed", 20).await;
    let keeper = app.create_material("KEEP-1", "Keeper", 5).await;
    let doomed_id = doomed["id"].as_str().expect("material id").to_string();

    let outbound = app
        .request_as(
            &app.operator,
            Method::POST,
            "/movements",
            Some(json!({ "type": "OUTBOUND", "quantity": 4, "materialId": doomed_id })),
        )
        .await;
    assert_eq!(outbound.status(), StatusCode::CREATED);

    let response = app
        .request_as(
            &app.admin,
            Method::DELETE,
            &format!("/materials/{doomed_id}"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let doomed_uuid = Uuid::parse_str(&doomed_id).expect("uuid");
    let orphaned = Movement::find()
        .filter(movement::Column::MaterialId.eq(doomed_uuid))
        .count(app.state.db.as_ref())
        .await
        .expect("count movements");
    assert_eq!(orphaned, 0);

    let listed = response_json(
        app.request_as(&app.viewer, Method::GET, "/movements", None)
            .await,
    )
    .await;
    let listed = listed.as_array().expect("movement list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["materialId"], keeper["id"]);
}
