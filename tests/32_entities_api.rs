mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use atrium_api::store::RecordStore;
use common::{backend, bearer, get_json, request_json, seed_member};

#[tokio::test]
async fn list_requires_a_bearer_token() -> Result<()> {
    let backend = backend();
    let (status, body) = get_json(&backend.router, "/api/branches", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn unknown_entities_are_not_found() -> Result<()> {
    let backend = backend();
    let user = Uuid::new_v4();
    let token = bearer(user);
    let (status, body) = get_json(&backend.router, "/api/widgets", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn owner_can_create_and_list_branches() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, true, &[]).await;
    let token = bearer(user);

    let (status, body) = request_json(
        &backend.router,
        Method::POST,
        "/api/branches",
        Some(&token),
        Some(json!({"organisation_id": org.to_string(), "name": "Acme HQ"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Acme HQ");
    assert!(body["data"]["id"].is_string());
    assert!(body["data"]["created_at"].is_string());

    let uri = format!("/api/branches?organisation_id={}", org);
    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["totalPages"], 1);
    assert_eq!(body["pagination"]["hasNext"], false);
    assert_eq!(body["pagination"]["hasPrev"], false);
    Ok(())
}

#[tokio::test]
async fn pagination_envelope_matches_the_wire_contract() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, false, &["branch:view"]).await;
    for i in 0..25 {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, i).unwrap();
        backend
            .store
            .seed(
                "branches",
                json!({"organisation_id": org.to_string(), "name": format!("Branch {:02}", i)}),
                created,
            )
            .await?;
    }
    let token = bearer(user);

    let uri = format!("/api/branches?organisation_id={}&page=3&limit=10", org);
    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["total"], 25);
    assert_eq!(body["pagination"]["page"], 3);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["totalPages"], 3);
    assert_eq!(body["pagination"]["hasNext"], false);
    assert_eq!(body["pagination"]["hasPrev"], true);

    // Beyond the last page: empty items, same metadata, not an error.
    let uri = format!("/api/branches?organisation_id={}&page=5&limit=10", org);
    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total"], 25);
    Ok(())
}

#[tokio::test]
async fn search_narrows_the_list() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, false, &["branch:view"]).await;
    for name in ["Acme Corp", "Beta Works", "Acme North"] {
        backend
            .store
            .insert("branches", json!({"organisation_id": org.to_string(), "name": name}))
            .await?;
    }
    let token = bearer(user);

    let uri = format!("/api/branches?organisation_id={}&search=me%20cor", org);
    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["name"], "Acme Corp");
    Ok(())
}

#[tokio::test]
async fn invalid_pagination_parameters_are_rejected() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, true, &[]).await;
    let token = bearer(user);

    for query in ["limit=0", "page=-1", "page=abc"] {
        let uri = format!("/api/branches?organisation_id={}&{}", org, query);
        let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query {:?}: {}", query, body);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_filter_keys_are_rejected() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, true, &[]).await;
    let token = bearer(user);

    let uri = format!("/api/branches?organisation_id={}&favourite_colour=red", org);
    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn scoped_lists_require_an_organisation_filter() -> Result<()> {
    let backend = backend();
    let user = Uuid::new_v4();
    let token = bearer(user);

    let (status, body) = get_json(&backend.router, "/api/branches", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn view_permission_does_not_grant_create() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, false, &["branch:view"]).await;
    let token = bearer(user);

    let uri = format!("/api/branches?organisation_id={}", org);
    let (status, _) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request_json(
        &backend.router,
        Method::POST,
        "/api/branches",
        Some(&token),
        Some(json!({"organisation_id": org.to_string(), "name": "Acme HQ"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn non_members_are_forbidden() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    // No membership seeded for this user.
    let token = bearer(user);

    let uri = format!("/api/branches?organisation_id={}", org);
    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn fetch_update_delete_round_trip() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, true, &[]).await;
    let token = bearer(user);

    let (_, created) = request_json(
        &backend.router,
        Method::POST,
        "/api/tickets",
        Some(&token),
        Some(json!({
            "organisation_id": org.to_string(),
            "status": "open",
            "priority": "high",
            "subject": "Printer on fire"
        })),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/tickets/{}", id);
    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "open");

    let (status, body) = request_json(
        &backend.router,
        Method::PATCH,
        &uri,
        Some(&token),
        Some(json!({"status": "closed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "closed");
    assert_eq!(body["data"]["subject"], "Printer on fire");

    let (status, _) = request_json(&backend.router, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn malformed_record_ids_are_a_validation_error() -> Result<()> {
    let backend = backend();
    let user = Uuid::new_v4();
    let token = bearer(user);

    let (status, body) = get_json(&backend.router, "/api/branches/not-a-uuid", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn tickets_search_their_status_field() -> Result<()> {
    let backend = backend();
    let org = Uuid::new_v4();
    let user = Uuid::new_v4();
    seed_member(&backend.store, org, user, false, &["ticket:view"]).await;
    for (status_field, priority) in [("open", "high"), ("closed", "low"), ("reopened", "high")] {
        backend
            .store
            .insert(
                "tickets",
                json!({
                    "organisation_id": org.to_string(),
                    "status": status_field,
                    "priority": priority
                }),
            )
            .await?;
    }
    let token = bearer(user);

    // "open" is a substring of both "open" and "reopened".
    let uri = format!("/api/tickets?organisation_id={}&search=OPEN", org);
    let (_, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(body["pagination"]["total"], 2);

    // The search term ANDs with equality filters.
    let uri = format!("/api/tickets?organisation_id={}&search=OPEN&priority=high", org);
    let (_, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(body["pagination"]["total"], 2);

    let uri = format!("/api/tickets?organisation_id={}&search=closed&priority=high", org);
    let (_, body) = get_json(&backend.router, &uri, Some(&token)).await;
    assert_eq!(body["pagination"]["total"], 0);
    Ok(())
}
