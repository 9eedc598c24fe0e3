use axum::http::StatusCode;
use serde_json::json;

use parlor_core::AccountId;

use super::{create_room_as, send_json, test_app, token_for};

#[tokio::test]
async fn create_and_fetch_info_counts_visits() {
    let harness = test_app();
    let creator = AccountId::new();
    let token = token_for(&harness.state, creator);

    let room_id = create_room_as(&harness.app, &token, "The Grand Atrium").await;

    let uri = format!("/room/{room_id}/info");
    let (status, body) = send_json(&harness.app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "The Grand Atrium");
    assert_eq!(body["creator_id"], creator.to_string());
    assert_eq!(body["home_subroom_id"], "home");
    assert_eq!(body["subrooms"][0]["name"], "home");
    assert_eq!(body["visits"], 1);

    // Anonymous viewers resolve to `everyone`, which can view by default.
    let (status, body) = send_json(&harness.app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["visits"], 2);
}

#[tokio::test]
async fn room_names_are_unique_per_creator_only() {
    let harness = test_app();
    let alice = token_for(&harness.state, AccountId::new());
    let bob = token_for(&harness.state, AccountId::new());

    create_room_as(&harness.app, &alice, "Lounge").await;
    let (status, body) = send_json(
        &harness.app,
        "POST",
        "/new",
        Some(&alice),
        Some(json!({ "name": "Lounge" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "room_name_taken");

    create_room_as(&harness.app, &bob, "Lounge").await;
}

#[tokio::test]
async fn invalid_room_names_and_missing_auth_are_rejected() {
    let harness = test_app();
    let token = token_for(&harness.state, AccountId::new());

    let (status, body) = send_json(
        &harness.app,
        "POST",
        "/new",
        Some(&token),
        Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _) = send_json(
        &harness.app,
        "POST",
        "/new",
        None,
        Some(json!({ "name": "Lounge" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn hidden_rooms_are_indistinguishable_from_absent_ones() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let stranger = token_for(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Hidden Den").await;

    // Owner turns off everyone's view access.
    let uri = format!("/room/{room_id}/roles/everyone/update");
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &uri,
        Some(&owner),
        Some(json!({ "viewAndJoin": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let info = format!("/room/{room_id}/info");
    let (status, body) = send_json(&harness.app, "GET", &info, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    let (status, _) = send_json(&harness.app, "GET", &info, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still sees the room.
    let (status, _) = send_json(&harness.app, "GET", &info, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metadata_updates_require_manage_metadata_and_are_audited() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let stranger = token_for(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Gallery").await;

    let tags_uri = format!("/room/{room_id}/tags");
    let (status, body) = send_json(
        &harness.app,
        "POST",
        &tags_uri,
        Some(&stranger),
        Some(json!({ "tags": ["art"] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send_json(
        &harness.app,
        "POST",
        &tags_uri,
        Some(&owner),
        Some(json!({ "tags": ["art", "social"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let description_uri = format!("/room/{room_id}/description");
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &description_uri,
        Some(&owner),
        Some(json!({ "description": "A quiet gallery." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let flags_uri = format!("/room/{room_id}/content_flags");
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &flags_uri,
        Some(&owner),
        Some(json!({ "nsfw": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let info_uri = format!("/room/{room_id}/info");
    let (_, info) = send_json(&harness.app, "GET", &info_uri, Some(&owner), None).await;
    assert_eq!(info["tags"], json!(["art", "social"]));
    assert_eq!(info["description"], "A quiet gallery.");
    assert_eq!(info["content_flags"]["nsfw"], true);

    let audit_uri = format!("/room/{room_id}/audit");
    let (status, audit) = send_json(&harness.app, "GET", &audit_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = audit["events"]
        .as_array()
        .expect("events array")
        .iter()
        .map(|event| event["event_type"].as_str().expect("event type"))
        .collect();
    assert_eq!(
        kinds,
        vec![
            "content_flags_updated",
            "description_updated",
            "tags_updated",
            "room_created",
        ]
    );
}

#[tokio::test]
async fn cover_image_requires_a_well_formed_image_id() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Gallery").await;

    let bad = format!("/room/{room_id}/cover-image/set/not-an-id");
    let (status, _) = send_json(&harness.app, "POST", &bad, Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let image_id = ulid::Ulid::new().to_string();
    let good = format!("/room/{room_id}/cover-image/set/{image_id}");
    let (status, _) = send_json(&harness.app, "POST", &good, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let info = format!("/room/{room_id}/info");
    let (_, body) = send_json(&harness.app, "GET", &info, Some(&owner), None).await;
    assert_eq!(body["cover_image_id"], image_id);
}

#[tokio::test]
async fn search_modes_filter_and_order_visible_rooms() {
    let harness = test_app();
    let alice_id = AccountId::new();
    let alice = token_for(&harness.state, alice_id);
    let bob = token_for(&harness.state, AccountId::new());

    let cafe = create_room_as(&harness.app, &alice, "Night Cafe").await;
    create_room_as(&harness.app, &alice, "Observatory").await;
    create_room_as(&harness.app, &bob, "Night Market").await;

    // Drive some visits toward the cafe.
    let info = format!("/room/{cafe}/info");
    for _ in 0..3 {
        let (status, _) = send_json(&harness.app, "GET", &info, None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) =
        send_json(&harness.app, "GET", "/search?mode=search&query=night", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["rooms"]
        .as_array()
        .expect("rooms array")
        .iter()
        .map(|room| room["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["Night Cafe", "Night Market"]);

    let (_, body) = send_json(&harness.app, "GET", "/search?mode=most-visited", None, None).await;
    assert_eq!(body["rooms"][0]["name"], "Night Cafe");
    assert_eq!(body["rooms"][0]["visits"], 3);

    let (status, _) = send_json(&harness.app, "GET", "/search?mode=mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = send_json(&harness.app, "GET", "/search?mode=mine", Some(&alice), None).await;
    let mine: Vec<&str> = body["rooms"]
        .as_array()
        .expect("rooms array")
        .iter()
        .map(|room| room["creator_id"].as_str().expect("creator"))
        .collect();
    assert!(mine.iter().all(|creator| *creator == alice_id.to_string()));
    assert_eq!(mine.len(), 2);

    let (_, body) = send_json(&harness.app, "GET", "/search?mode=originals", None, None).await;
    assert_eq!(body["rooms"][0]["name"], "Night Cafe");
}

#[tokio::test]
async fn subroom_lifecycle_preserves_the_home_invariant() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Hub").await;

    // The home subroom cannot be deleted.
    let delete_home = format!("/room/{room_id}/subrooms/home/delete");
    let (status, body) = send_json(&harness.app, "POST", &delete_home, Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let create = format!("/room/{room_id}/subrooms/lounge/create");
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &create,
        Some(&owner),
        Some(json!({ "max_players": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send_json(&harness.app, "POST", &create, Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "subroom_already_exists");

    let resize = format!("/room/{room_id}/subrooms/lounge/set-max-players/32");
    let (status, _) = send_json(&harness.app, "POST", &resize, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let oversize = format!("/room/{room_id}/subrooms/lounge/set-max-players/100000");
    let (status, _) = send_json(&harness.app, "POST", &oversize, Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Re-home the room, after which the old home becomes deletable.
    let rehome = format!("/room/{room_id}/set-home-subroom/lounge");
    let (status, _) = send_json(&harness.app, "POST", &rehome, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_json(&harness.app, "POST", &delete_home, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let info = format!("/room/{room_id}/info");
    let (_, body) = send_json(&harness.app, "GET", &info, Some(&owner), None).await;
    assert_eq!(body["home_subroom_id"], "lounge");
    assert_eq!(body["subrooms"].as_array().expect("subrooms").len(), 1);

    let missing = format!("/room/{room_id}/set-home-subroom/attic");
    let (status, _) = send_json(&harness.app, "POST", &missing, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
