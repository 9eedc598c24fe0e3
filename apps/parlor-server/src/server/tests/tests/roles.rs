use axum::http::StatusCode;
use serde_json::json;

use parlor_core::AccountId;

use super::{create_room_as, send_json, test_app, token_for};

#[tokio::test]
async fn reserved_role_names_cannot_be_created() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Workshop").await;

    let uri = format!("/room/{room_id}/roles/new");
    for reserved in ["owner", "everyone", "Owner"] {
        let (status, body) = send_json(
            &harness.app,
            "PUT",
            &uri,
            Some(&owner),
            Some(json!({ "name": reserved })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "reserved_role");
    }

    let (status, _) = send_json(
        &harness.app,
        "PUT",
        &uri,
        Some(&owner),
        Some(json!({ "name": "builder" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &harness.app,
        "PUT",
        &uri,
        Some(&owner),
        Some(json!({ "name": "builder" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "role_already_exists");
}

#[tokio::test]
async fn delegation_is_capped_at_the_granter_own_permissions() {
    let harness = test_app();
    let creator = AccountId::new();
    let manager = AccountId::new();
    let owner = token_for(&harness.state, creator);
    let manager_token = token_for(&harness.state, manager);
    let room_id = create_room_as(&harness.app, &owner, "Workshop").await;

    // Owner creates two roles and gives the manager one with
    // manageSubrooms + managePermissions-free grant set.
    for role in ["staff", "builder"] {
        let uri = format!("/room/{room_id}/roles/new");
        let (status, _) = send_json(
            &harness.app,
            "PUT",
            &uri,
            Some(&owner),
            Some(json!({ "name": role })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let staff_update = format!("/room/{room_id}/roles/staff/update");
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &staff_update,
        Some(&owner),
        Some(json!({
            "viewAndJoin": true,
            "manageSubrooms": true,
            "managePermissions": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let assign = format!("/room/{room_id}/user/{manager}/set-role/staff");
    let (status, _) = send_json(&harness.app, "POST", &assign, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    // Strip managePermissions from what the manager holds indirectly: the
    // staff role keeps manageSubrooms + managePermissions, so granting
    // manageSubrooms works but granting manageMetadata (not held) fails.
    let builder_update = format!("/room/{room_id}/roles/builder/update");
    let (status, body) = send_json(
        &harness.app,
        "POST",
        &builder_update,
        Some(&manager_token),
        Some(json!({ "manageMetadata": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send_json(
        &harness.app,
        "POST",
        &builder_update,
        Some(&manager_token),
        Some(json!({ "manageSubrooms": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The owner role row is never editable.
    let owner_update = format!("/room/{room_id}/roles/owner/update");
    let (status, body) = send_json(
        &harness.app,
        "POST",
        &owner_update,
        Some(&owner),
        Some(json!({ "viewAndJoin": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reserved_role");

    // Unknown keys are rejected wholesale rather than filtered.
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &builder_update,
        Some(&owner),
        Some(json!({ "__proto__": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn deleting_a_role_reassigns_members_to_everyone() {
    let harness = test_app();
    let creator = AccountId::new();
    let member = AccountId::new();
    let owner = token_for(&harness.state, creator);
    let room_id = create_room_as(&harness.app, &owner, "Workshop").await;

    let create = format!("/room/{room_id}/roles/new");
    let (status, _) = send_json(
        &harness.app,
        "PUT",
        &create,
        Some(&owner),
        Some(json!({ "name": "builder" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let assign = format!("/room/{room_id}/user/{member}/set-role/builder");
    let (status, _) = send_json(&harness.app, "POST", &assign, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let permissions = format!("/room/{room_id}/permissions");
    let (_, body) = send_json(&harness.app, "GET", &permissions, Some(&owner), None).await;
    assert_eq!(body["user_permissions"][member.to_string()], "builder");

    let delete = format!("/room/{room_id}/roles/builder/delete");
    let (status, _) = send_json(&harness.app, "POST", &delete, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send_json(&harness.app, "GET", &permissions, Some(&owner), None).await;
    assert!(body["user_permissions"]
        .as_object()
        .expect("user permissions map")
        .is_empty());
    assert!(body["role_permissions"]["builder"].is_null());
    assert_eq!(body["role_permissions"]["owner"]["managePermissions"], true);

    let audit_uri = format!("/room/{room_id}/audit");
    let (_, audit) = send_json(&harness.app, "GET", &audit_uri, Some(&owner), None).await;
    let deletions = audit["events"]
        .as_array()
        .expect("events array")
        .iter()
        .filter(|event| event["event_type"] == "role_deleted")
        .count();
    assert_eq!(deletions, 1);

    // Reserved roles can never be deleted.
    for reserved in ["owner", "everyone"] {
        let uri = format!("/room/{room_id}/roles/{reserved}/delete");
        let (status, body) = send_json(&harness.app, "POST", &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "reserved_role");
    }
}

#[tokio::test]
async fn role_assignment_guards_hold_over_http() {
    let harness = test_app();
    let creator = AccountId::new();
    let member = AccountId::new();
    let owner = token_for(&harness.state, creator);
    let room_id = create_room_as(&harness.app, &owner, "Workshop").await;

    // owner cannot be granted through the assignment API.
    let grant_owner = format!("/room/{room_id}/user/{member}/set-role/owner");
    let (status, body) = send_json(&harness.app, "POST", &grant_owner, Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "reserved_role");

    // The creator can never be reassigned.
    let demote_creator = format!("/room/{room_id}/user/{creator}/set-role/everyone");
    let (status, _) = send_json(&harness.app, "POST", &demote_creator, Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Assigning an unknown named role dangles nothing.
    let ghost = format!("/room/{room_id}/user/{member}/set-role/ghost");
    let (status, _) = send_json(&harness.app, "POST", &ghost, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn my_permissions_reflects_the_resolved_role() {
    let harness = test_app();
    let creator = AccountId::new();
    let member = AccountId::new();
    let owner = token_for(&harness.state, creator);
    let member_token = token_for(&harness.state, member);
    let room_id = create_room_as(&harness.app, &owner, "Workshop").await;

    let mine = format!("/room/{room_id}/my-permissions");
    let (status, body) = send_json(&harness.app, "GET", &mine, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "owner");
    assert_eq!(body["permissions"]["managePermissions"], true);

    let (status, body) = send_json(&harness.app, "GET", &mine, Some(&member_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "everyone");
    assert_eq!(body["permissions"]["viewAndJoin"], true);
    assert_eq!(body["permissions"]["managePermissions"], false);

    // The full permission table is a management read.
    let table = format!("/room/{room_id}/permissions");
    let (status, _) = send_json(&harness.app, "GET", &table, Some(&member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
