use axum::http::StatusCode;
use serde_json::json;

use parlor_core::AccountId;

use super::{create_room_as, developer_token, send_json, test_app, token_for};

#[tokio::test]
async fn reports_append_to_the_room_and_classify() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let reporter = token_for(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Busy Plaza").await;

    let report = format!("/room/{room_id}/report");
    let (status, body) = send_json(
        &harness.app,
        "POST",
        &report,
        Some(&reporter),
        Some(json!({ "reason": "spam stands" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["escalation"], "routine");

    let (status, body) = send_json(
        &harness.app,
        "POST",
        &report,
        Some(&reporter),
        Some(json!({
            "reason": "worse than spam",
            "alleges_illegal_content": true,
            "alleges_danger_to_life": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["escalation"], "illegal_content_and_danger_to_life");

    let record = harness
        .state
        .rooms
        .load(&room_id)
        .await
        .expect("room loads");
    assert_eq!(record.reports.len(), 2);
    assert_eq!(record.reports[0].reason, "spam stands");

    // Reports need a reason and an authenticated reporter.
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &report,
        Some(&reporter),
        Some(json!({ "reason": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &report,
        None,
        Some(json!({ "reason": "drive-by" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn suspension_is_developer_only_and_locks_the_room() {
    let harness = test_app();
    let creator = AccountId::new();
    let owner = token_for(&harness.state, creator);
    let developer = developer_token(&harness.state, AccountId::new());
    let stranger = token_for(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Night Den").await;
    let mut creator_rx = harness.state.notifier.register(creator).await;

    let suspend = format!("/room/{room_id}/moderation-suspend");
    let (status, body) = send_json(&harness.app, "POST", &suspend, Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send_json(
        &harness.app,
        "POST",
        &suspend,
        Some(&developer),
        Some(json!({ "note": "reported repeatedly" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Locked down: strangers now get the information-hiding 404.
    let info = format!("/room/{room_id}/info");
    let (status, _) = send_json(&harness.app, "GET", &info, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still sees the room, with the moderation notice.
    let (status, body) = send_json(&harness.app, "GET", &info, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["description"]
        .as_str()
        .expect("description")
        .contains("suspended"));

    let envelope = creator_rx.recv().await.expect("creator alerted");
    assert_eq!(envelope.t.as_str(), "room.suspended");

    let audit = format!("/room/{room_id}/audit");
    let (_, audit_body) = send_json(&harness.app, "GET", &audit, Some(&owner), None).await;
    assert_eq!(audit_body["events"][0]["event_type"], "room_suspended");
    assert_eq!(audit_body["events"][0]["note"], "reported repeatedly");
}

#[tokio::test]
async fn non_permanent_termination_strips_roles_but_keeps_the_document() {
    let harness = test_app();
    let creator = AccountId::new();
    let owner = token_for(&harness.state, creator);
    let developer = developer_token(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Back Alley").await;
    let mut creator_rx = harness.state.notifier.register(creator).await;

    let terminate = format!("/room/{room_id}/moderation-terminate?permanent=false");
    let (status, _) = send_json(&harness.app, "POST", &terminate, Some(&developer), None).await;
    assert_eq!(status, StatusCode::OK);

    let record = harness
        .state
        .rooms
        .load(&room_id)
        .await
        .expect("document survives");
    assert!(record.role_permissions.everyone().is_empty());
    assert!(record.user_permissions.is_empty());

    assert_eq!(
        creator_rx.recv().await.expect("alert").t.as_str(),
        "room.terminated"
    );
    assert_eq!(
        creator_rx.recv().await.expect("close").t.as_str(),
        "connection.close"
    );
}

#[tokio::test]
async fn permanent_termination_deletes_the_room_for_good() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let developer = developer_token(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Condemned").await;

    let terminate = format!("/room/{room_id}/moderation-terminate?permanent=true");
    let (status, body) = send_json(&harness.app, "POST", &terminate, Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send_json(&harness.app, "POST", &terminate, Some(&developer), None).await;
    assert_eq!(status, StatusCode::OK);

    let info = format!("/room/{room_id}/info");
    let (status, body) = send_json(&harness.app, "GET", &info, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    // A second strike finds nothing left to delete.
    let (status, _) = send_json(&harness.app, "POST", &terminate, Some(&developer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn developer_override_passes_room_permission_gates() {
    let harness = test_app();
    let owner = token_for(&harness.state, AccountId::new());
    let developer = developer_token(&harness.state, AccountId::new());
    let room_id = create_room_as(&harness.app, &owner, "Vault").await;

    // Owner hides the room from everyone.
    let update = format!("/room/{room_id}/roles/everyone/update");
    let (status, _) = send_json(
        &harness.app,
        "POST",
        &update,
        Some(&owner),
        Some(json!({ "viewAndJoin": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // A developer still sees it and can read the audit trail.
    let info = format!("/room/{room_id}/info");
    let (status, _) = send_json(&harness.app, "GET", &info, Some(&developer), None).await;
    assert_eq!(status, StatusCode::OK);
    let audit = format!("/room/{room_id}/audit");
    let (status, _) = send_json(&harness.app, "GET", &audit, Some(&developer), None).await;
    assert_eq!(status, StatusCode::OK);
}
