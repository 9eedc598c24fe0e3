use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, StatusCode},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{
    core::{AppConfig, AppState},
    handlers::{
        moderation::{moderation_suspend, moderation_terminate, submit_report},
        roles::{
            create_role_handler, delete_role_handler, get_permissions, list_audit, my_permissions,
            set_user_role_handler, update_role_handler,
        },
        rooms::{
            create_room, room_info, search_rooms, set_cover_image, update_content_flags,
            update_description, update_tags,
        },
        subrooms::{create_subroom, delete_subroom, set_home_subroom, set_max_players},
        versions::{
            associate_data_handler, create_version_handler, download_version, list_versions,
            set_public_version_handler,
        },
    },
    types::health,
};

/// Build the axum router with global security middleware.
///
/// # Errors
/// Returns an error if configured limits are invalid.
pub fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    let app_state = AppState::new(config)?;
    build_router_with_state(config, app_state)
}

pub(crate) fn build_router_with_state(
    config: &AppConfig,
    app_state: AppState,
) -> anyhow::Result<Router> {
    if config.max_payload_bytes == 0 {
        return Err(anyhow!("max payload bytes must be at least 1 byte"));
    }
    if config.max_created_rooms_per_account == 0 {
        return Err(anyhow!(
            "max created rooms per account must be at least 1 room"
        ));
    }
    if config.max_subrooms_per_room == 0 {
        return Err(anyhow!("max subrooms per room must be at least 1 subroom"));
    }
    if config.max_roles_per_room == 0 {
        return Err(anyhow!("max roles per room must be at least 1 role"));
    }
    if config.max_search_results == 0 {
        return Err(anyhow!("max search results must be at least 1 record"));
    }
    if config.audit_list_limit == 0 {
        return Err(anyhow!(
            "audit list limit must be at least 1 record per request"
        ));
    }
    if config.request_timeout < Duration::from_millis(1) {
        return Err(anyhow!("request timeout must be at least 1 millisecond"));
    }

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .period(Duration::from_secs(60))
            .burst_size(config.rate_limit_requests_per_minute)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("invalid governor configuration"))?,
    );
    let governor_layer = GovernorLayer::new(governor_config);
    let request_id_header = HeaderName::from_static("x-request-id");

    let routes = Router::new()
        .route("/health", get(health))
        .route("/new", post(create_room))
        .route("/search", get(search_rooms))
        .route("/room/{room_id}/info", get(room_info))
        .route("/room/{room_id}/tags", post(update_tags))
        .route("/room/{room_id}/description", post(update_description))
        .route("/room/{room_id}/content_flags", post(update_content_flags))
        .route(
            "/room/{room_id}/cover-image/set/{image_id}",
            post(set_cover_image),
        )
        .route("/room/{room_id}/permissions", get(get_permissions))
        .route("/room/{room_id}/my-permissions", get(my_permissions))
        .route("/room/{room_id}/audit", get(list_audit))
        .route("/room/{room_id}/roles/new", put(create_role_handler))
        .route("/room/{room_id}/roles/{role}/update", post(update_role_handler))
        .route("/room/{room_id}/roles/{role}/delete", post(delete_role_handler))
        .route(
            "/room/{room_id}/user/{user_id}/set-role/{role}",
            post(set_user_role_handler),
        )
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/create",
            post(create_subroom),
        )
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/delete",
            post(delete_subroom),
        )
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/set-max-players/{max_players}",
            post(set_max_players),
        )
        .route(
            "/room/{room_id}/set-home-subroom/{subroom_id}",
            post(set_home_subroom),
        )
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/versions",
            get(list_versions),
        )
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/versions/new",
            put(create_version_handler),
        )
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/versions/{version_id}/set-public",
            post(set_public_version_handler),
        )
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/versions/{version_id}/download",
            get(download_version),
        )
        .route("/room/{room_id}/report", post(submit_report))
        .route("/room/{room_id}/moderation-suspend", post(moderation_suspend))
        .route(
            "/room/{room_id}/moderation-terminate",
            post(moderation_terminate),
        );

    // Version payloads arrive as base64 text bodies far above the JSON
    // limit; the handler enforces the decoded-size cap itself.
    let upload_routes = Router::new()
        .route(
            "/room/{room_id}/subrooms/{subroom_id}/versions/{version_id}/associate-data",
            post(associate_data_handler),
        )
        .layer(DefaultBodyLimit::disable());

    Ok(routes
        .merge(upload_routes)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
                .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout,
                ))
                .layer(governor_layer),
        ))
}
