//! Route groups, split by how callers authenticate.

use crate::auth::middleware::{require_admin, require_moderator};
use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::sync::Arc;

fn path(suffix: &str) -> String {
    format!("{}{}", API_PREFIX, suffix)
}

/// Readable without a token; a token, when sent, widens what is visible.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&path("/images"), get(handlers::gallery::list_gallery))
        .route(&path("/images/{id}"), get(handlers::gallery::get_image))
        .route(
            &path("/images/{id}/comments"),
            get(handlers::social::list_comments),
        )
        .route(&path("/videos/{id}"), get(handlers::gallery::get_video))
        .route(&path("/categories"), get(handlers::categories::list_categories))
        .route(&path("/plans"), get(handlers::billing::list_plans))
}

/// Staff layers look up the caller, so they take the state up front.
pub fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(generation_routes())
        .merge(gallery_routes())
        .merge(social_routes())
        .merge(account_routes())
        .merge(moderation_routes(state.clone()))
        .merge(admin_routes(state))
}

/// Provider webhooks, authenticated by shared secret instead of a JWT.
pub fn callback_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &path("/generations/callback"),
            post(handlers::generation::generation_callback),
        )
        .route(&path("/subscriptions"), post(handlers::billing::subscribe))
}

fn generation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &path("/generations/images"),
            post(handlers::generation::generate_images),
        )
        .route(
            &path("/generations/videos"),
            post(handlers::generation::generate_video),
        )
        .route(
            &path("/generations/{task_id}/status"),
            get(handlers::generation::task_status),
        )
}

fn gallery_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &path("/images/{id}"),
            patch(handlers::gallery::update_image).delete(handlers::gallery::delete_image),
        )
        .route(&path("/me/images"), get(handlers::gallery::my_images))
        .route(&path("/me/videos"), get(handlers::gallery::my_videos))
}

fn social_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&path("/images/{id}/vote"), post(handlers::social::vote))
        .route(
            &path("/images/{id}/comments"),
            post(handlers::social::add_comment),
        )
        .route(
            &path("/comments/{id}"),
            delete(handlers::social::delete_comment),
        )
}

fn account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &path("/me"),
            get(handlers::profile::get_profile).post(handlers::profile::create_profile),
        )
        .route(&path("/me/nuts"), get(handlers::profile::nuts_history))
        .route(
            &path("/me/subscription"),
            get(handlers::billing::my_subscription),
        )
        .route(
            &path("/subscriptions/cancel"),
            post(handlers::billing::cancel_subscription),
        )
        .route(
            &path("/features/{feature}"),
            get(handlers::billing::check_feature),
        )
}

fn moderation_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &path("/admin/images/{id}"),
            delete(handlers::admin::remove_image),
        )
        .route(
            &path("/admin/comments/{id}/hide"),
            post(handlers::admin::hide_comment),
        )
        .route_layer(from_fn_with_state(state, require_moderator))
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(&path("/admin/users"), get(handlers::admin::list_users))
        .route(&path("/admin/users/{id}/ban"), post(handlers::admin::ban_user))
        .route(
            &path("/admin/users/{id}/unban"),
            post(handlers::admin::unban_user),
        )
        .route(
            &path("/admin/users/{id}/suspend"),
            post(handlers::admin::suspend_user),
        )
        .route(
            &path("/admin/users/{id}/unsuspend"),
            post(handlers::admin::unsuspend_user),
        )
        .route(
            &path("/admin/users/{id}/nuts"),
            post(handlers::admin::grant_nuts),
        )
        .route(
            &path("/admin/categories"),
            post(handlers::admin::create_category),
        )
        .route_layer(from_fn_with_state(state, require_admin))
}
