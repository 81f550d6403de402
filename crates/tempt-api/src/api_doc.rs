//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use tempt_core::{access, models};

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tempt API",
        version = "0.1.0",
        description = "AI image and video generation gallery: generation jobs, public gallery, votes and comments, plans and nuts billing, moderation. All endpoints are versioned under /api/v1/."
    ),
    paths(
        // Generation
        handlers::generation::generate_images,
        handlers::generation::generate_video,
        handlers::generation::task_status,
        handlers::generation::generation_callback,
        // Gallery
        handlers::gallery::list_gallery,
        handlers::gallery::get_image,
        handlers::gallery::update_image,
        handlers::gallery::delete_image,
        handlers::gallery::my_images,
        handlers::gallery::get_video,
        handlers::gallery::my_videos,
        handlers::categories::list_categories,
        // Social
        handlers::social::vote,
        handlers::social::list_comments,
        handlers::social::add_comment,
        handlers::social::delete_comment,
        // Billing
        handlers::billing::list_plans,
        handlers::billing::my_subscription,
        handlers::billing::subscribe,
        handlers::billing::cancel_subscription,
        handlers::billing::check_feature,
        // Profile
        handlers::profile::create_profile,
        handlers::profile::get_profile,
        handlers::profile::nuts_history,
        // Admin
        handlers::admin::list_users,
        handlers::admin::ban_user,
        handlers::admin::unban_user,
        handlers::admin::suspend_user,
        handlers::admin::unsuspend_user,
        handlers::admin::grant_nuts,
        handlers::admin::remove_image,
        handlers::admin::hide_comment,
        handlers::admin::create_category,
    ),
    components(
        schemas(
            models::ImageResponse,
            models::VideoResponse,
            models::GenerationStatus,
            models::GenerationKind,
            models::PlanTier,
            models::BillingCycle,
            models::NutsTransactionKind,
            access::Feature,
            access::DenialReason,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "generations", description = "Queue image and video generation and follow their status"),
        (name = "gallery", description = "Public gallery, personal libraries and categories"),
        (name = "social", description = "Votes and comments"),
        (name = "billing", description = "Plans, subscriptions and feature access"),
        (name = "profile", description = "Profile and nuts ledger"),
        (name = "admin", description = "User management and moderation"),
    )
)]
pub struct ApiDoc;
