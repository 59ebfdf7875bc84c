use crate::{
    api::{leave_entitlement, leave_request},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter allowing `requests_per_min` with the same burst.
pub fn build_limiter(requests_per_min: u32) -> Option<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: Arc<Limiter>) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .configure(leave_routes),
    );
}

/// Leave endpoints, relative to the API prefix.
pub fn leave_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/entitlements")
            // /entitlements
            .service(
                web::resource("")
                    .route(web::get().to(leave_entitlement::list_entitlements))
                    .route(web::post().to(leave_entitlement::assign_entitlement)),
            )
            // /entitlements/{id}
            .service(
                web::resource("/{id}")
                    .route(web::get().to(leave_entitlement::get_entitlement))
                    .route(web::delete().to(leave_entitlement::delete_entitlement)),
            ),
    )
    .service(
        web::scope("/leave-requests")
            // /leave-requests
            .service(
                web::resource("")
                    .route(web::get().to(leave_request::leave_list))
                    .route(web::post().to(leave_request::create_leave)),
            )
            // /leave-requests/action
            .service(
                web::resource("/action").route(web::post().to(leave_request::leave_action)),
            )
            // /leave-requests/balance
            .service(
                web::resource("/balance").route(web::get().to(leave_request::leave_balance)),
            )
            // /leave-requests/{id}
            .service(
                web::resource("/{id:\\d+}").route(web::get().to(leave_request::get_leave)),
            ),
    );
}
