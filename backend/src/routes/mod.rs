//! Route definitions for the course platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Function endpoints mounted under `/functions/v1`; POST only
pub fn function_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/uddoktapay-checkout", post(handlers::payment::checkout))
        .route("/uddoktapay-verify", post(handlers::payment::verify))
        .route(
            "/verify-certificate",
            post(handlers::certificate::verify_certificate),
        )
        .route(
            "/email-inbound-webhook",
            post(handlers::email_inbound::inbound_webhook),
        );

    let protected = Router::new()
        .route("/sign-upload", post(handlers::upload::sign_upload))
        .route(
            "/student-enrollment-notify",
            post(handlers::notify::enrollment_notify),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

/// REST API mounted under `/api/v1`
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/profiles", profile_routes())
        .merge(course_admin_routes())
        .route("/videos/:video_id", put(handlers::video::update_video).delete(handlers::video::delete_video))
        .nest("/passcodes", passcode_routes())
        .route("/my/courses", get(handlers::enrollment::my_courses))
        .route("/my/certificates", get(handlers::certificate::my_certificates))
        .route("/enrollments", post(handlers::enrollment::enroll_manual))
        .nest("/progress", progress_routes())
        .route(
            "/certificates",
            get(handlers::certificate::list_certificates).post(handlers::certificate::issue_certificate),
        )
        .merge(finance_routes())
        .nest("/tickets", ticket_routes())
        .nest("/email-threads", email_thread_routes())
        .nest("/content", content_admin_routes())
        .route("/realtime", get(handlers::realtime::subscribe))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public_routes().merge(protected)
}

/// Unauthenticated routes
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/courses", get(handlers::course::list_published))
        .route("/courses/:course", get(handlers::course::get_by_slug))
        .route("/content/team", get(handlers::content::list_team))
        .route("/content/works", get(handlers::content::list_works))
        .route("/content/footer", get(handlers::content::get_footer))
        .route("/content/pages/:page", get(handlers::content::get_page))
}

fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::profile::list_profiles))
        .route(
            "/me",
            get(handlers::profile::get_me).put(handlers::profile::update_me),
        )
        .route("/:profile_id/role", put(handlers::profile::set_role))
        .route("/:profile_id/active", put(handlers::profile::set_active))
}

/// Course and video management; merged so `/courses/:course` shares its
/// path node with the public slug lookup
fn course_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", post(handlers::course::create_course))
        .route("/courses/manage", get(handlers::course::list_managed))
        .route(
            "/courses/:course",
            put(handlers::course::update_course).delete(handlers::course::delete_course),
        )
        .route(
            "/courses/:course/videos",
            get(handlers::video::list_videos).post(handlers::video::create_video),
        )
}

fn passcode_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::passcode::list_passcodes).post(handlers::passcode::create_passcode),
        )
        .route("/redeem", post(handlers::passcode::redeem))
        .route("/:passcode_id/active", put(handlers::passcode::set_active))
}

fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::progress::list_progress))
        .route("/:video_id", put(handlers::progress::upsert_progress))
        .route(
            "/courses/:course_id/summary",
            get(handlers::progress::course_summary),
        )
}

fn finance_routes() -> Router<AppState> {
    Router::new()
        .route("/revenue", get(handlers::finance::list_revenue))
        .route("/revenue/summary", get(handlers::finance::revenue_summary))
        .route("/revenue/export", get(handlers::finance::export_revenue))
        .route(
            "/paid-works",
            get(handlers::finance::list_paid_works).post(handlers::finance::create_paid_work),
        )
        .route(
            "/withdrawals",
            get(handlers::finance::list_withdrawals).post(handlers::finance::request_withdrawal),
        )
        .route(
            "/withdrawals/:withdrawal_id/status",
            put(handlers::finance::set_withdrawal_status),
        )
}

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::support::list_tickets).post(handlers::support::create_ticket),
        )
        .route("/:ticket_id", put(handlers::support::update_ticket))
}

fn email_thread_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::email_inbound::list_threads))
        .route("/:thread_id", get(handlers::email_inbound::get_thread))
        .route("/:thread_id/reply", post(handlers::email_inbound::reply))
        .route(
            "/:thread_id/status",
            put(handlers::email_inbound::set_thread_status),
        )
}

fn content_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/team", post(handlers::content::create_team_member))
        .route(
            "/team/:id",
            put(handlers::content::update_team_member).delete(handlers::content::delete_team_member),
        )
        .route("/works", post(handlers::content::create_work))
        .route(
            "/works/:id",
            put(handlers::content::update_work).delete(handlers::content::delete_work),
        )
        .route("/footer/links", post(handlers::content::create_footer_link))
        .route(
            "/footer/links/:id",
            put(handlers::content::update_footer_link).delete(handlers::content::delete_footer_link),
        )
        .route("/footer/:key", put(handlers::content::set_footer_content))
        .route(
            "/pages/:page/:section",
            put(handlers::content::set_page_section),
        )
}
