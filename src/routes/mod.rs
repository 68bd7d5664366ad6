use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::chat::socket::ws_handler;
use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{
    self, admin, attendance, auth, events, organizer, participant, registration, teams,
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin-login", post(auth::admin_login))
        .route("/refresh", post(auth::refresh))
        .route("/reset-password-request", post(auth::reset_password_request));

    let admin_routes = Router::new()
        .route(
            "/organizers",
            post(admin::create_organizer).get(admin::list_organizers),
        )
        .route("/organizers/:id", delete(admin::delete_organizer))
        .route("/organizers/:id/archive", put(admin::archive_organizer))
        .route("/password-resets", get(admin::list_password_resets))
        .route("/password-resets/:id", put(admin::resolve_password_reset));

    let organizer_routes = Router::new()
        .route(
            "/events",
            post(events::create_event).get(events::list_events),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/attendance", get(attendance::attendance_list))
        .route("/events/:id/scan", post(attendance::scan_ticket))
        .route(
            "/events/:id/manual-override",
            post(attendance::manual_override),
        )
        .route("/events/:id/participants", get(events::event_participants))
        .route(
            "/profile",
            get(organizer::get_profile).put(organizer::update_profile),
        );

    let participant_routes = Router::new()
        .route("/onboarding-data", get(participant::onboarding_data))
        .route("/onboarding", post(participant::complete_onboarding))
        .route("/clubs", get(participant::list_clubs))
        .route("/clubs/:id", get(participant::club_details))
        .route("/clubs/:id/toggle", post(participant::toggle_club))
        .route(
            "/profile",
            get(participant::get_profile).put(participant::update_profile),
        )
        .route("/change-password", post(participant::change_password))
        .route("/events", get(participant::list_events))
        .route("/events/:id", get(participant::get_event))
        .route("/events/:id/register", post(registration::register))
        .route("/my-events", get(participant::my_events))
        .route("/tickets/:id/cancel", put(registration::cancel_ticket));

    let team_routes = Router::new()
        .route("/create", post(teams::create_team))
        .route("/join", post(teams::join_team))
        .route("/my-teams", get(teams::my_teams))
        .route("/:id/messages", get(teams::team_messages));

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/organizer", organizer_routes)
        .nest("/api/participant", participant_routes)
        .nest("/api/teams", team_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer());

    apply_security_headers(router).with_state(state)
}
