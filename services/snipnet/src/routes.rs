//! Route table

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handlers::{auth, health, snippets, users},
    middleware::{auth_gate, session_if_present},
};

/// Create the router for the snippet service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/signout", post(auth::signout))
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user_field)
                .delete(users::delete_user),
        )
        .route("/users/:id/snippets", get(users::list_user_snippets))
        .route("/snippets", post(snippets::create_snippet))
        .route(
            "/snippets/:id",
            put(snippets::update_snippet)
                .patch(snippets::update_snippet_field)
                .delete(snippets::delete_snippet),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_gate));

    let public_reads = Router::new()
        .route("/snippets", get(snippets::list_snippets))
        .route("/snippets/:id", get(snippets::get_snippet))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_if_present,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route(
            "/oauth/github",
            get(auth::github_authorize).post(auth::github_callback),
        )
        .merge(public_reads)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
