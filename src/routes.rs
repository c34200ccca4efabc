// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempts, auth, leaderboard, questions, quizzes, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes, questions, attempts, leaderboard, users, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Quiz creation and the creator's own listing are admin-gated at the
    // route level; update/delete stay creator-or-admin in the handler.
    let quiz_routes = Router::new()
        .route("/", get(quizzes::list_quizzes))
        .route("/topics", get(quizzes::get_topics))
        .route("/topic/{topic}", get(quizzes::get_quizzes_by_topic))
        .route(
            "/{id}",
            get(quizzes::get_quiz)
                .put(quizzes::update_quiz)
                .delete(quizzes::delete_quiz),
        )
        .merge(
            Router::new()
                .route("/", post(quizzes::create_quiz))
                .route("/my-quizzes", get(quizzes::my_quizzes))
                .route_layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route(
            "/{id}",
            get(questions::get_question).delete(questions::delete_question),
        )
        .route("/quiz/{quiz_id}", get(questions::get_questions_by_quiz))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let attempt_routes = Router::new()
        .route("/start", post(attempts::start_attempt))
        .route("/submit-answer", post(attempts::submit_answer))
        .route("/complete", post(attempts::complete_attempt))
        .route("/my-attempts", get(attempts::my_attempts))
        .route("/quiz/{quiz_id}", get(attempts::attempts_by_quiz))
        .route("/{id}", get(attempts::get_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let leaderboard_routes = Router::new()
        .route("/global", get(leaderboard::global_leaderboard))
        .route("/quiz/{quiz_id}", get(leaderboard::quiz_leaderboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let user_routes = Router::new()
        .route("/me", get(users::get_me).put(users::update_me))
        .route("/me/stats", get(users::my_stats))
        .route("/{id}", get(users::get_user))
        .merge(
            Router::new()
                .route("/", get(users::list_users))
                .route_layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/stats", get(admin::admin_stats))
        .route("/users", get(users::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/users", user_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
