use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/oauth/access_token", post(handlers::auth::access_token))
        .route(
            "/1/account/verify_credentials.json",
            get(handlers::auth::verify_credentials),
        )
        // Tweeting
        .route("/1/statuses/update.json", post(handlers::statuses::update))
        // Posts
        .route(
            "/1/statuses/home_timeline.json",
            get(handlers::timelines::home_timeline),
        )
        .route(
            "/1/statuses/user_timeline.json",
            get(handlers::timelines::user_timeline),
        )
        .route("/1/statuses/show/:id", get(handlers::statuses::show))
        // Interactions
        .route("/1/statuses/retweet/:id", post(handlers::statuses::retweet))
        .route("/1/favorites/create/:id", post(handlers::favorites::create))
        .route(
            "/1/favorites/destroy/:id",
            post(handlers::favorites::destroy),
        )
        // Users
        .route("/1/users/show.json", get(handlers::users::show))
}
