use axum::Router;
use std::sync::Arc;

use crate::AppState;

mod replace;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        // Artwork replace sessions: identity, candidate lookup and ranking
        .nest("/Replace", replace::routes())
}
