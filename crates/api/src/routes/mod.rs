//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod health;
pub mod sessions;
pub mod tenants;
pub mod wopi;

/// Creates the administrative router. Every route sits behind the auth
/// middleware, which resolves the caller's tenant context.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(sessions::routes())
        .merge(tenants::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
}
