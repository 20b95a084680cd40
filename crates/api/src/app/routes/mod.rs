use axum::{routing::get, Router};

pub mod events;
pub mod history;
pub mod panels;
pub mod settings;
pub mod snapshot;
pub mod system;

/// Mount point of the plugin endpoints inside the host URL space.
pub const PLUGIN_PREFIX: &str = "/plugin/stock-history";

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    let plugin = Router::new()
        .merge(history::router())
        .merge(settings::router())
        .merge(panels::router())
        .merge(events::router())
        .merge(snapshot::router());

    Router::new()
        .route("/whoami", get(system::whoami))
        .nest(PLUGIN_PREFIX, plugin)
}
