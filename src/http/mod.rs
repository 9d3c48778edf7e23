//! HTTP surface for the telephony carrier
//!
//! - GET / - Service banner
//! - POST / - Voice webhook, returns the stream instructions
//! - GET /media - Media-stream websocket (path configurable)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;
pub mod twiml;

pub use routes::create_router;
pub use state::AppState;
