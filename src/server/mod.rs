mod handlers;
mod models;
mod state;
mod translate;

pub use handlers::{router, run_server};
pub use models::{BoundsPayload, ErrorResponse, TextBlock, TranslateRequest, TranslateResponse};
pub use state::ServerState;
