mod auth;
mod router;
mod state;

pub use auth::{require_auth, AuthPolicy, CallerRole, Role, DEV_API_KEY};
pub use router::build_router;
pub use state::ServeState;
