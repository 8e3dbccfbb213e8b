mod cleanup;
mod session;

pub use cleanup::{run_cleanup_worker, CleanupConfig};
pub use session::{
    authorize, create_session, token_from_headers, AuthContext, AuthError, IssuedSession,
};
