//! Auth domain actions - email/password accounts and sessions

mod refresh;
mod session;
mod sign_in;
mod sign_out;
mod sign_up;

pub use refresh::refresh_session;
pub use session::{current_user, issue_session, publish_auth_change};
pub use sign_in::sign_in;
pub use sign_out::sign_out;
pub use sign_up::sign_up;
