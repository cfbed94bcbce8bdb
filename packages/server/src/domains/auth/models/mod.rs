pub mod session;
pub mod user;

pub use session::AuthSession;
pub use user::UserAccount;
