pub mod profile;
pub mod user_role;

pub use profile::ProfileRecord;
pub use user_role::UserRoleRecord;
