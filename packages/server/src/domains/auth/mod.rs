//! Auth domain - email/password accounts and bearer sessions
//!
//! Responsibilities:
//! - Account creation (with profile and role rows)
//! - Password verification (argon2)
//! - Access tokens (JWT) backed by revocable refresh sessions

pub mod actions;
pub mod jwt;
pub mod models;
pub mod password;

pub use jwt::{Claims, JwtService};
