//! Session bootstrap and role resolution.
//!
//! [`state`] holds the snapshot and the one transition function that may
//! change it; [`bootstrap`] runs that function on a task and performs the
//! effects it asks for.

pub mod bootstrap;
pub mod state;

pub use bootstrap::{AuthBootstrap, AuthHandle, AuthNotice, IdentitySource};
pub use state::{reduce, AuthEffect, AuthEvent, AuthSnapshot, Ticket, Tracker};
