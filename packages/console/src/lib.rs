// Newsdesk - Console Core
//
// Everything the admin console does except drawing it: session bootstrap
// and role resolution, route guards, realtime list reconciliation, the
// shared retry policy, form submit flows and the typed API client.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod guards;
pub mod realtime;
pub mod retry;
pub mod saved;
pub mod sse;

pub use api::ApiClient;
pub use config::ConsoleConfig;
pub use error::ClientError;
