//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod scheduled_tasks;
pub mod storage;
pub mod stream_hub;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use storage::{LocalImageStorage, IMAGE_BUCKET};
pub use stream_hub::StreamHub;
pub use test_dependencies::{InMemoryImageStorage, MockPushGateway, TestDependencies};
pub use traits::*;
