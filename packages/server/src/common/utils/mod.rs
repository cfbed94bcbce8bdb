pub mod fcm;

pub use fcm::*;
