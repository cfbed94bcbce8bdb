//! Notification actions

mod compose;
mod dispatch;
mod queries;
mod scheduled;

pub use compose::compose_notification;
pub use dispatch::{deliver, send_push_notification, Delivery, NO_RECIPIENTS_MESSAGE};
pub use queries::{
    cancel_scheduled, list_feed, list_scheduled, list_sent, mark_read,
};
pub use scheduled::{process_scheduled_notifications, NOTHING_SCHEDULED_MESSAGE};
