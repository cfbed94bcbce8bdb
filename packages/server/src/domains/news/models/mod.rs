pub mod article;
pub mod audit_log;

pub use article::{ArticleFilter, ArticleRecord};
pub use audit_log::{AuditAction, AuditEntryRecord};
