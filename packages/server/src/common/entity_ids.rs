//! Typed ids for every table the server owns.

pub use super::id::Id;

// ============================================================================
// Entity markers
// ============================================================================

pub struct User;
pub struct AuthSession;
pub struct UserRoleRow;
pub struct Category;
pub struct Article;
pub struct AuditEntry;
pub struct SavedArticle;
pub struct Notification;
pub struct AnalyticsEvent;

// ============================================================================
// Aliases
// ============================================================================

/// Also the primary key of `profiles`.
pub type UserId = Id<User>;
pub type SessionId = Id<AuthSession>;
pub type UserRoleId = Id<UserRoleRow>;
pub type CategoryId = Id<Category>;
pub type ArticleId = Id<Article>;
pub type AuditEntryId = Id<AuditEntry>;
pub type SavedArticleId = Id<SavedArticle>;
pub type NotificationId = Id<Notification>;
pub type AnalyticsEventId = Id<AnalyticsEvent>;
