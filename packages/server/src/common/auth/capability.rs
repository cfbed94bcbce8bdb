/// Operations gated behind the admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, edit and delete articles, categories and images
    ManageNews,

    /// Compose, send, schedule and cancel notifications
    ManageNotifications,

    /// Read aggregate analytics
    ViewAnalytics,

    /// Change other users' roles
    ManageUsers,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageNews => "manage_news",
            Capability::ManageNotifications => "manage_notifications",
            Capability::ViewAnalytics => "view_analytics",
            Capability::ManageUsers => "manage_users",
        }
    }
}
