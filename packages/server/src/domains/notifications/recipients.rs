//! Push token resolution

use anyhow::Result;
use newsdesk_shared::Audience;
use sqlx::PgPool;

use crate::common::UserId;
use crate::domains::profiles::models::ProfileRecord;

/// Who a push goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    User(UserId),
    Audience(Audience),
}

impl Recipients {
    /// A specific user wins over any audience.
    pub fn from_target(user_id: Option<UserId>, audience: Option<Audience>) -> Self {
        match user_id {
            Some(user_id) => Recipients::User(user_id),
            None => Recipients::Audience(audience.unwrap_or_default()),
        }
    }
}

/// Device tokens for the recipients, skipping users who turned push off.
/// Duplicates are removed; order follows profile creation.
pub async fn resolve_push_tokens(recipients: Recipients, pool: &PgPool) -> Result<Vec<String>> {
    let tokens = match recipients {
        Recipients::User(user_id) => ProfileRecord::find_by_id(user_id, pool)
            .await?
            .and_then(|profile| profile.deliverable_token())
            .into_iter()
            .collect(),
        Recipients::Audience(audience) => {
            let profiles = ProfileRecord::find_with_push_tokens(pool).await?;
            profiles
                .iter()
                .filter(|profile| profile.wants(audience))
                .filter_map(ProfileRecord::deliverable_token)
                .collect()
        }
    };
    Ok(dedupe(tokens))
}

fn dedupe(tokens: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
