use anyhow::Result;
use chrono::{DateTime, Utc};
use newsdesk_shared::{Audience, NotificationPreferences, Profile, ProfileUpdate};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::common::UserId;

/// Row in `profiles`, keyed by the user id.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ProfileRecord {
    pub id: UserId,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub notification_preferences: Option<Json<NotificationPreferences>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Empty profile with default preferences, created alongside the user.
    pub async fn create_default<'e>(user_id: UserId, executor: impl PgExecutor<'e>) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO profiles (id, notification_preferences)
             VALUES ($1, $2)
             RETURNING *",
        )
        .bind(user_id)
        .bind(Json(NotificationPreferences::default()))
        .fetch_one(executor)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Only provided fields change.
    pub async fn update_details(
        id: UserId,
        update: &ProfileUpdate,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE profiles
             SET username = COALESCE($2, username),
                 avatar_url = COALESCE($3, avatar_url),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&update.username)
        .bind(&update.avatar_url)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_preferences(
        id: UserId,
        preferences: &NotificationPreferences,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE profiles
             SET notification_preferences = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(Json(preferences))
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Set or clear the device token without touching other preferences.
    pub async fn set_push_token(
        id: UserId,
        token: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE profiles
             SET notification_preferences = COALESCE(notification_preferences, '{}'::jsonb)
                     || jsonb_build_object('fcm_token', $2::text),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(token)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Profiles that have any device token stored.
    pub async fn find_with_push_tokens(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM profiles
             WHERE notification_preferences->>'fcm_token' IS NOT NULL
             ORDER BY created_at",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub fn preferences(&self) -> NotificationPreferences {
        self.notification_preferences
            .as_ref()
            .map(|json| json.0.clone())
            .unwrap_or_default()
    }

    /// Token for push delivery, honouring the push opt-out.
    pub fn deliverable_token(&self) -> Option<String> {
        self.preferences().deliverable_token().map(String::from)
    }

    pub fn wants(&self, audience: Audience) -> bool {
        self.preferences().is_subscribed_to(audience)
    }

    pub fn to_profile(&self) -> Profile {
        Profile {
            id: self.id.into_uuid(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            notification_preferences: self.notification_preferences.as_ref().map(|j| j.0.clone()),
        }
    }
}
