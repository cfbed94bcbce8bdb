//! Composition, push dispatch, scheduled processing and the user feed.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::*;
use newsdesk_core::common::NotificationId;
use newsdesk_core::domains::notifications::actions::{
    process_scheduled_notifications, NO_RECIPIENTS_MESSAGE,
};
use newsdesk_core::domains::notifications::{NewNotification, NotificationRecord};
use newsdesk_core::kernel::{MockPushGateway, TestDependencies};
use newsdesk_shared::{Audience, NotificationType};
use serde_json::json;
use test_context::test_context;
use uuid::Uuid;

async fn register_token(ctx: &TestHarness, user: &TestUser) -> String {
    let token = format!("fcm-{}", Uuid::new_v4().simple());
    let res = ctx
        .client()
        .put(
            "/api/profile/push-token",
            Some(user.token()),
            json!({ "fcm_token": token }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    token
}

#[test_context(TestHarness)]
#[tokio::test]
async fn immediate_compose_is_sent_and_pushed(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;
    let reader = create_user(&ctx.deps, "reader").await;
    let device = register_token(ctx, &reader).await;

    let res = ctx
        .client()
        .post(
            "/api/notifications",
            Some(admin.token()),
            json!({
                "title": "Exam results",
                "body": "Results are out",
                "audience": "individual",
                "userId": reader.session.user.id,
                "notificationType": "mobile",
                "scheduleLater": false
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert!(!res.body["sent_at"].is_null());
    assert!(res.body["scheduled_for"].is_null());

    let sent = ctx.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tokens, vec![device]);
    assert_eq!(
        sent[0].message.data.get("notificationId").map(String::as_str),
        res.body["id"].as_str()
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn schedule_later_keeps_row_unsent(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;
    let at = Utc::now() + Duration::hours(2);

    let res = ctx
        .client()
        .post(
            "/api/notifications",
            Some(admin.token()),
            json!({
                "title": "Webinar",
                "body": "Starts soon",
                "audience": "course",
                "notificationType": "both",
                "scheduleLater": true,
                "scheduledTime": at
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.body["sent_at"].is_null());
    assert!(!res.body["scheduled_for"].is_null());
    assert!(ctx.push.sent().is_empty());

    let scheduled = ctx
        .client()
        .get("/api/notifications?status=scheduled", Some(admin.token()))
        .await;
    assert!(scheduled
        .body
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["id"] == res.body["id"]));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn scheduling_in_the_past_is_rejected(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;

    let res = ctx
        .client()
        .post(
            "/api/notifications",
            Some(admin.token()),
            json!({
                "title": "Too late",
                "body": "Already happened",
                "scheduleLater": true,
                "scheduledTime": Utc::now() - Duration::minutes(5)
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Scheduled time must be in the future");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn cancel_only_applies_to_unsent_rows(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;
    let client = ctx.client();

    let scheduled = client
        .post(
            "/api/notifications",
            Some(admin.token()),
            json!({
                "title": "Later",
                "body": "Body",
                "notificationType": "web",
                "scheduleLater": true,
                "scheduledTime": Utc::now() + Duration::days(1)
            }),
        )
        .await;
    let sent = client
        .post(
            "/api/notifications",
            Some(admin.token()),
            json!({ "title": "Now", "body": "Body", "notificationType": "web" }),
        )
        .await;

    let cancel = client
        .delete(
            &format!("/api/notifications/{}", scheduled.body["id"].as_str().unwrap()),
            Some(admin.token()),
        )
        .await;
    assert_eq!(cancel.status, StatusCode::NO_CONTENT);

    let refused = client
        .delete(
            &format!("/api/notifications/{}", sent.body["id"].as_str().unwrap()),
            Some(admin.token()),
        )
        .await;
    assert_eq!(refused.status, StatusCode::CONFLICT);
    assert_eq!(refused.error(), "Notification has already been sent");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn send_push_requires_title_and_body(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;

    let res = ctx
        .client()
        .post(
            "/functions/send-push-notification",
            Some(admin.token()),
            json!({ "title": "", "body": "x" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Title and body are required");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn send_push_without_tokens_records_nothing(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;
    let reader = create_user(&ctx.deps, "tokenless").await;

    let res = ctx
        .client()
        .post(
            "/functions/send-push-notification",
            Some(admin.token()),
            json!({ "title": "Hi", "body": "There", "userId": reader.session.user.id }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["message"], NO_RECIPIENTS_MESSAGE);
    assert!(ctx.push.sent().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn send_push_to_user_records_and_dispatches(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;
    let reader = create_user(&ctx.deps, "pushed").await;
    let device = register_token(ctx, &reader).await;

    let res = ctx
        .client()
        .post(
            "/functions/send-push-notification",
            Some(admin.token()),
            json!({
                "title": "Breaking",
                "body": "Read this",
                "userId": reader.session.user.id,
                "data": { "screen": "news" },
                "linkToArticle": "article-1"
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["fcmResult"]["success"], 1);
    let notification_id = res.body["notificationId"].as_str().unwrap();

    let sent = ctx.push.sent();
    assert_eq!(sent[0].tokens, vec![device]);
    let data = &sent[0].message.data;
    assert_eq!(data.get("screen").map(String::as_str), Some("news"));
    assert_eq!(data.get("linkToArticle").map(String::as_str), Some("article-1"));
    assert_eq!(
        data.get("notificationId").map(String::as_str),
        Some(notification_id)
    );

    let record = NotificationRecord::find_by_id(
        NotificationId::parse(notification_id).unwrap(),
        &ctx.db_pool,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(record.notification_type, NotificationType::Mobile);
    assert_eq!(record.audience, Audience::Individual);
    assert!(record.sent_at.is_some());
}

#[tokio::test]
async fn send_push_gateway_failure_is_500() {
    let ctx = TestHarness::with_dependencies(
        TestDependencies::new().mock_push(MockPushGateway::failing("gateway down")),
    )
    .await
    .unwrap();
    let admin = create_admin(&ctx.deps).await;
    let reader = create_user(&ctx.deps, "unlucky").await;
    register_token(&ctx, &reader).await;

    let res = ctx
        .client()
        .post(
            "/functions/send-push-notification",
            Some(admin.token()),
            json!({ "title": "Hi", "body": "There", "userId": reader.session.user.id }),
        )
        .await;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.error().contains("gateway down"));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn due_rows_are_processed_once(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;
    let reader = create_user(&ctx.deps, "scheduled").await;
    let device = register_token(ctx, &reader).await;

    let due = NotificationRecord::create(
        &NewNotification {
            title: "Reminder".to_string(),
            body: "Deadline today".to_string(),
            audience: Audience::Individual,
            notification_type: NotificationType::Both,
            user_id: Some(reader.id()),
            link_to_article: None,
            scheduled_for: Some(Utc::now() - Duration::minutes(1)),
            sent_at: None,
            created_by: Some(admin.id()),
            idempotency_key: None,
        },
        &ctx.db_pool,
    )
    .await
    .unwrap()
    .unwrap();

    let res = ctx
        .client()
        .post(
            "/functions/process-scheduled-notifications",
            Some(admin.token()),
            json!({}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let processed = res.body["processed"].as_array().unwrap();
    let entry = processed
        .iter()
        .find(|p| p["id"] == json!(due.id))
        .expect("due row processed");
    assert_eq!(entry["success"], true);
    assert!(ctx.push.sent().iter().any(|p| p.tokens == vec![device.clone()]));

    let claimed = NotificationRecord::find_by_id(due.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert!(claimed.sent_at.is_some());

    let again = process_scheduled_notifications(&ctx.deps).await.unwrap();
    assert!(again.iter().all(|p| p.id != due.id.into_uuid()));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn feed_shows_broadcasts_and_own_notifications(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;
    let reader = create_user(&ctx.deps, "feed").await;
    let other = create_user(&ctx.deps, "other").await;
    let client = ctx.client();

    let mine = client
        .post(
            "/api/notifications",
            Some(admin.token()),
            json!({
                "title": "For you",
                "body": "Personal",
                "audience": "individual",
                "userId": reader.session.user.id,
                "notificationType": "web"
            }),
        )
        .await;
    let theirs = client
        .post(
            "/api/notifications",
            Some(admin.token()),
            json!({
                "title": "For them",
                "body": "Personal",
                "audience": "individual",
                "userId": other.session.user.id,
                "notificationType": "web"
            }),
        )
        .await;

    let feed = client
        .get("/api/notifications/feed?limit=100", Some(reader.token()))
        .await;
    assert_eq!(feed.status, StatusCode::OK);
    let ids: Vec<&serde_json::Value> = feed.body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| &n["id"])
        .collect();
    assert!(ids.contains(&&mine.body["id"]));
    assert!(!ids.contains(&&theirs.body["id"]));
    assert!(feed.body["count"].as_i64().unwrap() >= 1);

    let read = client
        .post(
            &format!("/api/notifications/{}/read", mine.body["id"].as_str().unwrap()),
            Some(reader.token()),
            json!({}),
        )
        .await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["is_read"], true);
}

async fn create_due(ctx: &TestHarness, title: &str, created_by: &TestUser) -> NotificationRecord {
    NotificationRecord::create(
        &NewNotification {
            title: title.to_string(),
            body: "Due now".to_string(),
            audience: Audience::Course,
            notification_type: NotificationType::Web,
            user_id: None,
            link_to_article: None,
            scheduled_for: Some(Utc::now() - Duration::minutes(1)),
            sent_at: None,
            created_by: Some(created_by.id()),
            idempotency_key: None,
        },
        &ctx.db_pool,
    )
    .await
    .unwrap()
    .unwrap()
}

#[test_context(TestHarness)]
#[tokio::test]
async fn failed_claim_is_reported_and_batch_continues(ctx: &TestHarness) {
    let admin = create_admin(&ctx.deps).await;

    sqlx::query(
        "CREATE OR REPLACE FUNCTION reject_unclaimable() RETURNS trigger AS $$
         BEGIN
             IF NEW.title LIKE 'unclaimable-%' THEN
                 RAISE EXCEPTION 'claim rejected';
             END IF;
             RETURN NEW;
         END $$ LANGUAGE plpgsql",
    )
    .execute(&ctx.db_pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE OR REPLACE TRIGGER reject_unclaimable BEFORE UPDATE ON notifications
         FOR EACH ROW EXECUTE FUNCTION reject_unclaimable()",
    )
    .execute(&ctx.db_pool)
    .await
    .unwrap();

    let stuck = create_due(ctx, &format!("unclaimable-{}", Uuid::new_v4()), &admin).await;
    let fine = create_due(ctx, "Office hours", &admin).await;

    let processed = process_scheduled_notifications(&ctx.deps).await.unwrap();

    let failed = processed
        .iter()
        .find(|p| p.id == stuck.id.into_uuid())
        .expect("failed claim reported");
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("claim rejected"));

    let delivered = NotificationRecord::find_by_id(fine.id, &ctx.db_pool)
        .await
        .unwrap()
        .unwrap();
    assert!(delivered.sent_at.is_some());

    sqlx::query("DELETE FROM notifications WHERE id = $1")
        .bind(stuck.id)
        .execute(&ctx.db_pool)
        .await
        .unwrap();
}
