// src/notify.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::staff::Staff;

// --- Error Types ---

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Chat rejected the notification ({status}): {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Submission,
    Remand,
    Absence,
    Approval,
}

/// One chat message ready to be posted.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub payload: Value,
}

impl Notification {
    fn text(kind: NotificationKind, text: String) -> Self {
        Self {
            kind,
            payload: json!({ "text": text }),
        }
    }
}

// --- Payload Builders ---

fn user_mention(chat_user_id: &str) -> String {
    format!("<users/{}>", chat_user_id.trim())
}

/// `<users/1> <users/2>` from a comma separated id list.
pub fn submission_mentions(ids: &str) -> String {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(user_mention)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn submission(name: &str, year: i32, month: u32, mentions: &str) -> Notification {
    Notification::text(
        NotificationKind::Submission,
        format!(
            "{} {}さんが{}年{}月のシフトを提出しました！",
            mentions, name, year, month
        ),
    )
}

pub fn remand(name: &str, chat_user_id: &str) -> Notification {
    let prefix = if chat_user_id.trim().is_empty() {
        format!("【To: {}さん】", name)
    } else {
        user_mention(chat_user_id)
    };
    Notification::text(
        NotificationKind::Remand,
        format!("{} シフトが差し戻しされました。管理者とご相談願います。", prefix),
    )
}

pub fn absence(name: &str) -> Notification {
    Notification::text(
        NotificationKind::Absence,
        format!(
            "お疲れ様です。本日、{}さんが欠勤です。\n一緒の業務を担当されている方は調整等よろしくお願いします！",
            name
        ),
    )
}

const APPROVAL_ICON: &str = "https://raw.githubusercontent.com/google/material-design-icons/master/png/action/assignment_turned_in/materialicons/48dp/1x/baseline_assignment_turned_in_black_48dp.png";
const NONE_TEXT: &str = "なし";

fn text_section(header: &str, text: &str) -> Value {
    json!({ "header": header, "widgets": [{ "textParagraph": { "text": text } }] })
}

/// The approval goes out as two messages: a mention, then a detail card.
/// `issued_at_millis` keeps card ids unique.
pub fn approval(
    staff: &Staff,
    year: i32,
    month: u32,
    pattern_summary: &str,
    irregularities: &[String],
    remarks: Option<&str>,
    issued_at_millis: i64,
) -> Vec<Notification> {
    let mention = if staff.chat_user_id.trim().is_empty() {
        format!("{}さん", staff.name)
    } else {
        user_mention(&staff.chat_user_id)
    };
    let irregular_text = if irregularities.is_empty() {
        NONE_TEXT.to_string()
    } else {
        irregularities.join("\n")
    };
    let remarks = remarks
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(NONE_TEXT);

    let card = json!({
        "cardsV2": [{
            "cardId": format!("shift-approval-{}-{}", staff.id, issued_at_millis),
            "card": {
                "header": {
                    "title": format!("【シフト承認】 {}年{}月", year, month),
                    "subtitle": staff.name,
                    "imageUrl": APPROVAL_ICON,
                    "imageType": "CIRCLE"
                },
                "sections": [
                    text_section("基本シフトパターン", pattern_summary),
                    text_section("イレギュラー勤務", &irregular_text),
                    text_section("備考", remarks)
                ]
            }
        }]
    });

    vec![
        Notification::text(
            NotificationKind::Approval,
            format!("{} シフトが承認されました。", mention),
        ),
        Notification {
            kind: NotificationKind::Approval,
            payload: card,
        },
    ]
}

// --- Delivery ---

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sends each notification in order, stopping at the first failure.
pub async fn notify_all(
    notifier: &dyn Notifier,
    notifications: &[Notification],
) -> Result<(), NotifyError> {
    for notification in notifications {
        notifier.notify(notification).await?;
    }
    Ok(())
}

/// Incoming webhook per notification kind. Unset kinds are skipped.
#[derive(Debug, Clone, Default)]
pub struct WebhookUrls {
    pub submission: Option<String>,
    pub remand: Option<String>,
    pub absence: Option<String>,
    pub approval: Option<String>,
}

impl WebhookUrls {
    pub fn for_kind(&self, kind: NotificationKind) -> Option<&str> {
        let url = match kind {
            NotificationKind::Submission => &self.submission,
            NotificationKind::Remand => &self.remand,
            NotificationKind::Absence => &self.absence,
            NotificationKind::Approval => &self.approval,
        };
        url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[derive(Deserialize)]
struct ChatErrorBody {
    error: Option<ChatErrorDetail>,
}

#[derive(Deserialize)]
struct ChatErrorDetail {
    message: Option<String>,
}

pub struct ChatWebhookNotifier {
    client: Client,
    urls: WebhookUrls,
}

impl ChatWebhookNotifier {
    pub fn new(urls: WebhookUrls) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, urls })
    }
}

#[async_trait]
impl Notifier for ChatWebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(url) = self.urls.for_kind(notification.kind) else {
            debug!("No webhook for {:?}, skipping notification", notification.kind);
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .json(&notification.payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Sent {:?} notification", notification.kind);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ChatErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.error)
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        error!("{:?} notification rejected: {} {}", notification.kind, status, message);
        Err(NotifyError::Rejected { status, message })
    }
}
