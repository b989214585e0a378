// src/config.rs
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::AdminPolicy;
use crate::board::AdminConfig;
use crate::notify::WebhookUrls;

fn default_state_file() -> PathBuf {
    PathBuf::from("shift_state.json")
}

fn default_save_debounce_ms() -> u64 {
    1500
}

fn default_admin_staff_ids() -> Vec<String> {
    vec!["admin".to_string()]
}

/// Runtime settings, read from `SHIFT_*` environment variables (a `.env`
/// file is honoured). List values are comma separated.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    // Chat webhooks
    #[serde(default)]
    pub webhook_submission: Option<String>,
    #[serde(default)]
    pub webhook_remand: Option<String>,
    #[serde(default)]
    pub webhook_absence: Option<String>,
    #[serde(default)]
    pub webhook_approval: Option<String>,

    /// Seeds `adminConfig.submissionNotificationIds` on first run.
    #[serde(default)]
    pub submission_notification_ids: String,

    // Admin policy
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default = "default_admin_staff_ids")]
    pub admin_staff_ids: Vec<String>,
    #[serde(default)]
    pub admin_passphrase_sha256: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::prefixed("SHIFT_").from_env::<Config>()
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn webhooks(&self) -> WebhookUrls {
        WebhookUrls {
            submission: self.webhook_submission.clone(),
            remand: self.webhook_remand.clone(),
            absence: self.webhook_absence.clone(),
            approval: self.webhook_approval.clone(),
        }
    }

    pub fn seed_admin_config(&self) -> AdminConfig {
        AdminConfig {
            submission_notification_ids: self.submission_notification_ids.trim().to_string(),
        }
    }

    pub fn admin_policy(&self) -> AdminPolicy {
        let clean = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };
        AdminPolicy {
            admin_emails: clean(&self.admin_emails),
            admin_staff_ids: clean(&self.admin_staff_ids),
            admin_passphrase_sha256: self
                .admin_passphrase_sha256
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_lowercase),
        }
    }
}
