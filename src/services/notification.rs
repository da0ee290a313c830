//! Email notification service
//!
//! Outbound email is best-effort and never part of the request that triggers it.
//! Jobs go onto a bounded queue drained by one background worker. Each job is
//! attempted up to `max_attempts` times with exponential backoff. A job that
//! still fails lands in the dead-letter list, where operators can see it. The
//! list keeps the newest `dead_letter_capacity` entries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EmailConfig;
use crate::models::Event;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_api_error;

/// Request body of the email provider (Resend-compatible)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    RegistrationConfirmation,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct EmailJob {
    pub id: Uuid,
    pub kind: EmailKind,
    pub message: EmailMessage,
}

/// A job that exhausted its attempts or could not be queued
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub job_id: Uuid,
    pub kind: EmailKind,
    pub recipient: String,
    pub subject: String,
    pub attempts: u32,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub sent: u64,
    pub failed: u64,
    pub retries: u64,
    pub pending: usize,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
    pending: AtomicUsize,
}

/// HTTP client for the email provider
#[derive(Clone)]
pub struct Mailer {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);
        Err(EventHubError::ServiceUnavailable(format!(
            "email provider returned {}: {}",
            status, detail
        )))
    }
}

/// Handle for queueing email. Cloning shares the queue and the dead-letter list.
#[derive(Clone)]
pub struct NotificationService {
    sender: Option<mpsc::Sender<EmailJob>>,
    from_address: String,
    app_name: String,
    dead_letters: Arc<DeadLetterList>,
    counters: Arc<Counters>,
}

impl NotificationService {
    /// Create the service and spawn its delivery worker
    pub fn start(config: &EmailConfig) -> Result<(Self, JoinHandle<()>)> {
        let mailer = Mailer::new(config)?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let service = Self {
            sender: Some(sender),
            from_address: config.from_address.clone(),
            app_name: config.app_name.clone(),
            dead_letters: Arc::new(DeadLetterList::new(config.dead_letter_capacity)),
            counters: Arc::new(Counters::default()),
        };

        let worker = DeliveryWorker {
            mailer,
            max_attempts: config.max_attempts.max(1),
            retry_base: Duration::from_millis(config.retry_base_ms),
            dead_letters: service.dead_letters.clone(),
            counters: service.counters.clone(),
        };
        let handle = tokio::spawn(worker.run(receiver));

        info!(queue_capacity = config.queue_capacity, max_attempts = config.max_attempts, "Email dispatcher started");
        Ok((service, handle))
    }

    /// A service that drops every job, used when email is switched off
    pub fn disabled(config: &EmailConfig) -> Self {
        Self {
            sender: None,
            from_address: config.from_address.clone(),
            app_name: config.app_name.clone(),
            dead_letters: Arc::new(DeadLetterList::new(config.dead_letter_capacity)),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue a job without waiting. Returns whether it was accepted.
    pub async fn enqueue(&self, kind: EmailKind, message: EmailMessage) -> bool {
        let Some(sender) = &self.sender else {
            debug!(kind = ?kind, "Email notifications disabled, dropping job");
            return false;
        };

        let job = EmailJob {
            id: Uuid::new_v4(),
            kind,
            message,
        };
        self.counters.pending.fetch_add(1, Ordering::SeqCst);

        match sender.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                self.counters.pending.fetch_sub(1, Ordering::SeqCst);
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                let (job, reason) = match e {
                    mpsc::error::TrySendError::Full(job) => (job, "email queue full"),
                    mpsc::error::TrySendError::Closed(job) => (job, "email worker stopped"),
                };
                warn!(job_id = %job.id, reason, "Email job not queued");
                self.dead_letters.push(dead_letter(&job, 0, reason.to_string())).await;
                false
            }
        }
    }

    pub async fn send_registration_confirmation(&self, name: &str, email: &str, event: &Event) -> bool {
        let message = EmailMessage {
            from: self.from_address.clone(),
            to: vec![email.to_string()],
            subject: format!("Registration Confirmed: {}", event.title),
            html: registration_email_html(&self.app_name, name, event),
        };
        self.enqueue(EmailKind::RegistrationConfirmation, message).await
    }

    pub async fn send_password_reset(&self, email: &str, reset_link: &str) -> bool {
        let message = EmailMessage {
            from: self.from_address.clone(),
            to: vec![email.to_string()],
            subject: format!("Reset Your Password - {}", self.app_name),
            html: password_reset_email_html(&self.app_name, reset_link, Utc::now().year()),
        };
        self.enqueue(EmailKind::PasswordReset, message).await
    }

    /// Oldest first
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.snapshot().await
    }

    pub fn stats(&self) -> NotificationStats {
        NotificationStats {
            sent: self.counters.sent.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            retries: self.counters.retries.load(Ordering::SeqCst),
            pending: self.counters.pending.load(Ordering::SeqCst),
        }
    }

    /// Wait until every queued job has been delivered or dead-lettered.
    /// Returns `false` if the timeout elapsed first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.counters.pending.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

/// Bounded dead-letter list. Pushing past capacity drops the oldest entry.
pub struct DeadLetterList {
    entries: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
}

impl DeadLetterList {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    pub async fn push(&self, letter: DeadLetter) {
        let mut entries = self.entries.lock().await;
        if entries.len() == self.capacity {
            if let Some(dropped) = entries.pop_front() {
                warn!(job_id = %dropped.job_id, capacity = self.capacity, "Dead-letter list full, dropping oldest");
            }
        }
        entries.push_back(letter);
    }

    pub async fn snapshot(&self) -> Vec<DeadLetter> {
        self.entries.lock().await.iter().cloned().collect()
    }
}

struct DeliveryWorker {
    mailer: Mailer,
    max_attempts: u32,
    retry_base: Duration,
    dead_letters: Arc<DeadLetterList>,
    counters: Arc<Counters>,
}

impl DeliveryWorker {
    async fn run(self, mut receiver: mpsc::Receiver<EmailJob>) {
        while let Some(job) = receiver.recv().await {
            self.deliver(job).await;
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
        }
        info!("Email dispatcher stopped");
    }

    async fn deliver(&self, job: EmailJob) {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.mailer.send(&job.message).await {
                Ok(()) => {
                    self.counters.sent.fetch_add(1, Ordering::SeqCst);
                    info!(job_id = %job.id, kind = ?job.kind, attempt, "Email sent");
                    return;
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(job_id = %job.id, attempt, error = %e, "Email delivery failed");
                    if attempt < self.max_attempts {
                        self.counters.retries.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(backoff_delay(self.retry_base, attempt)).await;
                    }
                }
            }
        }

        self.counters.failed.fetch_add(1, Ordering::SeqCst);
        log_api_error("email", &last_error, Some(&format!("job {} dead-lettered", job.id)));
        error!(job_id = %job.id, kind = ?job.kind, attempts = self.max_attempts, "Email moved to dead-letter list");
        self.dead_letters
            .push(dead_letter(&job, self.max_attempts, last_error))
            .await;
    }
}

/// Delay before the retry that follows `attempt` (1-based): base, 2*base, 4*base...
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
}

fn dead_letter(job: &EmailJob, attempts: u32, last_error: String) -> DeadLetter {
    DeadLetter {
        job_id: job.id,
        kind: job.kind,
        recipient: job.message.to.join(", "),
        subject: job.message.subject.clone(),
        attempts,
        last_error,
        failed_at: Utc::now(),
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn registration_email_html(app_name: &str, name: &str, event: &Event) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #333;">Registration Confirmed!</h1>
  <p>Hi {name},</p>
  <p>Thank you for registering for <strong>{title}</strong>!</p>
  <div style="background-color: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h2 style="color: #666; margin-top: 0;">Event Details</h2>
    <p><strong>Date:</strong> {date}</p>
    <p><strong>Time:</strong> {time}</p>
    <p><strong>Location:</strong> {location}</p>
  </div>
  <p>We look forward to seeing you at the event!</p>
  <p>Best regards,<br>The {app} Team</p>
</div>"#,
        name = escape_html(name),
        title = escape_html(&event.title),
        date = escape_html(&event.date),
        time = escape_html(&event.time),
        location = escape_html(&event.location),
        app = escape_html(app_name),
    )
}

pub fn password_reset_email_html(app_name: &str, reset_link: &str, year: i32) -> String {
    let link = escape_html(reset_link);
    let app = escape_html(app_name);
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="margin: 0; padding: 0; font-family: Arial, sans-serif; background-color: #f5f5f5;">
    <div style="max-width: 600px; margin: 40px auto; background-color: #ffffff; border-radius: 8px; padding: 40px;">
      <h1 style="color: #333333;">Reset Your Password</h1>
      <p>We received a request to reset your password for your {app} account. Click the button below to create a new password:</p>
      <p><a href="{link}" style="display: inline-block; padding: 16px 40px; background: #667eea; color: #ffffff; text-decoration: none; border-radius: 6px;">Reset Password</a></p>
      <p>Or copy and paste this link into your browser:</p>
      <p style="word-break: break-all;">{link}</p>
      <p><strong>Note:</strong> This link will expire in 1 hour for security reasons.</p>
      <p style="color: #999999;">If you didn't request a password reset, you can safely ignore this email. Your password will remain unchanged.</p>
      <p style="color: #999999; font-size: 12px;">&copy; {year} {app}. All rights reserved.</p>
    </div>
  </body>
</html>"#
    )
}
