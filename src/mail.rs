//! Send emails to user for important updates.

use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use reqwest::{Client, Url, header};
use serde::Serialize;

use crate::config::Mail;
use crate::postcard::Postcard;

const DEFAULT_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";
const DEFAULT_TIMEOUT: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("missing mail API key")]
    MissingKey,
    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound transactional email.
///
/// Callers wait for delivery and surface failures; nothing is retried.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Message<'a> {
    sender: Address<'a>,
    to: [Address<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
}

/// Brevo transactional email API.
pub struct BrevoMailer {
    client: Client,
    endpoint: Url,
    api_key: String,
    sender: String,
}

impl BrevoMailer {
    /// Create a new [`BrevoMailer`].
    pub fn new(config: &Mail) -> Result<Self, MailError> {
        let endpoint = Url::parse(
            config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT),
        )?;
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(MailError::MissingKey)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(
                config.timeout.unwrap_or(DEFAULT_TIMEOUT),
            ))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            sender: config.sender.clone(),
        })
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), MailError> {
        let message = Message {
            sender: Address {
                email: &self.sender,
            },
            to: [Address { email: to }],
            subject,
            html_content: html,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("api-key", &self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(%status, "email delivered to provider");
        Ok(())
    }
}

/// Mailer used when no provider is configured. Only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        _html: &str,
    ) -> Result<(), MailError> {
        tracing::info!(to, subject, "mail provider disabled, email dropped");
        Ok(())
    }
}

/// Subject and body of the verification email, for a code lasting `validity`.
pub fn otp_email(code: &str, validity: TimeDelta) -> (&'static str, String) {
    (
        "Your OTP Code",
        format!(
            "<p>Your OTP code is: <strong>{}</strong>. It is valid for {}.</p>",
            escape(code),
            humanize(validity)
        ),
    )
}

/// Subject and body of the email sent to a postcard recipient.
///
/// `instance` is the public URL of this server; no link when empty.
pub fn postcard_email(
    postcard: &Postcard,
    instance: &str,
) -> (&'static str, String) {
    let mut html = format!(
        r#"<h2>You've got a new postcard!</h2>
<img src="{}" alt="Postcard front" style="max-width:600px;" /><br/>
<p><strong>Message:</strong> <span style="font-family:{};">{}</span></p>
<p><strong>Location:</strong> {}</p>
<p><strong>Stamp:</strong> {}</p>"#,
        escape(&postcard.background_image),
        postcard.font_style.as_str(),
        escape(&postcard.message),
        escape(&postcard.location),
        postcard.stamp.as_str(),
    );
    if !instance.is_empty() {
        html.push_str(&format!(
            "\n<p><a href=\"{}\">Open Wanderlog</a></p>",
            escape(instance)
        ));
    }

    ("You've received a Postcard!", html)
}

/// `10 minutes`, `1 minute`, `45 seconds`.
fn humanize(duration: TimeDelta) -> String {
    let seconds = duration.num_seconds();
    let (value, unit) = if seconds % 60 == 0 {
        (seconds / 60, "minute")
    } else {
        (seconds, "second")
    };

    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

fn escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(c),
        }
    }
    output
}
