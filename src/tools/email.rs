//! sendEmail: plain-text mail over SMTP with STARTTLS

use super::{param_or, required_param, Tool, ToolContext};
use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;
use tracing::info;

pub struct SendEmail;

#[async_trait]
impl Tool for SendEmail {
    fn name(&self) -> &'static str {
        "sendEmail"
    }

    fn description(&self) -> &'static str {
        "Send an email (recipient, subject, message)"
    }

    fn error_label(&self) -> &'static str {
        "Email error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let Some(account) = ctx.email.as_ref() else {
            return Ok("Email credentials not configured".to_string());
        };

        let recipient = required_param(params, "recipient")?;
        let subject = param_or(params, "subject", "JARVIS Notification");
        let body = param_or(params, "message", "");

        let email = Message::builder()
            .from(account.address.parse()?)
            .to(recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&account.host)?
            .port(account.port)
            .credentials(Credentials::new(
                account.address.clone(),
                account.password.clone(),
            ))
            .build();

        transport.send(email).await?;
        info!("📧 Email sent to {}", recipient);
        Ok(format!("Email sent to {}", recipient))
    }
}
