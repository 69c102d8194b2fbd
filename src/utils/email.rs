//! Account mail: password reset, reset confirmation and email verification.
//!
//! Delivery is skipped (and logged at debug) unless `SMTP_ENABLED` is set.

use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, error, instrument};

use bustrack_config::EmailConfig;
use bustrack_core::AppError;

#[derive(Debug, Clone)]
pub struct EmailService {
    config: EmailConfig,
}

/// A rendered message, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub subject: &'static str,
    pub text: String,
    pub html: String,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn password_reset(&self, username: &str, token: &str) -> Mail {
        let link = format!("{}/reset-password?token={}", self.config.frontend_url, token);
        Mail {
            subject: "Reset your NTC Bus Tracker password",
            text: format!(
                "Hi {username},\n\n\
                 A password reset was requested for your account.\n\
                 Open the link below to choose a new password:\n{link}\n\n\
                 The link expires in 1 hour. If you did not ask for this, ignore this email."
            ),
            html: self.layout(
                "Reset your password",
                &format!(
                    "<p>Hi <strong>{username}</strong>,</p>\
                     <p>A password reset was requested for your account.</p>\
                     <p><a href=\"{link}\">Choose a new password</a></p>\
                     <p>The link expires in 1 hour. If you did not ask for this, ignore this email.</p>"
                ),
            ),
        }
    }

    pub fn password_reset_confirmation(&self, username: &str) -> Mail {
        Mail {
            subject: "Your NTC Bus Tracker password was changed",
            text: format!(
                "Hi {username},\n\n\
                 Your password has been reset. If you did not make this change, contact support."
            ),
            html: self.layout(
                "Password changed",
                &format!(
                    "<p>Hi <strong>{username}</strong>,</p>\
                     <p>Your password has been reset.</p>\
                     <p>If you did not make this change, contact support.</p>"
                ),
            ),
        }
    }

    pub fn email_verification(&self, username: &str, token: &str) -> Mail {
        let link = format!("{}/verify-email?token={}", self.config.frontend_url, token);
        Mail {
            subject: "Verify your NTC Bus Tracker email address",
            text: format!(
                "Hi {username},\n\n\
                 Confirm your email address by opening the link below:\n{link}\n\n\
                 The link expires in 24 hours."
            ),
            html: self.layout(
                "Verify your email",
                &format!(
                    "<p>Hi <strong>{username}</strong>,</p>\
                     <p><a href=\"{link}\">Confirm your email address</a></p>\
                     <p>The link expires in 24 hours.</p>"
                ),
            ),
        }
    }

    fn layout(&self, title: &str, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{title}</title></head>
<body style="margin:0;padding:20px;font-family:Arial,sans-serif;background:#f4f4f4;">
  <div style="max-width:600px;margin:0 auto;background:#ffffff;border-radius:8px;overflow:hidden;">
    <div style="background:#0F766E;padding:24px;text-align:center;color:#ffffff;">
      <h1 style="margin:0;font-size:24px;">{from_name}</h1>
    </div>
    <div style="padding:32px;color:#444444;font-size:15px;line-height:1.5;">
      <h2 style="margin-top:0;color:#222222;">{title}</h2>
      {content}
    </div>
  </div>
</body>
</html>"#,
            from_name = self.config.from_name,
        )
    }

    /// Sends `mail` to `to_email`. Returns immediately when SMTP is disabled.
    #[instrument(skip(self, mail), fields(subject = mail.subject))]
    pub async fn send(&self, to_email: &str, mail: Mail) -> Result<(), AppError> {
        if !self.config.enabled {
            debug!("SMTP disabled, mail not sent");
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);
        let message = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal(anyhow::anyhow!("Invalid from address: {e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal(anyhow::anyhow!("Invalid to address: {e}")))?)
            .subject(mail.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(mail.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(mail.html),
                    ),
            )
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to build email: {e}")))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let credentials = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );
            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create SMTP relay: {e}")))?
                .port(self.config.smtp_port)
                .credentials(credentials)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| AppError::internal(anyhow::anyhow!("Mail task failed: {e}")))?
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to send email: {e}")))?;

        Ok(())
    }

    /// Sends in the background; failures are logged, never surfaced.
    pub fn send_detached(&self, to_email: String, mail: Mail) {
        if !self.config.enabled {
            debug!(subject = mail.subject, "SMTP disabled, mail not sent");
            return;
        }
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.send(&to_email, mail).await {
                error!(error = %e.error, "Failed to deliver email");
            }
        });
    }
}
