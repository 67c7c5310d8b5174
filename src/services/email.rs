//! Outgoing mail
//!
//! Two kinds of mail leave the system: plain-text password-reset messages
//! and HTML newsletter campaigns announcing a published post. The SMTP
//! relay comes from config; with no host configured the service is disabled
//! and sending returns an error the caller can surface or log.
//!
//! Reset sends are all-or-nothing for the caller. Campaign sends are
//! best-effort per recipient: a bounced address is logged and the rest of
//! the list still goes out.

use anyhow::{anyhow, Context, Result};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tera::Tera;
use tracing::{info, warn};

use crate::config::SmtpConfig;

/// HTML template for the new-post campaign
const CAMPAIGN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
    <h1 style="font-size: 22px;">{{ title }}</h1>
    {% if excerpt %}<p style="color: #444;">{{ excerpt }}</p>{% endif %}
    <p><a href="{{ post_url }}" style="color: #0a66c2;">Read the full story</a></p>
    <hr style="border: none; border-top: 1px solid #ddd;" />
    <p style="font-size: 12px; color: #888;">
      You are receiving this because you subscribed to the {{ site_name }} newsletter.
      <a href="{{ unsubscribe_url }}" style="color: #888;">Unsubscribe</a>
    </p>
  </body>
</html>
"#;

/// Outcome of a campaign send
#[derive(Debug, Default)]
pub struct CampaignReport {
    /// Recipients the relay accepted
    pub sent: usize,
    /// Recipients that failed (logged individually)
    pub failed: usize,
}

/// Email service backed by an SMTP relay
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    from_name: String,
    public_url: String,
    templates: Tera,
}

impl EmailService {
    /// Build the service from SMTP config. An empty host disables sending.
    pub fn new(config: &SmtpConfig, public_url: impl Into<String>) -> Result<Self> {
        let mailer = if config.host.is_empty() {
            info!("SMTP host not configured, outgoing mail disabled");
            None
        } else {
            let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .port(config.port)
                .build();
            Some(transport)
        };

        let mut templates = Tera::default();
        templates
            .add_raw_template("campaign.html", CAMPAIGN_TEMPLATE)
            .context("Failed to register campaign template")?;

        let mut public_url = public_url.into();
        while public_url.ends_with('/') {
            public_url.pop();
        }

        Ok(Self {
            mailer,
            from: format!("{} <{}>", config.from_name, config.from_address),
            from_name: config.from_name.clone(),
            public_url,
            templates,
        })
    }

    /// Whether an SMTP relay is configured
    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Send a password-reset email carrying the one-time token link.
    ///
    /// Failure is returned to the caller: a user waiting on a reset link
    /// needs to know it did not go out.
    pub async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<()> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| anyhow!("Outgoing mail is not configured"))?;

        let reset_url = format!(
            "{}/auth/reset-password?token={}",
            self.public_url,
            urlencoding::encode(token)
        );

        let body = format!(
            "Hello,\n\n\
             A password reset was requested for your {} account. Open the link \
             below to choose a new password:\n\n{}\n\n\
             The link expires shortly and can only be used once. If you did not \
             request this, you can ignore this email.\n\n\
             The {} team",
            self.from_name, reset_url, self.from_name
        );

        let email = Message::builder()
            .from(self.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to_email.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(format!("[{}] Password reset", self.from_name))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        mailer
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }

    /// Send a new-post campaign to a list of recipients.
    ///
    /// Each recipient gets their own unsubscribe link. Per-recipient
    /// failures are logged and counted, never fatal.
    pub async fn send_post_campaign(
        &self,
        title: &str,
        excerpt: Option<&str>,
        slug: &str,
        recipients: &[(String, String)],
    ) -> Result<CampaignReport> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| anyhow!("Outgoing mail is not configured"))?;

        let mut report = CampaignReport::default();

        for (email, token) in recipients {
            let html = self.render_campaign(title, excerpt, slug, email, token)?;

            let message = Message::builder()
                .from(self.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
                .to(match email.parse() {
                    Ok(addr) => addr,
                    Err(e) => {
                        warn!(recipient = %email, error = %e, "skipping invalid recipient address");
                        report.failed += 1;
                        continue;
                    }
                })
                .subject(format!("[{}] {}", self.from_name, title))
                .header(ContentType::TEXT_HTML)
                .body(html)
                .map_err(|e| anyhow!("Failed to build email: {}", e))?;

            match mailer.send(message).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    warn!(recipient = %email, error = %e, "campaign send failed for recipient");
                    report.failed += 1;
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "campaign send finished");
        Ok(report)
    }

    /// Render the campaign HTML for one recipient
    fn render_campaign(
        &self,
        title: &str,
        excerpt: Option<&str>,
        slug: &str,
        email: &str,
        token: &str,
    ) -> Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("title", title);
        ctx.insert("excerpt", &excerpt);
        ctx.insert("site_name", &self.from_name);
        ctx.insert("post_url", &format!("{}/posts/{}", self.public_url, slug));
        ctx.insert(
            "unsubscribe_url",
            &format!(
                "{}/newsletter/unsubscribe?email={}&token={}",
                self.public_url,
                urlencoding::encode(email),
                urlencoding::encode(token)
            ),
        );

        self.templates
            .render("campaign.html", &ctx)
            .context("Failed to render campaign template")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_service() -> EmailService {
        EmailService::new(&SmtpConfig::default(), "https://dawan.africa/").unwrap()
    }

    #[test]
    fn empty_host_disables_sending() {
        let service = disabled_service();
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn disabled_service_rejects_reset_send() {
        let service = disabled_service();
        let result = service.send_password_reset("user@example.com", "token").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn disabled_service_rejects_campaign_send() {
        let service = disabled_service();
        let result = service
            .send_post_campaign("Title", None, "slug", &[])
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn campaign_template_renders_links() {
        let service = disabled_service();

        let html = service
            .render_campaign(
                "Port Expansion Announced",
                Some("The port grows."),
                "port-expansion",
                "reader@example.com",
                "tok+en",
            )
            .expect("render failed");

        assert!(html.contains("Port Expansion Announced"));
        assert!(html.contains("The port grows."));
        assert!(html.contains("https://dawan.africa/posts/port-expansion"));
        assert!(html.contains("email=reader%40example.com"));
        assert!(html.contains("token=tok%2Ben"));
    }

    #[test]
    fn campaign_template_omits_missing_excerpt() {
        let service = disabled_service();

        let html = service
            .render_campaign("Title", None, "slug", "reader@example.com", "token")
            .expect("render failed");

        assert!(!html.contains("color: #444"));
    }

    #[test]
    fn public_url_trailing_slash_normalized() {
        let service = EmailService::new(&SmtpConfig::default(), "https://dawan.africa///").unwrap();
        let html = service
            .render_campaign("T", None, "s", "a@b.c", "t")
            .unwrap();
        assert!(html.contains("https://dawan.africa/posts/s"));
    }
}
