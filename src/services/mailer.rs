//! Outgoing mail
//!
//! Only used to tell the firm about new contact-form submissions. Delivery
//! happens off the request path and failures are logged, never returned to
//! the visitor.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::MailConfig;
use crate::models::Contact;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

pub type DynMailer = Arc<dyn Mailer>;

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        if config.smtp_host.trim().is_empty() {
            return Err(anyhow!("SMTP host not configured"));
        }
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(config.smtp_port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

/// Build the configured mailer, or `None` when mail is disabled or unusable
pub fn create_mailer(config: &MailConfig) -> Option<DynMailer> {
    if !config.enabled {
        return None;
    }
    if config.notify_to.trim().is_empty() {
        tracing::warn!("Mail enabled but no notify_to address configured");
        return None;
    }
    match SmtpMailer::new(config) {
        Ok(mailer) => Some(Arc::new(mailer)),
        Err(e) => {
            tracing::warn!("Mail disabled: {}", e);
            None
        }
    }
}

/// Subject and body of the "new contact" notification
pub fn contact_notification(site_name: &str, contact: &Contact) -> (String, String) {
    let subject = format!(
        "[{}] New contact: {}",
        site_name,
        contact.subject.as_deref().unwrap_or(&contact.name)
    );

    let mut body = format!("Name: {}\nEmail: {}\n", contact.name, contact.email);
    if let Some(phone) = &contact.phone {
        body.push_str(&format!("Phone: {}\n", phone));
    }
    if let Some(service) = &contact.service {
        body.push_str(&format!("Service: {}\n", service));
    }
    body.push_str(&format!("\n{}\n", contact.message));

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactStatus;
    use chrono::Utc;

    fn contact() -> Contact {
        let now = Utc::now();
        Contact {
            id: 1,
            name: "Maria Silva".into(),
            email: "maria@example.com".into(),
            phone: Some("555-0100".into()),
            subject: None,
            service: Some("labor".into()),
            message: "I need help with a dismissal.".into(),
            status: ContactStatus::Pending,
            lead_id: None,
            ip_address: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_contact_notification() {
        let (subject, body) = contact_notification("Silva & Co", &contact());
        assert_eq!(subject, "[Silva & Co] New contact: Maria Silva");
        assert!(body.contains("Email: maria@example.com"));
        assert!(body.contains("Service: labor"));
        assert!(body.ends_with("I need help with a dismissal.\n"));
    }

    #[test]
    fn test_disabled_mail_creates_no_mailer() {
        assert!(create_mailer(&MailConfig::default()).is_none());

        let config = MailConfig {
            enabled: true,
            ..MailConfig::default()
        };
        assert!(create_mailer(&config).is_none());
    }
}
