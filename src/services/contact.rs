//! Contact form submissions
//!
//! Visitors submit the public contact form; staff triage the submissions and
//! convert the promising ones into pipeline leads.

use crate::db::repositories::{ContactRepository, LeadRepository};
use crate::models::{
    Contact, ContactStatus, CreateContactInput, CreateLeadInput, Lead, LeadSource, ListParams,
    PagedResult,
};
use crate::services::error::{clean_optional, is_valid_email, require_text, ServiceError, ServiceResult};
use crate::services::lead::new_lead;
use crate::services::mailer::{contact_notification, DynMailer};
use anyhow::Context;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;

/// Longest accepted message body, in characters
const MAX_MESSAGE_LEN: usize = 5000;

/// Where new-contact notifications go
#[derive(Clone)]
pub struct ContactNotifier {
    pub mailer: DynMailer,
    pub notify_to: String,
    pub site_name: String,
}

pub struct ContactService {
    contact_repo: Arc<dyn ContactRepository>,
    lead_repo: Arc<dyn LeadRepository>,
    notifier: Option<ContactNotifier>,
}

impl ContactService {
    pub fn new(contact_repo: Arc<dyn ContactRepository>, lead_repo: Arc<dyn LeadRepository>) -> Self {
        Self {
            contact_repo,
            lead_repo,
            notifier: None,
        }
    }

    /// Send a mail to the firm for every new submission
    pub fn with_notifier(mut self, notifier: Option<ContactNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Store a public submission as `pending`
    pub async fn submit(&self, input: CreateContactInput, ip_address: Option<String>) -> ServiceResult<Contact> {
        require_text("name", &input.name)?;
        require_text("email", &input.email)?;
        require_text("message", &input.message)?;
        if !is_valid_email(&input.email) {
            return Err(ServiceError::validation("Invalid email format"));
        }
        if input.message.chars().count() > MAX_MESSAGE_LEN {
            return Err(ServiceError::validation(format!(
                "message must be at most {} characters",
                MAX_MESSAGE_LEN
            )));
        }

        let now = Utc::now();
        let contact = Contact {
            id: 0,
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: clean_optional(input.phone),
            subject: clean_optional(input.subject),
            service: clean_optional(input.service),
            message: input.message.trim().to_string(),
            status: ContactStatus::Pending,
            lead_id: None,
            ip_address,
            created_at: now,
            updated_at: now,
        };
        let created = self
            .contact_repo
            .create(&contact)
            .await
            .context("Failed to store contact")?;

        if let Some(notifier) = self.notifier.clone() {
            let contact = created.clone();
            tokio::spawn(async move {
                let (subject, body) = contact_notification(&notifier.site_name, &contact);
                if let Err(e) = notifier.mailer.send(&notifier.notify_to, &subject, &body).await {
                    tracing::warn!("Failed to send notification for contact {}: {}", contact.id, e);
                }
            });
        }

        Ok(created)
    }

    pub async fn list(&self, status: Option<&str>, params: &ListParams) -> ServiceResult<PagedResult<Contact>> {
        let status = status.map(parse_status).transpose()?;
        let (contacts, total) = self
            .contact_repo
            .list(status, params)
            .await
            .context("Failed to list contacts")?;
        Ok(PagedResult::new(contacts, total, params))
    }

    /// Fetch a submission, marking it read the first time staff open it
    pub async fn get(&self, id: i64) -> ServiceResult<Contact> {
        let mut contact = self.require(id).await?;
        if contact.status == ContactStatus::Pending {
            self.contact_repo
                .set_status(id, ContactStatus::Read)
                .await
                .context("Failed to mark contact read")?;
            contact.status = ContactStatus::Read;
        }
        Ok(contact)
    }

    pub async fn set_status(&self, id: i64, status: &str) -> ServiceResult<Contact> {
        let status = parse_status(status)?;
        self.require(id).await?;
        self.contact_repo
            .set_status(id, status)
            .await
            .context("Failed to update contact status")?;
        self.require(id).await
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.require(id).await?;
        self.contact_repo
            .delete(id)
            .await
            .context("Failed to delete contact")?;
        Ok(())
    }

    /// Turn a submission into a `new` lead and link the two
    pub async fn convert(&self, id: i64) -> ServiceResult<Lead> {
        let contact = self.require(id).await?;
        if let Some(lead_id) = contact.lead_id {
            return Err(ServiceError::conflict(format!(
                "Contact already converted to lead {}",
                lead_id
            )));
        }

        let lead = new_lead(CreateLeadInput {
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            company: None,
            service_interest: contact.service.clone(),
            message: Some(contact.message.clone()),
            source: LeadSource::ContactForm,
            estimated_value: None,
            owner_id: None,
            contact_id: Some(contact.id),
        });
        // The link-back only succeeds while the contact is unlinked, so a
        // concurrent convert that lost the race lands here.
        let created = self
            .lead_repo
            .create_from_contact(&lead, contact.id)
            .await
            .context("Failed to convert contact")?
            .ok_or_else(|| ServiceError::conflict("Contact already converted"))?;

        tracing::info!("Contact {} converted to lead {}", contact.id, created.id);
        Ok(created)
    }

    pub async fn count_pending(&self) -> ServiceResult<i64> {
        let count = self
            .contact_repo
            .count_by_status(ContactStatus::Pending)
            .await
            .context("Failed to count contacts")?;
        Ok(count)
    }

    async fn require(&self, id: i64) -> ServiceResult<Contact> {
        self.contact_repo
            .get_by_id(id)
            .await
            .context("Failed to get contact")?
            .ok_or_else(|| ServiceError::not_found("Contact"))
    }
}

fn parse_status(value: &str) -> ServiceResult<ContactStatus> {
    ContactStatus::from_str(value).map_err(|_| {
        ServiceError::validation(format!(
            "Invalid status '{}'. Valid values: {}",
            value,
            ContactStatus::values().join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxContactRepository, SqlxLeadRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{LeadFilter, LeadStatus};
    use crate::services::mailer::Mailer;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("smtp unavailable"))
        }
    }

    async fn setup_service() -> (ContactService, Arc<dyn LeadRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        let leads = SqlxLeadRepository::boxed(pool.clone());
        (
            ContactService::new(SqlxContactRepository::boxed(pool), leads.clone()),
            leads,
        )
    }

    fn input() -> CreateContactInput {
        CreateContactInput {
            name: "Maria Silva".into(),
            email: "Maria@Example.com".into(),
            phone: Some("555-0100".into()),
            subject: Some("  ".into()),
            service: Some("labor".into()),
            message: "I was dismissed without notice.".into(),
        }
    }

    #[tokio::test]
    async fn test_submit_validates() {
        let (service, _) = setup_service().await;

        let mut missing = input();
        missing.message = " ".into();
        assert!(matches!(
            service.submit(missing, None).await,
            Err(ServiceError::Validation(_))
        ));

        let mut bad_email = input();
        bad_email.email = "maria".into();
        assert!(matches!(
            service.submit(bad_email, None).await,
            Err(ServiceError::Validation(_))
        ));

        let contact = service.submit(input(), Some("10.0.0.1".into())).await.unwrap();
        assert_eq!(contact.status, ContactStatus::Pending);
        assert_eq!(contact.email, "maria@example.com");
        assert!(contact.subject.is_none());
        assert_eq!(contact.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_submit_notifies_firm() {
        let (service, _) = setup_service().await;
        let mailer = Arc::new(RecordingMailer::default());
        let service = service.with_notifier(Some(ContactNotifier {
            mailer: mailer.clone(),
            notify_to: "office@firm.example".into(),
            site_name: "Silva & Co".into(),
        }));

        service.submit(input(), None).await.unwrap();
        for _ in 0..50 {
            if !mailer.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "office@firm.example");
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_fail_submit() {
        let (service, _) = setup_service().await;
        let service = service.with_notifier(Some(ContactNotifier {
            mailer: Arc::new(FailingMailer),
            notify_to: "office@firm.example".into(),
            site_name: "Firm".into(),
        }));
        assert!(service.submit(input(), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_marks_pending_read() {
        let (service, _) = setup_service().await;
        let contact = service.submit(input(), None).await.unwrap();

        assert_eq!(service.get(contact.id).await.unwrap().status, ContactStatus::Read);
        assert_eq!(service.count_pending().await.unwrap(), 0);

        service.set_status(contact.id, "archived").await.unwrap();
        assert_eq!(
            service.get(contact.id).await.unwrap().status,
            ContactStatus::Archived
        );
        assert!(matches!(
            service.set_status(contact.id, "spam").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (service, _) = setup_service().await;
        let first = service.submit(input(), None).await.unwrap();
        service.submit(input(), None).await.unwrap();
        service.set_status(first.id, "archived").await.unwrap();

        let params = ListParams::default();
        assert_eq!(service.list(None, &params).await.unwrap().total, 2);
        assert_eq!(service.list(Some("pending"), &params).await.unwrap().total, 1);
        assert!(service.list(Some("bogus"), &params).await.is_err());
    }

    #[tokio::test]
    async fn test_convert_creates_linked_lead() {
        let (service, leads) = setup_service().await;
        let contact = service.submit(input(), None).await.unwrap();

        let lead = service.convert(contact.id).await.unwrap();
        assert_eq!(lead.source, LeadSource::ContactForm);
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.contact_id, Some(contact.id));
        assert_eq!(lead.service_interest.as_deref(), Some("labor"));
        assert!(leads.get_by_id(lead.id).await.unwrap().is_some());

        let reloaded = service.get(contact.id).await.unwrap();
        assert_eq!(reloaded.lead_id, Some(lead.id));
        assert_eq!(reloaded.status, ContactStatus::Read);

        assert!(matches!(
            service.convert(contact.id).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(service.convert(9999).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_convert_creates_one_lead() {
        let (service, leads) = setup_service().await;
        let contact = service.submit(input(), None).await.unwrap();

        let (a, b) = tokio::join!(service.convert(contact.id), service.convert(contact.id));
        let converted: Vec<_> = [&a, &b].into_iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(converted.len(), 1);
        assert!([&a, &b]
            .iter()
            .any(|r| matches!(r, Err(ServiceError::Conflict(_)))));

        let (all, total) = leads
            .list(&LeadFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(all[0].id, converted[0].id);
        assert_eq!(
            service.get(contact.id).await.unwrap().lead_id,
            Some(converted[0].id)
        );
    }
}
