//! Errors shared by the content and pipeline services

/// Error types for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The requested record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The write conflicts with existing state (duplicate slug, already converted)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Reject blank required text fields
pub fn require_text(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Minimal email shape check: one `@` with text on both sides and a dot in the domain
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// Trim an optional text field, mapping blank to `None`
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("client@firm.example"));
        assert!(is_valid_email("  a.b+c@d.co "));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@firm.example"));
        assert!(!is_valid_email("client@localhost"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("two words@firm.example"));
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("name", "Ana").is_ok());
        assert!(matches!(
            require_text("name", "   "),
            Err(ServiceError::Validation(msg)) if msg == "name is required"
        ));
    }

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  x ".into())), Some("x".to_string()));
        assert_eq!(clean_optional(Some("   ".into())), None);
        assert_eq!(clean_optional(None), None);
    }
}
