//! Configuration for the invitation mailer.

/// Settings used when building invitation emails.
#[derive(Debug, Clone, PartialEq)]
pub struct MailerConfig {
    /// Public URL of the web application; RSVP links hang off it.
    pub base_url: String,
    /// Reply-To set on every invitation email.
    pub reply_to: Option<String>,
}

impl MailerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reply_to: None,
        }
    }

    /// Load from `INVITATIONS_BASE_URL` and `INVITATIONS_REPLY_TO`.
    pub fn from_env() -> Self {
        let base_url = std::env::var("INVITATIONS_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            reply_to: std::env::var("INVITATIONS_REPLY_TO")
                .ok()
                .filter(|v| !v.is_empty()),
            ..Self::new(base_url)
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn workshop_invitation_url(&self, token: &str) -> String {
        format!("{}/invitation/{}", self.base_url, token)
    }

    pub fn event_invitation_url(&self, token: &str) -> String {
        format!("{}/events/invitation/{}", self.base_url, token)
    }

    pub fn course_invitation_url(&self, token: &str) -> String {
        format!("{}/course/invitation/{}", self.base_url, token)
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
