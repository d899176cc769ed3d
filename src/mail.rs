//! Applicant notifications: three HTML templates rendered with askama and
//! delivered over SMTP with lettre.

use askama::Template;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::Address;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;

use crate::config::SmtpSettings;

#[derive(Debug)]
pub enum MailError {
    NotConfigured,
    Template(String),
    Address(String),
    Transport(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::NotConfigured => write!(f, "Missing SMTP credentials"),
            MailError::Template(msg) => write!(f, "failed to render template: {}", msg),
            MailError::Address(msg) => write!(f, "invalid address: {}", msg),
            MailError::Transport(msg) => write!(f, "failed to send email: {}", msg),
        }
    }
}

impl std::error::Error for MailError {}

impl From<askama::Error> for MailError {
    fn from(err: askama::Error) -> Self {
        MailError::Template(err.to_string())
    }
}

#[derive(Template)]
#[template(path = "thank_you.html")]
struct ThankYouEmail<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "selected.html")]
struct SelectedEmail<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "rejection.html")]
struct RejectionEmail<'a> {
    name: &'a str,
}

/// The three messages a poster can send to an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    ThankYou,
    Selected,
    Rejection,
}

impl Notification {
    pub fn subject(&self) -> &'static str {
        match self {
            Notification::ThankYou => "Thank you for applying",
            Notification::Selected => "Congratulations! You've Been Selected for the Second Round",
            Notification::Rejection => "Application Update!",
        }
    }

    pub fn render(&self, name: &str) -> Result<String, MailError> {
        let html = match self {
            Notification::ThankYou => ThankYouEmail { name }.render()?,
            Notification::Selected => SelectedEmail { name }.render()?,
            Notification::Rejection => RejectionEmail { name }.render()?,
        };
        Ok(html)
    }
}

/// An outgoing HTML email.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Renders `notification` for `name` and hands it to `sender`.
#[tracing::instrument(skip(sender, email, name))]
pub async fn notify(
    sender: &dyn MailSender,
    notification: Notification,
    email: &str,
    name: &str,
) -> Result<(), MailError> {
    let html = notification.render(name)?;
    sender
        .send(OutgoingMail {
            to_name: name.to_string(),
            to_email: email.to_string(),
            subject: notification.subject().to_string(),
            html,
        })
        .await
}

/// Mailbox with `name` as the display name; lettre quotes it when it holds
/// commas or other specials.
pub fn mailbox(name: &str, email: &str) -> Result<Mailbox, MailError> {
    let address = email
        .trim()
        .parse::<Address>()
        .map_err(|e| MailError::Address(format!("{}: {}", email, e)))?;
    let name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
    Ok(Mailbox::new(name, address))
}

/// Builds the HTML message `from` sends for `mail`.
pub fn build_message(from: &Mailbox, mail: OutgoingMail) -> Result<Message, MailError> {
    Message::builder()
        .from(from.clone())
        .to(mailbox(&mail.to_name, &mail.to_email)?)
        .subject(mail.subject)
        .header(ContentType::TEXT_HTML)
        .body(mail.html)
        .map_err(|e| MailError::Transport(e.to_string()))
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let from = mailbox(&settings.from_name, &settings.username)?;
        let creds = Credentials::new(settings.username.clone(), settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(creds)
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => {}
            Ok(false) => return Err(MailError::Transport("SMTP configuration error".to_string())),
            Err(e) => {
                tracing::error!("SMTP verification failed: {}", e);
                return Err(MailError::Transport("SMTP configuration error".to_string()));
            }
        }

        let to_email = mail.to_email.clone();
        let message = build_message(&self.from, mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        tracing::info!(to = %to_email, "Email sent");
        Ok(())
    }
}

/// Stand-in when SMTP settings are missing; every send fails.
pub struct UnconfiguredMailer;

#[async_trait]
impl MailSender for UnconfiguredMailer {
    async fn send(&self, _mail: OutgoingMail) -> Result<(), MailError> {
        tracing::error!("Missing SMTP credentials in environment variables.");
        Err(MailError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_greet_by_name() {
        for notification in [Notification::ThankYou, Notification::Selected, Notification::Rejection] {
            let html = notification.render("Ada Lovelace").unwrap();
            assert!(html.contains("Dear Ada Lovelace,"), "{:?}", notification);
        }
    }

    #[test]
    fn names_are_html_escaped() {
        let html = Notification::ThankYou.render("<script>").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn selected_subject() {
        assert_eq!(
            Notification::Selected.subject(),
            "Congratulations! You've Been Selected for the Second Round"
        );
    }

    #[test]
    fn display_names_with_commas_are_quoted() {
        for name in ["Doe, John", "John Q. Public", "Ada Lovelace"] {
            let mb = mailbox(name, "john@example.com").unwrap();
            assert_eq!(mb.name.as_deref(), Some(name));
            assert_eq!(mb.email.to_string(), "john@example.com");
        }
        assert!(mailbox("Doe, John", "not an address").is_err());
    }

    #[test]
    fn message_builds_for_comma_names() {
        let from = mailbox("Job Portal", "jobs@example.com").unwrap();
        let message = build_message(
            &from,
            OutgoingMail {
                to_name: "Doe, John".to_string(),
                to_email: "john@example.com".to_string(),
                subject: Notification::ThankYou.subject().to_string(),
                html: Notification::ThankYou.render("Doe, John").unwrap(),
            },
        )
        .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("\"Doe, John\" <john@example.com>"), "{}", raw);
    }
}
