//! Outgoing mail: sign-in codes and admin invites.
//!
//! Each message is rendered from a pair of askama templates (HTML and plain
//! text) into an [`Outgoing`], then handed to the SMTP relay as a
//! `multipart/alternative` message.

use askama::Template;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

const LOGIN_CODE_SUBJECT: &str = "รหัสเข้าสู่ระบบ / Sign-in code";
const INVITE_SUBJECT: &str = "คำเชิญเข้าร่วมเป็นผู้ดูแลระบบ / Admin invitation";

/// Values rendered into an invite email.
#[derive(Debug, Clone)]
pub struct InviteEmail<'a> {
    pub inviter: &'a str,
    pub role_label: &'a str,
    pub department_label: &'a str,
    pub accept_url: &'a str,
    /// Already formatted for display.
    pub expires_on: &'a str,
}

#[derive(Template)]
#[template(path = "email/invite.html")]
struct InviteHtml<'a> {
    invite: &'a InviteEmail<'a>,
}

#[derive(Template)]
#[template(path = "email/invite.txt")]
struct InviteText<'a> {
    invite: &'a InviteEmail<'a>,
}

#[derive(Template)]
#[template(path = "email/login_code.html")]
struct LoginCodeHtml<'a> {
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "email/login_code.txt")]
struct LoginCodeText<'a> {
    code: &'a str,
    minutes: i64,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message, not yet addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Outgoing {
    subject: &'static str,
    text: String,
    html: String,
}

impl Outgoing {
    fn login_code(code: &str, minutes: i64) -> Result<Self, EmailError> {
        Ok(Self {
            subject: LOGIN_CODE_SUBJECT,
            text: LoginCodeText { code, minutes }.render()?,
            html: LoginCodeHtml { code, minutes }.render()?,
        })
    }

    fn invite(invite: &InviteEmail<'_>) -> Result<Self, EmailError> {
        Ok(Self {
            subject: INVITE_SUBJECT,
            text: InviteText { invite }.render()?,
            html: InviteHtml { invite }.render()?,
        })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_owned()))
}

/// SMTP sender shared through `AppState`.
#[derive(Clone)]
pub struct EmailService {
    relay: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Build a STARTTLS relay from the SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay host is unusable or the from address
    /// does not parse.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );
        let relay = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            relay,
            from: mailbox(&config.from_address)?,
        })
    }

    /// Send a one-time sign-in code valid for `minutes`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or delivery fails.
    pub async fn send_login_code(&self, to: &str, code: &str, minutes: i64) -> Result<(), EmailError> {
        self.deliver(to, Outgoing::login_code(code, minutes)?).await
    }

    /// Send an invite link.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or delivery fails.
    pub async fn send_invite(&self, to: &str, invite: &InviteEmail<'_>) -> Result<(), EmailError> {
        self.deliver(to, Outgoing::invite(invite)?).await
    }

    #[tracing::instrument(skip(self, outgoing), fields(subject = outgoing.subject))]
    async fn deliver(&self, to: &str, outgoing: Outgoing) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mailbox(to)?)
            .subject(outgoing.subject)
            .multipart(MultiPart::alternative_plain_html(outgoing.text, outgoing.html))?;

        self.relay.send(message).await?;
        tracing::info!("email delivered");
        Ok(())
    }
}

/// Six random digits, never starting with zero.
#[must_use]
pub fn generate_login_code() -> String {
    use rand::Rng;
    rand::rng().random_range(100_000_u32..1_000_000).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ACCEPT_URL: &str = "https://console.uni.ac.th/invite/accept?token=abc";

    fn invite() -> InviteEmail<'static> {
        InviteEmail {
            inviter: "dean@uni.ac.th",
            role_label: "ผู้ดูข้อมูล",
            department_label: "คณะวิทยาศาสตร์",
            accept_url: ACCEPT_URL,
            expires_on: "2026-01-08",
        }
    }

    #[test]
    fn test_login_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_login_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn test_invite_renders_both_parts() {
        let outgoing = Outgoing::invite(&invite()).unwrap();
        assert_eq!(outgoing.subject, INVITE_SUBJECT);
        assert!(outgoing.text.contains(ACCEPT_URL));
        assert!(outgoing.text.contains("คณะวิทยาศาสตร์"));
        assert!(outgoing.html.contains("token=abc"));
        assert!(outgoing.html.contains("2026-01-08"));
    }

    #[test]
    fn test_login_code_renders_expiry() {
        let outgoing = Outgoing::login_code("482913", 10).unwrap();
        assert_eq!(outgoing.subject, LOGIN_CODE_SUBJECT);
        assert!(outgoing.text.contains("482913"));
        assert!(outgoing.html.contains("10 นาที"));
    }

    #[test]
    fn test_bad_addresses_rejected() {
        assert!(mailbox("noreply@uni.ac.th").is_ok());
        assert!(matches!(mailbox("not an address"), Err(EmailError::InvalidAddress(_))));
    }
}
