// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sends the single notification the box ever sends on its own
//! initiative: "you left your card in the box" (§4.1 `ForgottenCard`,
//! §4.6 table). One email, composed from the directory's
//! [`crate::directory::User`] record, over authenticated TLS SMTP.
//!
//! Unlike the legacy `sendmail(to=...)` call this corrects (§9 open
//! question (b)), the recipient passed to [`Notifier::notify_forgotten_card`]
//! is always honored — `email.to_address` in config names who receives
//! test/administrative mail, not the forgotten-card notice.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::EmailConfig;
use crate::error::BoxError;

pub trait Notifier: Send {
    /// Tells `to` they left their card behind at `equipment_type` in
    /// `location`. Failures are logged and otherwise swallowed (§7) —
    /// the FSM has already moved on by the time this is called.
    fn notify_forgotten_card(&self, to: &str, name: &str, equipment_type: &str, location: &str);
}

/// The real [`Notifier`], backed by `lettre`'s SMTP transport.
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from: Mailbox,
    cc: Option<Mailbox>,
    bcc: Option<Mailbox>,
    reply_to: Option<Mailbox>,
}

impl SmtpNotifier {
    /// Builds the transport and parses every configured address once at
    /// startup, so a malformed `email.*` address is caught before the FSM
    /// starts rather than on the first (rare) forgotten-card event.
    pub fn new(config: &EmailConfig) -> Result<Self, BoxError> {
        let from = parse_mailbox(&config.from_address)?;
        let cc = config.cc_address.as_deref().map(parse_mailbox).transpose()?;
        let bcc = config.bcc_address.as_deref().map(parse_mailbox).transpose()?;
        let reply_to = config.reply_to.as_deref().map(parse_mailbox).transpose()?;

        // rustls has no equivalent of OpenSSL's "HIGH:!DH:!aNULL" cipher
        // string; `builder_dangerous` (skip server certificate
        // verification) is the closest available knob for a server with
        // a certificate too weak for the default verifier.
        let builder = if config.weak_certificate {
            SmtpTransport::builder_dangerous(&config.smtp_server)
        } else {
            SmtpTransport::relay(&config.smtp_server).map_err(|e| BoxError::Notifier(e.to_string()))?
        };

        let mailer = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(config.auth_user.clone(), config.auth_password.clone()))
            .build();

        Ok(Self { mailer, from, cc, bcc, reply_to })
    }

    fn send(&self, to: &str, subject: &str, body: String) -> Result<(), BoxError> {
        let to = parse_mailbox(to)?;
        let mut builder = Message::builder().from(self.from.clone()).to(to).subject(subject);
        if let Some(cc) = &self.cc {
            builder = builder.cc(cc.clone());
        }
        if let Some(bcc) = &self.bcc {
            builder = builder.bcc(bcc.clone());
        }
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }
        let message = builder.body(body).map_err(|e| BoxError::Notifier(e.to_string()))?;
        self.mailer.send(&message).map_err(|e| BoxError::Notifier(e.to_string()))?;
        Ok(())
    }
}

impl Notifier for SmtpNotifier {
    fn notify_forgotten_card(&self, to: &str, name: &str, equipment_type: &str, location: &str) {
        let subject = forgotten_card_subject();
        let body = forgotten_card_body(name, equipment_type, location);
        if let Err(e) = self.send(to, subject, body) {
            tracing::error!(error = %e, to, "failed to send forgotten-card notification");
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, BoxError> {
    address.parse().map_err(|e| BoxError::Notifier(format!("invalid email address {address:?}: {e}")))
}

fn forgotten_card_subject() -> &'static str {
    "Access Card left in PortalBox"
}

fn forgotten_card_body(name: &str, equipment_type: &str, location: &str) -> String {
    format!("{name} it appears you left your access card in a badge box for the {equipment_type} in the {location}")
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
