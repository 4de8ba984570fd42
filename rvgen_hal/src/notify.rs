//! Alert delivery.
//!
//! Alert-worthy controller events are sent through a [`Notifier`]. Delivery is
//! best-effort: the runner logs a failure and moves on.

use rvgen_common::hal::config::GeneratorConfig;
use thiserror::Error;

/// Alert delivery errors.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// Notifier settings are unusable (bad address, bad relay host).
    #[error("Notifier configuration error: {0}")]
    Config(String),

    /// The message could not be built or sent.
    #[error("Alert delivery failed: {0}")]
    Delivery(String),

    /// The requested transport is not compiled in.
    #[error("Alert transport unsupported: {0}")]
    Unsupported(String),
}

/// Outbound alert channel.
pub trait Notifier {
    /// Transport identifier.
    fn name(&self) -> &'static str;

    /// Send one plain-text alert.
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Alert body: the event message followed by recent event-log lines.
pub fn alert_body(message: &str, recent: &[String]) -> String {
    let mut body = String::from(message);
    if !recent.is_empty() {
        body.push_str("\n\nRecent log:\n");
        for line in recent {
            body.push_str(line);
            body.push('\n');
        }
    }
    body
}

/// Build the notifier described by the configuration, if any.
///
/// # Errors
/// `NotifyError::Unsupported` when SMTP is configured but the binary was built
/// without the `email` feature; `NotifyError::Config` for unusable settings.
pub fn build_notifier(config: &GeneratorConfig) -> Result<Option<Box<dyn Notifier>>, NotifyError> {
    let Some(smtp) = &config.smtp else {
        return Ok(None);
    };

    #[cfg(feature = "email")]
    {
        let notifier = smtp::SmtpNotifier::new(smtp, &config.shared.service_name)?;
        Ok(Some(Box::new(notifier)))
    }

    #[cfg(not(feature = "email"))]
    {
        Err(NotifyError::Unsupported(format!(
            "SMTP relay {} configured but rvgen was built without the `email` feature",
            smtp.host
        )))
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpNotifier;

#[cfg(feature = "email")]
mod smtp {
    use super::{Notifier, NotifyError};
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{Message, SmtpTransport, Transport};
    use rvgen_common::hal::config::SmtpSettings;
    use tracing::info;

    /// SMTP submission through `lettre`.
    pub struct SmtpNotifier {
        transport: SmtpTransport,
        from: Mailbox,
        to: Vec<Mailbox>,
    }

    impl SmtpNotifier {
        /// Build the transport and parse every address up front.
        pub fn new(settings: &SmtpSettings, sender_name: &str) -> Result<Self, NotifyError> {
            let builder = if settings.tls {
                SmtpTransport::starttls_relay(&settings.host)
                    .map_err(|e| NotifyError::Config(format!("{}: {e}", settings.host)))?
            } else {
                SmtpTransport::builder_dangerous(&settings.host)
            };
            let mut builder = builder.port(settings.port);
            if let (Some(user), Some(password)) = (&settings.username, &settings.password) {
                builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
            }

            let address = settings
                .from
                .parse()
                .map_err(|e| NotifyError::Config(format!("from {:?}: {e}", settings.from)))?;
            let from = Mailbox::new(Some(sender_name.to_string()), address);
            let to = settings
                .recipients
                .iter()
                .map(|r| {
                    r.parse::<Mailbox>()
                        .map_err(|e| NotifyError::Config(format!("recipient {r:?}: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()?;

            info!(
                "SMTP alerts via {}:{} to {} recipient(s)",
                settings.host,
                settings.port,
                to.len()
            );
            Ok(Self {
                transport: builder.build(),
                from,
                to,
            })
        }
    }

    impl Notifier for SmtpNotifier {
        fn name(&self) -> &'static str {
            "smtp"
        }

        fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
            let mut message = Message::builder()
                .from(self.from.clone())
                .subject(subject)
                .header(ContentType::TEXT_PLAIN);
            for to in &self.to {
                message = message.to(to.clone());
            }
            let message = message
                .body(body.to_string())
                .map_err(|e| NotifyError::Delivery(e.to_string()))?;

            self.transport
                .send(&message)
                .map(|_| ())
                .map_err(|e| NotifyError::Delivery(e.to_string()))
        }
    }

}
