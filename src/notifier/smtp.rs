use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::error::NotifyError;
use crate::notifier::{Notification, Notifier};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> std::result::Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Permanent(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Permanent(format!("invalid SMTP_FROM: {}", e)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(
        &self,
        to: &str,
        notification: &Notification,
    ) -> std::result::Result<(), NotifyError> {
        // An unparseable recipient can never succeed, so it is permanent.
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Permanent(format!("invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject())
            .body(notification.body())
            .map_err(|e| NotifyError::Permanent(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                NotifyError::Permanent(e.to_string())
            } else {
                NotifyError::Transient(e.to_string())
            }
        })?;

        Ok(())
    }
}
