use anyhow::Context;
use async_trait::async_trait;
use chrono::Local;
use common::{MailConfig, MailCredentials};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{error, info, warn};

/// A fully built message, alive only for the duration of one `send` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub from: String,
    pub to: String,
}

/// One delivery attempt over a fresh session
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// SMTP with STARTTLS. Every call builds its own transport, so each attempt
/// connects, upgrades, authenticates, sends and disconnects on its own.
pub struct SmtpMailer {
    host: String,
    port: u16,
    timeout: Duration,
    username: String,
    password: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, credentials: &MailCredentials) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            timeout: Duration::from_secs(config.timeout_seconds),
            username: credentials.from.clone(),
            password: credentials.password.clone(),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: &EmailMessage) -> anyhow::Result<()> {
        let from: Mailbox = message.from.parse().context("invalid sender address")?;
        let to: Mailbox = message.to.parse().context("invalid recipient address")?;
        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .context("failed to build email")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .context("failed to configure SMTP relay")?
            .port(self.port)
            .timeout(Some(self.timeout))
            .credentials(Credentials::new(self.username.clone(), self.password.clone()))
            .build();

        transport.send(email).await.context("SMTP send failed")?;
        Ok(())
    }
}

/// Sends the summary with bounded, fixed-backoff retries.
pub struct Notifier {
    transport: Box<dyn MailTransport>,
    from: String,
    to: String,
    max_attempts: u32,
    backoff: Duration,
}

impl Notifier {
    pub fn new(transport: Box<dyn MailTransport>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            transport,
            from: from.into(),
            to: to.into(),
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Build the message for today. The subject gets a ` - YYYY-MM-DD` suffix.
    pub fn compose(&self, subject: &str, body: &str) -> EmailMessage {
        EmailMessage {
            subject: format!("{} - {}", subject, Local::now().format("%Y-%m-%d")),
            text_body: body.to_string(),
            html_body: render_html(body),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }

    /// Deliver `body` with retries. Returns whether any attempt succeeded;
    /// failures are logged here and never returned.
    pub async fn send(&self, subject: &str, body: &str) -> bool {
        let message = self.compose(subject, body);

        for attempt in 1..=self.max_attempts {
            match self.transport.deliver(&message).await {
                Ok(()) => {
                    info!(attempt, to = %message.to, "Email sent successfully");
                    return true;
                }
                Err(e) => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %format!("{:#}", e), "Failed to send email");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }

        error!(attempts = self.max_attempts, to = %message.to, "Failed to send email after all attempts");
        false
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML part: heading plus the summary with newlines as `<br>`
fn render_html(body: &str) -> String {
    let lines = body.lines().map(escape_html).collect::<Vec<_>>().join("<br>\n");
    format!(
        "<html>\n  <body>\n    <h2>Daily News Summary</h2>\n    <p>{}</p>\n  </body>\n</html>\n",
        lines
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_body_breaks_lines_and_escapes() {
        let html = render_html("- Rates <up> & rising.\n- Second line.");
        assert!(html.contains("<h2>Daily News Summary</h2>"));
        assert!(html.contains("- Rates &lt;up&gt; &amp; rising.<br>\n- Second line."));
    }

    #[test]
    fn compose_suffixes_subject_with_date() {
        struct NoopTransport;
        #[async_trait]
        impl MailTransport for NoopTransport {
            async fn deliver(&self, _message: &EmailMessage) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let notifier = Notifier::new(Box::new(NoopTransport), "from@example.com", "to@example.com");
        let message = notifier.compose("Daily News Summary", "- One.");
        let today = Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(message.subject, format!("Daily News Summary - {}", today));
        assert_eq!(message.text_body, "- One.");
        assert_eq!(message.from, "from@example.com");
        assert_eq!(message.to, "to@example.com");
    }
}
