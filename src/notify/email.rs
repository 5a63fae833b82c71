// src/notify/email.rs
//! SMTP delivery of the pulse report.

use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::report::SynthesizedReport;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// Missing credentials are an error here so the caller can downgrade
    /// the channel to a warning and keep the run going.
    pub fn from_env(recipient: &str) -> Result<Self> {
        let host = std::env::var("PULSE_SMTP_HOST").context("PULSE_SMTP_HOST missing")?;
        let user = std::env::var("PULSE_SMTP_USER").context("PULSE_SMTP_USER missing")?;
        let pass = std::env::var("PULSE_SMTP_PASS").context("PULSE_SMTP_PASS missing")?;
        let from_addr = std::env::var("PULSE_EMAIL_FROM").context("PULSE_EMAIL_FROM missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid PULSE_SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid PULSE_EMAIL_FROM")?;
        let to = recipient.parse().context("invalid recipient address")?;

        Ok(Self { mailer, from, to })
    }

    pub async fn send_report(
        &self,
        report: &SynthesizedReport,
        date_range: Option<&str>,
    ) -> Result<()> {
        if report.items.is_empty() {
            return Ok(());
        }

        let mut subject = format!("Field Pulse: {} new technical updates", report.items.len());
        if let Some(range) = date_range {
            subject.push_str(&format!(" ({range})"));
        }

        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_HTML)
            .body(html_report(report, date_range))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        tracing::info!("emailed pulse report");
        Ok(())
    }
}

/// Minimal HTML rendering grouped by source.
pub fn html_report(report: &SynthesizedReport, date_range: Option<&str>) -> String {
    let mut out = String::from("<html><body style=\"font-family: sans-serif;\">");
    out.push_str("<h1>Field Pulse</h1>");
    if let Some(range) = date_range {
        out.push_str(&format!("<p><b>Pulse period:</b> {range}</p>"));
    }
    out.push_str(&format!("<p><i>{}</i></p><hr/>", report.tldr));

    let mut last_source = "";
    for item in &report.items {
        if item.source != last_source {
            out.push_str(&format!("<h2>{}</h2>", item.source));
            last_source = &item.source;
        }
        out.push_str(&format!("<h3>{}</h3>", item.title));
        if let Some(bridge) = &item.bridge {
            out.push_str(&format!("<p><b>Field impact:</b> {bridge}</p>"));
        }
        if !item.summary.is_empty() {
            out.push_str(&format!("<p>{}</p>", item.summary));
        }
        if !item.source_url.is_empty() {
            out.push_str(&format!(
                "<p><a href=\"{}\">Read full update</a></p>",
                item.source_url
            ));
        }
    }
    out.push_str("</body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::UpdateRecord;

    #[test]
    fn html_groups_by_source() {
        let mut a = UpdateRecord::from_feed(
            Some("First".into()),
            None,
            String::new(),
            String::new(),
            None,
        );
        a.source = "vertex".into();
        let mut b = a.clone();
        b.title = "Second".into();
        let mut c = a.clone();
        c.title = "Other".into();
        c.source = "gemini".into();

        let report = SynthesizedReport {
            items: vec![a, b, c],
            tldr: "tl;dr".into(),
        };
        let html = html_report(&report, None);
        // one heading per source, not per item
        assert_eq!(html.matches("<h2>vertex</h2>").count(), 1);
        assert_eq!(html.matches("<h2>gemini</h2>").count(), 1);
    }

    #[serial_test::serial]
    #[test]
    fn missing_credentials_are_an_error_not_a_panic() {
        std::env::remove_var("PULSE_SMTP_HOST");
        assert!(EmailSender::from_env("dev@example.com").is_err());
    }
}
