// 📤 Publishing - Current-week files, archive, outbound mail
//
// Collaborators downstream of the engine. Failures here are reported to the
// caller; they never change what was computed.

use crate::render::MailMessage;
use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CURRENT_TEXT: &str = "Prayer_Schedule_Current_Week.txt";
pub const CURRENT_HTML: &str = "Prayer_Schedule_Current_Week.html";
pub const ARCHIVE_DIR: &str = "archive";
pub const OUTBOX_DIR: &str = "outbox";

/// Only the head of the file is searched for the week header
const HEADER_CHARS: usize = 300;

static WEEK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)WEEK (\d+)").expect("hard-coded regular expression to be valid")
});

// ============================================================================
// CURRENT-WEEK FILES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedFiles {
    pub text: PathBuf,
    pub html: PathBuf,
}

/// Overwrite the current-week text and HTML schedules in `dir`
pub fn write_current_files(dir: &Path, html: &str, text: &str) -> Result<PublishedFiles> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let files = PublishedFiles {
        text: dir.join(CURRENT_TEXT),
        html: dir.join(CURRENT_HTML),
    };

    fs::write(&files.html, html)
        .with_context(|| format!("Failed to write HTML schedule: {}", files.html.display()))?;
    fs::write(&files.text, text)
        .with_context(|| format!("Failed to write text schedule: {}", files.text.display()))?;

    info!(path = %files.text.display(), "updated current-week schedule");
    Ok(files)
}

// ============================================================================
// ARCHIVE
// ============================================================================

/// Week number from a "WEEK N" header near the top of a schedule
pub fn header_week(content: &str) -> Option<u32> {
    let head: String = content.chars().take(HEADER_CHARS).collect();

    WEEK_HEADER
        .captures(&head)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// archive/Prayer_Schedule_<date>[_Week<N>].txt
pub fn archive_name(today: NaiveDate, week: Option<u32>) -> String {
    match week {
        Some(week) => format!("Prayer_Schedule_{}_Week{}.txt", today.format("%Y-%m-%d"), week),
        None => format!("Prayer_Schedule_{}.txt", today.format("%Y-%m-%d")),
    }
}

/// Move the existing current-week text schedule into `archive/`.
///
/// Returns the archived path, or None when there was nothing to archive.
pub fn archive_previous_schedule(dir: &Path, today: NaiveDate) -> Result<Option<PathBuf>> {
    let current = dir.join(CURRENT_TEXT);
    if !current.exists() {
        info!("no previous schedule to archive");
        return Ok(None);
    }

    let content = fs::read_to_string(&current)
        .with_context(|| format!("Failed to read previous schedule: {}", current.display()))?;
    let week = header_week(&content);
    if week.is_none() {
        debug!("previous schedule has no WEEK header");
    }

    let archive_dir = dir.join(ARCHIVE_DIR);
    fs::create_dir_all(&archive_dir)
        .with_context(|| format!("Failed to create archive directory: {}", archive_dir.display()))?;

    let target = archive_dir.join(archive_name(today, week));
    fs::copy(&current, &target)
        .with_context(|| format!("Failed to copy schedule to {}", target.display()))?;
    fs::remove_file(&current)
        .with_context(|| format!("Failed to remove {}", current.display()))?;

    info!(path = %target.display(), "archived previous schedule");
    Ok(Some(target))
}

// ============================================================================
// MAIL
// ============================================================================

/// Where a message ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Spooled(PathBuf),
    Sent { relay: String, recipients: usize },
}

/// Outbound mail transport
pub trait Mailer {
    fn name(&self) -> &'static str;

    fn send(&self, message: &MailMessage) -> Result<Delivery>;
}

/// Header values are single-line; CR/LF collapse to a space
fn header_text(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .with_context(|| format!("Invalid email address: {:?}", address))
}

/// Plain-text RFC 5322 message; lettre handles encoded words and transfer encoding
pub fn build_message(sender: &str, recipients: &[String], message: &MailMessage) -> Result<Message> {
    if recipients.is_empty() {
        bail!("No recipients for {:?}", message.subject);
    }

    let mut builder = Message::builder()
        .from(mailbox(sender)?)
        .subject(header_text(&message.subject))
        .header(ContentType::TEXT_PLAIN);
    for recipient in recipients {
        builder = builder.to(mailbox(recipient)?);
    }

    builder
        .body(message.body.clone())
        .with_context(|| format!("Failed to build message {:?}", message.subject))
}

// ============================================================================
// SMTP
// ============================================================================

/// STARTTLS relay with password login (Gmail app passwords by default)
pub struct SmtpMailer {
    transport: SmtpTransport,
    relay: String,
    sender: String,
    recipients: Vec<String>,
}

impl SmtpMailer {
    pub fn new(
        relay: &str,
        port: u16,
        sender: &str,
        password: &str,
        recipients: Vec<String>,
    ) -> Result<Self> {
        let transport = SmtpTransport::starttls_relay(relay)
            .with_context(|| format!("Failed to configure SMTP relay {}", relay))?
            .port(port)
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();

        Ok(SmtpMailer {
            transport,
            relay: format!("{}:{}", relay, port),
            sender: sender.to_string(),
            recipients,
        })
    }
}

impl Mailer for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn send(&self, message: &MailMessage) -> Result<Delivery> {
        let email = build_message(&self.sender, &self.recipients, message)?;

        debug!(relay = %self.relay, sender = %self.sender, "connecting to SMTP relay");
        self.transport
            .send(&email)
            .with_context(|| format!("Failed to send {:?} via {}", message.subject, self.relay))?;

        info!(
            subject = %message.subject,
            recipients = self.recipients.len(),
            relay = %self.relay,
            "sent message"
        );
        Ok(Delivery::Sent {
            relay: self.relay.clone(),
            recipients: self.recipients.len(),
        })
    }
}

// ============================================================================
// OUTBOX
// ============================================================================

/// Writes messages into a spool directory for an external MTA
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    outbox: PathBuf,
    sender: String,
    recipients: Vec<String>,
}

impl OutboxMailer {
    pub fn new(outbox: PathBuf, sender: &str, recipients: Vec<String>) -> Self {
        OutboxMailer {
            outbox,
            sender: sender.to_string(),
            recipients,
        }
    }

    /// <output>/outbox
    pub fn in_output_dir(dir: &Path, sender: &str, recipients: Vec<String>) -> Self {
        Self::new(dir.join(OUTBOX_DIR), sender, recipients)
    }
}

impl Mailer for OutboxMailer {
    fn name(&self) -> &'static str {
        "outbox"
    }

    fn send(&self, message: &MailMessage) -> Result<Delivery> {
        let email = build_message(&self.sender, &self.recipients, message)?;

        fs::create_dir_all(&self.outbox)
            .with_context(|| format!("Failed to create outbox: {}", self.outbox.display()))?;

        let stem = format!(
            "{}-{}",
            Local::now().format("%Y%m%d-%H%M%S%3f"),
            slug(&message.subject)
        );
        let path = unique_path(&self.outbox, &stem);

        fs::write(&path, email.formatted())
            .with_context(|| format!("Failed to spool message: {}", path.display()))?;

        info!(
            subject = %message.subject,
            recipients = self.recipients.len(),
            path = %path.display(),
            "spooled message"
        );
        Ok(Delivery::Spooled(path))
    }
}

/// Lowercase ASCII, runs of anything else collapsed to '-'
fn slug(subject: &str) -> String {
    let mut slug = String::new();
    for c in subject.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').chars().take(60).collect()
}

fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.eml", stem));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}.eml", stem, n));
        n += 1;
    }
    path
}

// ============================================================================
// TESTS
// ============================================================================
