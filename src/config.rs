// ⚙️ Configuration - Environment driven, embedded reference data as fallback
//
// Every data source is optional: without overrides the binaries run the
// reference congregation (155 families, 8 elders) compiled into the crate.

use crate::directory::Directory;
use crate::publish::{Mailer, OutboxMailer, SmtpMailer};
use crate::redistribution::RedistributionTable;
use crate::roster::Roster;
use crate::rotation::RotationEngine;
use crate::week::WeekCalendar;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use envconfig::Envconfig;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "false")]
    pub ci: bool,

    #[envconfig(default = "false")]
    pub github_actions: bool,

    pub prayer_output_dir: Option<String>,

    pub prayer_directory_csv: Option<String>,

    pub prayer_roster_file: Option<String>,

    pub prayer_redistribution_table: Option<String>,

    #[envconfig(default = "2025-12-29")]
    pub prayer_reference_monday: NaiveDate,

    #[envconfig(default = "Crossville Church of Christ")]
    pub prayer_organization: String,

    #[envconfig(default = "false")]
    pub email_enabled: bool,

    pub sender_email: Option<String>,

    pub sender_password: Option<String>,

    pub recipient_emails: Option<String>, // Comma-delimited

    #[envconfig(default = "smtp.gmail.com")]
    pub smtp_server: String,

    #[envconfig(default = "587")]
    pub smtp_port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("ci", &self.ci)
            .field("github_actions", &self.github_actions)
            .field("prayer_output_dir", &self.prayer_output_dir)
            .field("prayer_directory_csv", &self.prayer_directory_csv)
            .field("prayer_roster_file", &self.prayer_roster_file)
            .field("prayer_redistribution_table", &self.prayer_redistribution_table)
            .field("prayer_reference_monday", &self.prayer_reference_monday)
            .field("prayer_organization", &self.prayer_organization)
            .field("email_enabled", &self.email_enabled)
            .field("sender_email", &self.sender_email)
            .field("sender_password", &self.sender_password.as_ref().map(|_| "<redacted>"))
            .field("recipient_emails", &self.recipient_emails)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

impl Config {
    pub fn is_ci(&self) -> bool {
        self.ci || self.github_actions
    }

    /// CI → current dir; else PRAYER_OUTPUT_DIR; else desktop; else current dir
    pub fn output_dir(&self) -> Result<PathBuf> {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        Ok(self.resolve_output_dir(dirs::desktop_dir(), cwd))
    }

    fn resolve_output_dir(&self, desktop: Option<PathBuf>, cwd: PathBuf) -> PathBuf {
        if self.is_ci() {
            return cwd;
        }
        if let Some(dir) = self.prayer_output_dir.as_deref().filter(|d| !d.trim().is_empty()) {
            return PathBuf::from(dir.trim());
        }
        match desktop {
            Some(desktop) if desktop.is_dir() => desktop,
            _ => cwd,
        }
    }

    pub fn recipients(&self) -> Vec<String> {
        self.recipient_emails
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Mail is spooled only when enabled with a sender and at least one recipient
    pub fn mail_ready(&self) -> bool {
        self.email_enabled
            && self.sender_email.as_deref().is_some_and(|s| !s.trim().is_empty())
            && !self.recipients().is_empty()
    }

    /// SMTP when a password is set; otherwise warn and spool to <output>/outbox.
    /// None when mail is disabled or not configured.
    pub fn mailer(&self, output: &Path) -> Result<Option<Box<dyn Mailer>>> {
        if !self.mail_ready() {
            return Ok(None);
        }

        let sender = self.sender_email.as_deref().unwrap_or_default().trim();
        match self.sender_password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => Ok(Some(Box::new(SmtpMailer::new(
                &self.smtp_server,
                self.smtp_port,
                sender,
                password,
                self.recipients(),
            )?))),
            None => {
                warn!("SENDER_PASSWORD not set; skipping SMTP delivery and spooling to outbox");
                Ok(Some(Box::new(OutboxMailer::in_output_dir(
                    output,
                    sender,
                    self.recipients(),
                ))))
            }
        }
    }

    // ========================================================================
    // LOADERS
    // ========================================================================

    pub fn load_directory(&self) -> Result<Directory> {
        match optional_path(&self.prayer_directory_csv) {
            Some(path) => {
                info!(path = %path.display(), "loading family directory");
                Directory::from_path(&path)
            }
            None => Directory::reference(),
        }
    }

    pub fn load_roster(&self) -> Result<Roster> {
        match optional_path(&self.prayer_roster_file) {
            Some(path) => {
                info!(path = %path.display(), "loading elder roster");
                Roster::from_file(&path)
            }
            None => Roster::reference(),
        }
    }

    pub fn load_table(&self) -> Result<RedistributionTable> {
        match optional_path(&self.prayer_redistribution_table) {
            Some(path) => {
                info!(path = %path.display(), "loading redistribution table");
                RedistributionTable::from_file(&path)
            }
            None => RedistributionTable::reference(),
        }
    }

    pub fn calendar(&self) -> Result<WeekCalendar> {
        Ok(WeekCalendar::new(self.prayer_reference_monday)?)
    }

    /// Directory + roster + table → engine; any invalid piece is fatal
    pub fn build_engine(&self) -> Result<RotationEngine> {
        let engine = RotationEngine::new(
            self.load_directory()?,
            self.load_roster()?,
            self.load_table()?,
        )
        .context("Failed to build rotation engine")?;
        Ok(engine)
    }
}

fn optional_path(value: &Option<String>) -> Option<PathBuf> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Path::new(v).to_path_buf())
}

// ============================================================================
// TESTS
// ============================================================================
