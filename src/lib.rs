// Prayer Rotation - Core Library
// Exposes all modules for use in the CLI, the table tool, and tests

pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod pools;
pub mod publish;
pub mod redistribution;
pub mod render;
pub mod roster;
pub mod rotation;
pub mod verification;
pub mod week;

// Re-export commonly used types
pub use config::Config;
pub use directory::Directory;
pub use error::{RotationError, RotationResult};
pub use pools::{BalanceBand, PoolSet};
pub use publish::{
    archive_previous_schedule, build_message, write_current_files, Delivery, Mailer,
    OutboxMailer, PublishedFiles, SmtpMailer,
};
pub use redistribution::{
    cycle_overview, derive_table, find_conflicts, Conflict, CycleSlot, RedistributionEntry,
    RedistributionTable,
};
pub use render::{MailMessage, ScheduleView};
pub use roster::{Elder, Roster};
pub use rotation::{ElderAssignment, Redistribution, RotationEngine, WeeklyAssignment};
pub use verification::{
    verify_algorithm, verify_week, Check, Severity, VerificationIssue, VerificationReport,
};
pub use week::{day_name, WeekCalendar, WeekContext};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
