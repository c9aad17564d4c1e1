// 🖨️ Schedule Rendering - Text, HTML and mail bodies for one week
//
// Consumes a computed week; never feeds anything back into it.

use crate::pools::BalanceBand;
use crate::roster::{Elder, Roster};
use crate::rotation::WeeklyAssignment;
use crate::week::{day_name, WeekContext, WEEK_DAYS};
use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use std::collections::BTreeSet;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "--------------------------------------------------";

/// Outgoing notification, before any transport touches it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
}

/// One day of the week with its elders
struct DayRow<'a> {
    day: Weekday,
    date: NaiveDate,
    elders: Vec<&'a Elder>,
}

impl DayRow<'_> {
    fn elder_names(&self) -> String {
        self.elders
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

// ============================================================================
// SCHEDULE VIEW
// ============================================================================

/// Everything needed to render one week
pub struct ScheduleView<'a> {
    pub organization: &'a str,
    pub context: WeekContext,
    pub roster: &'a Roster,
    pub week: &'a WeeklyAssignment,
    pub band: BalanceBand,
    pub generated_at: NaiveDateTime,
}

impl<'a> ScheduleView<'a> {
    fn day_rows(&self) -> Vec<DayRow<'a>> {
        WEEK_DAYS
            .iter()
            .enumerate()
            .map(|(offset, &day)| DayRow {
                day,
                date: self.context.monday + Duration::days(offset as i64),
                elders: self.roster.elders_for_day(day),
            })
            .collect()
    }

    fn families(&self, elder: &str) -> Vec<&'a str> {
        self.week
            .families_for(elder)
            .map(|set: &'a BTreeSet<String>| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Plain-text schedule (also the archived file and weekly mail body)
    pub fn text(&self) -> String {
        let week = self.context.display_week;
        let range = self.context.date_range();

        let mut text = String::new();
        text.push_str(&format!("{}\n", RULE));
        text.push_str(&format!("PRAYER SCHEDULE - WEEK {}\n", week));
        text.push_str(&format!("{}\n", range));
        text.push_str(&format!(
            "Generated: {}\n",
            self.generated_at.format("%Y-%m-%d %I:%M %p")
        ));
        text.push_str(&format!("{}\n\n", RULE));
        text.push_str(&format!("{}\n", self.organization.to_uppercase()));
        text.push_str(&format!("Elder Prayer Schedule - Week {}\n", week));
        text.push_str(&format!("{}\n\n", range));
        text.push_str(&format!("{}\n", RULE));
        text.push_str("This Week's Prayer Schedule:\n\n");

        let rows = self.day_rows();
        for row in &rows {
            text.push_str(&format!(
                "{}, {}: {}\n",
                day_name(row.day),
                row.date.format("%B %d"),
                row.elder_names()
            ));
        }

        text.push_str(&format!("\n{}\nPRAYER LISTS FOR THIS WEEK:\n{}\n", RULE, RULE));

        for row in &rows {
            for elder in &row.elders {
                let families = self.families(&elder.name);

                text.push_str(&format!(
                    "\n{} - {}, {}\n",
                    elder.name,
                    day_name(row.day),
                    row.date.format("%B %d")
                ));
                text.push_str(&format!("{}\n", THIN_RULE));
                text.push_str(&format!("{} families to pray for:\n\n", families.len()));

                for (i, family) in families.iter().enumerate() {
                    text.push_str(&format!("{:3}. {}\n", i + 1, family));
                }
                text.push('\n');
            }
        }

        text.push_str(&format!("{}\n", RULE));
        text.push_str(&format!(
            "Note: Each elder has {}-{} families for complete rotation.\n",
            self.band.min, self.band.max
        ));
        text.push_str(&format!("{}\n\n", RULE));
        text.push_str(&format!("-- {} Elder Ministry --\n", self.organization));

        text
    }

    /// HTML schedule with today's day, row and lists highlighted
    pub fn html(&self) -> String {
        let week = self.context.display_week;
        let today = self.context.today;
        let rows = self.day_rows();

        let mut html = String::new();
        html.push_str(&format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Prayer Schedule - Week {week}</title>
    <meta charset="UTF-8">
    <meta http-equiv="refresh" content="3600">
    <style>
        body {{ font-family: 'Segoe UI', Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; border-radius: 8px; overflow: hidden; }}
        .header {{ background: #2c3e50; color: white; padding: 30px; text-align: center; }}
        .content {{ padding: 30px; }}
        .day-nav {{ display: flex; justify-content: center; gap: 4px; padding: 15px 20px; background: #1a252f; flex-wrap: wrap; }}
        .day-pill {{ padding: 10px 18px; border-radius: 25px; font-weight: 600; color: #8899a6; min-width: 80px; text-align: center; }}
        .day-pill.today {{ background: #e67e22; color: white; }}
        .day-pill.past {{ color: #5a6a7a; }}
        .today-banner {{ background: #e67e22; color: white; padding: 25px 30px; text-align: center; }}
        .schedule-table {{ width: 100%; border-collapse: collapse; margin: 30px 0; }}
        .schedule-table th, .schedule-table td {{ border: 1px solid #ddd; padding: 15px; text-align: left; }}
        .schedule-table th {{ background: #3498db; color: white; }}
        .schedule-table tr.today-row td {{ font-weight: bold; color: #d35400; }}
        .highlight {{ background-color: #fff3cd; font-weight: bold; }}
        .prayer-list {{ margin: 40px 0; border-left: 4px solid #3498db; padding-left: 20px; }}
        .prayer-list.today-prayer-list {{ border-left-color: #e67e22; background: #fef9f3; }}
        .family-list {{ columns: 2; column-gap: 40px; list-style-type: none; padding: 0; }}
        .note {{ background-color: #e8f4fd; border-left: 4px solid #3498db; padding: 15px; margin: 20px 0; }}
        .update-time {{ text-align: center; color: #7f8c8d; margin-top: 20px; font-style: italic; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{organization}</h1>
            <h2>Elder Prayer Schedule - Week {week}</h2>
            <h3>{range}</h3>
        </div>
        <div class="day-nav">
"#,
            week = week,
            organization = escape_html(self.organization),
            range = self.context.date_range(),
        ));

        for row in &rows {
            let class = if row.date == today {
                "today"
            } else if row.date < today {
                "past"
            } else {
                "future"
            };
            html.push_str(&format!(
                "            <div class=\"day-pill {}\">{}<br>{}</div>\n",
                class,
                &day_name(row.day)[..3],
                row.date.format("%b %d")
            ));
        }
        html.push_str("        </div>\n");

        if let Some(row) = rows.iter().find(|r| r.date == today && !r.elders.is_empty()) {
            let count: usize = row.elders.iter().map(|e| self.families(&e.name).len()).sum();
            html.push_str(&format!(
                "        <div class=\"today-banner\">\n            <h2>Today's Prayer Focus</h2>\n            <div>{}</div>\n            <div>{} families being prayed for today</div>\n        </div>\n",
                escape_html(&row.elder_names()),
                count
            ));
        }

        html.push_str(&format!(
            r#"        <div class="content">
            <div class="note">
                <strong>Note:</strong> Each elder has {}-{} families to ensure complete rotation coverage.
            </div>
            <h2>This Week's Prayer Schedule</h2>
            <table class="schedule-table">
                <tr><th>Day</th><th>Date</th><th>Elder(s) Assigned</th></tr>
"#,
            self.band.min, self.band.max
        ));

        for row in &rows {
            let mut classes = Vec::new();
            if row.elders.len() > 1 {
                classes.push("highlight");
            }
            if row.date == today {
                classes.push("today-row");
            }
            html.push_str(&format!(
                "                <tr class=\"{}\"><td><strong>{}</strong></td><td>{}</td><td>{}</td></tr>\n",
                classes.join(" "),
                day_name(row.day),
                row.date.format("%B %d"),
                escape_html(&row.elder_names())
            ));
        }

        html.push_str("            </table>\n            <h2>Prayer Lists for This Week</h2>\n");

        for row in &rows {
            for elder in &row.elders {
                let families = self.families(&elder.name);
                let class = if row.date == today {
                    "prayer-list today-prayer-list"
                } else {
                    "prayer-list"
                };

                html.push_str(&format!(
                    "            <div class=\"{}\">\n                <h3>{} - {}, {}</h3>\n                <p><em>{} families to pray for:</em></p>\n                <ul class=\"family-list\">\n",
                    class,
                    escape_html(&elder.name),
                    day_name(row.day),
                    row.date.format("%B %d"),
                    families.len()
                ));
                for family in families {
                    html.push_str(&format!("                    <li>{}</li>\n", escape_html(family)));
                }
                html.push_str("                </ul>\n            </div>\n");
            }
        }

        html.push_str(&format!(
            r#"            <div class="update-time">
                Last updated: {}
            </div>
        </div>
    </div>
</body>
</html>
"#,
            self.generated_at.format("%B %d, %Y at %I:%M %p")
        ));

        html
    }

    /// Full weekly schedule mail (Mondays)
    pub fn weekly_message(&self) -> MailMessage {
        let week = self.context.display_week;
        let range = self.context.short_range();

        MailMessage {
            subject: format!("Weekly Prayer Schedule - Week {} ({})", week, range),
            body: format!(
                "Greetings,\n\nPlease find below the prayer schedule for Week {} ({}).\n\n{}\n\nThis schedule was automatically generated by the Prayer Schedule System.\n\nBlessings,\n{} Elder Ministry\n",
                week,
                range,
                self.text(),
                self.organization
            ),
        }
    }

    /// Reminder for today's elder(s); None when nobody prays today
    pub fn daily_message(&self) -> Option<MailMessage> {
        let day = self.context.weekday();
        let elders = self.roster.elders_for_day(day);
        if elders.is_empty() {
            return None;
        }

        let week = self.context.display_week;
        let names = elders
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(" & ");

        let mut details = String::new();
        for elder in &elders {
            let families = self.families(&elder.name);
            details.push_str(&format!(
                "\n{} - {} families to pray for:\n{}\n",
                elder.name,
                families.len(),
                THIN_RULE
            ));
            for (i, family) in families.iter().enumerate() {
                details.push_str(&format!("  {:3}. {}\n", i + 1, family));
            }
            details.push('\n');
        }

        Some(MailMessage {
            subject: format!(
                "Daily Prayer Reminder - {}: {} (Week {})",
                day_name(day),
                names,
                week
            ),
            body: format!(
                "Greetings,\n\nTODAY'S PRAYER FOCUS - {}\n{}\n\nToday is {} of Week {} ({}).\n\nElder(s) assigned to pray today: {}\n{}\nPlease keep these families in your prayers today.\n\n{}\nThis daily reminder was automatically generated by the Prayer Schedule System.\n\nBlessings,\n{} Elder Ministry\n",
                self.context.today.format("%A, %B %d, %Y"),
                RULE,
                day_name(day),
                week,
                self.context.short_range(),
                names,
                details,
                RULE,
                self.organization
            ),
        })
    }
}

/// Escape the HTML special characters that appear in family names
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::RotationEngine;
    use crate::week::WeekCalendar;

    fn render<F: FnOnce(&ScheduleView)>(date: NaiveDate, f: F) {
        let engine = RotationEngine::reference().unwrap();
        let context = WeekCalendar::default().context(date);
        let week = engine.assign(context.continuous_week);

        let view = ScheduleView {
            organization: "Crossville Church of Christ",
            context,
            roster: engine.roster(),
            week: &week,
            band: engine.balance_band(),
            generated_at: date.and_hms_opt(13, 0, 0).unwrap(),
        };
        f(&view);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_text_header_carries_week_number() {
        render(date(2026, 10, 12), |view| {
            let text = view.text();

            assert!(text.contains("PRAYER SCHEDULE - WEEK 42\n"));
            assert!(text.contains("October 12 - October 18, 2026"));
            assert!(text.contains("Monday, October 12: Alan Judd & Brian McLaughlin\n"));
            assert!(text.contains("Sunday, October 18: Larry McDuffee\n"));
            assert!(text.contains("Note: Each elder has 18-20 families"));
        });
    }

    #[test]
    fn test_text_lists_every_family_once() {
        render(date(2026, 10, 12), |view| {
            let text = view.text();
            let numbered = text
                .lines()
                .filter(|l| l.len() > 5 && l[..3].trim().parse::<usize>().is_ok() && &l[3..5] == ". ")
                .count();

            assert_eq!(numbered, 155);
        });
    }

    #[test]
    fn test_html_highlights_today_and_escapes() {
        render(date(2026, 10, 16), |view| {
            let html = view.html();

            assert!(html.contains("day-pill today\">Fri"));
            assert!(html.contains("Today's Prayer Focus"));
            assert!(html.contains("Kyle Fairman"));
            assert!(html.contains("&amp;"));
            assert!(!html.contains("<li>Bell, Jim & Beth</li>"));
        });
    }

    #[test]
    fn test_weekly_message_subject() {
        render(date(2026, 10, 12), |view| {
            let message = view.weekly_message();
            assert_eq!(
                message.subject,
                "Weekly Prayer Schedule - Week 42 (Oct 12-18, 2026)"
            );
            assert!(message.body.contains("PRAYER SCHEDULE - WEEK 42"));
        });
    }

    #[test]
    fn test_daily_message_for_monday_names_both_elders() {
        render(date(2026, 10, 12), |view| {
            let message = view.daily_message().unwrap();

            assert_eq!(
                message.subject,
                "Daily Prayer Reminder - Monday: Alan Judd & Brian McLaughlin (Week 42)"
            );
            assert!(message.body.contains("Monday, October 12, 2026"));
            assert!(message.body.contains("Alan Judd - "));
            assert!(message.body.contains("Brian McLaughlin - "));
        });
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Bell, Jim & Beth"), "Bell, Jim &amp; Beth");
        assert_eq!(escape_html("<b>\"x\"</b>"), "&lt;b&gt;&quot;x&quot;&lt;/b&gt;");
    }
}
