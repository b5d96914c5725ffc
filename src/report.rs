use std::fmt::Write;

use chrono::{DateTime, NaiveDate, Utc};

use crate::calendar;
use crate::config::Config;
use crate::models::{
    BandedItem, ClassifiedItem, FollowUpBand, ItemKind, TrackableItem, STAGE_CONTRACT_PENDING,
};
use crate::risk;
use crate::tracker;

/// Which action-required surface to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Panel {
    /// Projects, using the recruiter thresholds
    Recruiter,
    /// Leads, using the sales thresholds
    Sales,
    /// Both panels merged
    All,
}

/// Classify the items a panel cares about and return them in display order.
pub fn action_required(
    items: &[TrackableItem],
    now: DateTime<Utc>,
    panel: Panel,
    config: &Config,
) -> Vec<ClassifiedItem> {
    let of_kind = |kind: ItemKind| -> Vec<TrackableItem> {
        items.iter().filter(|i| i.kind == kind).cloned().collect()
    };

    let mut classified = match panel {
        Panel::Recruiter => risk::classify_all(&of_kind(ItemKind::Project), now, &config.recruiter),
        Panel::Sales => risk::classify_all(&of_kind(ItemKind::Lead), now, &config.sales),
        Panel::All => {
            let mut merged =
                risk::classify_all(&of_kind(ItemKind::Project), now, &config.recruiter);
            merged.extend(risk::classify_all(&of_kind(ItemKind::Lead), now, &config.sales));
            merged
        }
    };

    risk::sort_by_risk(&mut classified);
    classified
}

/// Open leads waiting on a signed contract, longest pending first.
pub fn contracts_pending(items: &[TrackableItem]) -> Vec<&TrackableItem> {
    let mut pending: Vec<&TrackableItem> = items
        .iter()
        .filter(|i| i.kind == ItemKind::Lead && !i.is_closed() && i.stage == STAGE_CONTRACT_PENDING)
        .collect();
    pending.sort_by(|a, b| risk::compare_activity(a, b));
    pending
}

/// Working days since the last recorded activity, counting both ends.
pub fn sla_working_days(
    item: &TrackableItem,
    now: DateTime<Utc>,
    holidays: &[NaiveDate],
) -> Option<u32> {
    item.last_activity_at
        .map(|last| calendar::working_days(last.date_naive(), now.date_naive(), holidays))
}

pub fn format_action_line(entry: &ClassifiedItem, now: DateTime<Utc>) -> String {
    let item = &entry.item;
    let days_silent = calendar::days_between(item.activity_or(now), now).max(0);
    let mut line = format!(
        "[{}] {} {} ({}) - {} - stage {} - silent {} days",
        entry.classification.tier.as_str(),
        item.kind,
        item.client_name,
        item.owner_name.as_deref().unwrap_or("Unassigned"),
        entry.classification.reason_label(),
        item.stage,
        days_silent
    );
    if item.kind == ItemKind::Project {
        let _ = write!(line, " - {} CVs", item.cv_count);
    }
    line
}

pub fn format_tracker_line(entry: &BandedItem) -> String {
    let item = &entry.item;
    let next = item
        .next_followup_at
        .map(|next| next.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| "Not scheduled".to_string());
    let mut line = format!(
        "[{} / {}] {} {}",
        entry.band.label(),
        entry.band.tier().as_str(),
        item.kind,
        item.client_name
    );
    if let Some(position) = &item.position_title {
        let _ = write!(line, " - {position}");
    }
    let _ = write!(
        line,
        " ({}) - stage {} - silent {} days - next {}",
        item.owner_name.as_deref().unwrap_or("Unassigned"),
        item.stage,
        entry.days_silent,
        next
    );
    if let Some(reason) = &item.block_reason {
        let _ = write!(line, " - Blocked: {reason}");
    }
    line
}

fn band_count(tracker: &[BandedItem], band: FollowUpBand) -> usize {
    tracker.iter().filter(|b| b.band == band).count()
}

pub fn build_report(now: DateTime<Utc>, items: &[TrackableItem], config: &Config) -> String {
    let recruiter = action_required(items, now, Panel::Recruiter, config);
    let sales = action_required(items, now, Panel::Sales, config);
    let tracker = tracker::build_tracker(items, now, &config.tracker);
    let contracts = contracts_pending(items);

    let mut all_actions = recruiter.clone();
    all_actions.extend(sales.iter().cloned());
    let summary = risk::summarize(&all_actions);

    let mut output = String::new();

    let _ = writeln!(output, "# Follow-up Risk Report");
    let _ = writeln!(output, "Generated {}", now.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- {} red and {} yellow items need attention ({} projects, {} leads)",
        summary.red, summary.yellow, summary.projects, summary.leads
    );
    let _ = writeln!(output, "- {} open items on the follow-up tracker", tracker.len());

    for (title, entries) in [
        ("Recruiter Action Required", &recruiter),
        ("Sales Action Required", &sales),
    ] {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {title}");
        if entries.is_empty() {
            let _ = writeln!(output, "Nothing needs attention.");
        } else {
            for entry in entries.iter() {
                let _ = writeln!(output, "- {}", format_action_line(entry, now));
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Follow-up Tracker");
    if tracker.is_empty() {
        let _ = writeln!(output, "No open leads or projects.");
    } else {
        for band in [
            FollowUpBand::ActionNeeded,
            FollowUpBand::FollowUp,
            FollowUpBand::OnTrack,
            FollowUpBand::Dormant,
        ] {
            let _ = writeln!(output, "- {}: {}", band.label(), band_count(&tracker, band));
        }
        let _ = writeln!(output);
        for entry in tracker.iter().take(10) {
            let sla = sla_working_days(&entry.item, now, &config.holidays)
                .map(|days| format!(" ({days} working days)"))
                .unwrap_or_default();
            let _ = writeln!(output, "- {}{}", format_tracker_line(entry), sla);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Contracts Pending");
    if contracts.is_empty() {
        let _ = writeln!(output, "No contracts out for signature.");
    } else {
        for lead in contracts {
            let days_pending = calendar::days_between(lead.activity_or(now), now).max(0);
            let _ = writeln!(
                output,
                "- {} ({}) pending {} days",
                lead.client_name,
                lead.owner_name.as_deref().unwrap_or("Unassigned"),
                days_pending
            );
        }
    }

    output
}
