use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::config::RiskThresholds;
use crate::models::{
    ClassifiedItem, ItemKind, RiskClassification, RiskReason, RiskTier, TierSummary,
    TrackableItem, STAGE_CONTRACT_PENDING, STAGE_SOURCING, STATUS_ACTIVE,
};

/// Triage one item. Rules are checked in priority order and the first match wins.
pub fn classify(
    item: &TrackableItem,
    now: DateTime<Utc>,
    thresholds: &RiskThresholds,
) -> RiskClassification {
    if item.is_closed() {
        return RiskClassification::NONE;
    }

    if item.kind == ItemKind::Project
        && item.status == STATUS_ACTIVE
        && item.cv_count == 0
        && item.stage == STAGE_SOURCING
    {
        return RiskClassification::red(RiskReason::NoCvsSourced);
    }

    if is_followup_overdue(item, now) {
        return RiskClassification::red(RiskReason::OverdueFollowUp);
    }

    if let Some(days) = silence_breach(item, now, thresholds) {
        return RiskClassification::red(RiskReason::Silent { days });
    }

    if item.stage == STAGE_CONTRACT_PENDING {
        return RiskClassification::yellow(RiskReason::ContractPending);
    }

    if thresholds.bottleneck_stages.iter().any(|s| *s == item.stage) {
        return RiskClassification::yellow(RiskReason::PendingFeedback);
    }

    RiskClassification::NONE
}

/// Compares calendar dates only, so a follow-up due today is not overdue yet.
pub fn is_followup_overdue(item: &TrackableItem, now: DateTime<Utc>) -> bool {
    item.next_followup_at
        .map(|next| next.date_naive() < now.date_naive())
        .unwrap_or(false)
}

/// Returns the breached threshold in days when the item has gone quiet for too long.
fn silence_breach(
    item: &TrackableItem,
    now: DateTime<Utc>,
    thresholds: &RiskThresholds,
) -> Option<i64> {
    let last_activity = item.last_activity_at?;
    let limit_days = match item.kind {
        ItemKind::Project => thresholds.project_silence_days,
        ItemKind::Lead => {
            if !thresholds.lead_active_stages.iter().any(|s| *s == item.stage) {
                return None;
            }
            thresholds.lead_silence_days
        }
    };

    if limit_days < 0 {
        return None;
    }
    let limit = Duration::try_days(limit_days)?;
    (now - last_activity > limit).then_some(limit_days)
}

/// Classify a batch and keep only the items that need attention.
pub fn classify_all(
    items: &[TrackableItem],
    now: DateTime<Utc>,
    thresholds: &RiskThresholds,
) -> Vec<ClassifiedItem> {
    items
        .iter()
        .filter_map(|item| {
            let classification = classify(item, now, thresholds);
            classification.is_surfaced().then(|| ClassifiedItem {
                item: item.clone(),
                classification,
            })
        })
        .collect()
}

/// Red, then yellow, then the rest; oldest activity first within a tier.
pub fn sort_by_risk(items: &mut [ClassifiedItem]) {
    items.sort_by(|a, b| {
        a.classification
            .tier
            .rank()
            .cmp(&b.classification.tier.rank())
            .then_with(|| compare_activity(&a.item, &b.item))
    });
}

/// Ascending activity; items never contacted sort after every dated item.
pub fn compare_activity(a: &TrackableItem, b: &TrackableItem) -> Ordering {
    match (a.last_activity_at, b.last_activity_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn summarize(items: &[ClassifiedItem]) -> TierSummary {
    let mut summary = TierSummary::default();
    for entry in items {
        match entry.classification.tier {
            RiskTier::Red => summary.red += 1,
            RiskTier::Yellow => summary.yellow += 1,
            RiskTier::Green | RiskTier::None => {}
        }
        match entry.item.kind {
            ItemKind::Lead => summary.leads += 1,
            ItemKind::Project => summary.projects += 1,
        }
    }
    summary
}
