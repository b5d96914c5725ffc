//! Admin follow-up tracker: continuous silence banding across leads and projects.
//!
//! Independent of the action-required triage in [`crate::risk`]; the tracker
//! bands every open item by elapsed days instead of flagging a subset.

use chrono::{DateTime, Utc};

use crate::calendar;
use crate::config::BandThresholds;
use crate::models::{BandedItem, FollowUpBand, TrackableItem};
use crate::risk;

/// Band from whole days of silence plus whether the scheduled follow-up has passed.
pub fn band_for_silence(
    days_silent: i64,
    followup_passed: bool,
    thresholds: &BandThresholds,
) -> FollowUpBand {
    if days_silent > thresholds.dormant_days {
        FollowUpBand::Dormant
    } else if days_silent > thresholds.action_needed_days || followup_passed {
        FollowUpBand::ActionNeeded
    } else if days_silent >= thresholds.follow_up_days {
        FollowUpBand::FollowUp
    } else {
        FollowUpBand::OnTrack
    }
}

/// Band one item; closed items are not tracked.
pub fn band(
    item: &TrackableItem,
    now: DateTime<Utc>,
    thresholds: &BandThresholds,
) -> Option<BandedItem> {
    if item.is_closed() {
        return None;
    }

    // Activity stamped in the future counts as contact today.
    let days_silent = calendar::days_between(item.activity_or(now), now).max(0);
    let followup_passed = item.next_followup_at.map(|next| next < now).unwrap_or(false);

    Some(BandedItem {
        item: item.clone(),
        band: band_for_silence(days_silent, followup_passed, thresholds),
        days_silent,
    })
}

/// Band all open items, oldest activity first.
pub fn build_tracker(
    items: &[TrackableItem],
    now: DateTime<Utc>,
    thresholds: &BandThresholds,
) -> Vec<BandedItem> {
    let mut banded: Vec<BandedItem> = items
        .iter()
        .filter_map(|item| band(item, now, thresholds))
        .collect();
    banded.sort_by(|a, b| risk::compare_activity(&a.item, &b.item));
    banded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKind, RiskTier};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    fn item(kind: ItemKind, status: &str, days_ago: Option<i64>) -> TrackableItem {
        TrackableItem {
            id: Uuid::new_v4(),
            kind,
            client_name: format!("client-{days_ago:?}"),
            position_title: None,
            owner_name: None,
            status: status.to_string(),
            stage: kind.default_stage().to_string(),
            block_reason: None,
            last_activity_at: days_ago.map(|d| now() - Duration::days(d)),
            next_followup_at: None,
            cv_count: 1,
        }
    }

    fn band_of(days_ago: i64) -> FollowUpBand {
        band(
            &item(ItemKind::Lead, "Contacted", Some(days_ago)),
            now(),
            &BandThresholds::default(),
        )
        .unwrap()
        .band
    }

    #[test]
    fn bands_follow_day_boundaries() {
        assert_eq!(band_of(2), FollowUpBand::OnTrack);
        assert_eq!(band_of(3), FollowUpBand::FollowUp);
        assert_eq!(band_of(4), FollowUpBand::FollowUp);
        assert_eq!(band_of(7), FollowUpBand::FollowUp);
        assert_eq!(band_of(8), FollowUpBand::ActionNeeded);
        assert_eq!(band_of(10), FollowUpBand::ActionNeeded);
        assert_eq!(band_of(14), FollowUpBand::ActionNeeded);
        assert_eq!(band_of(15), FollowUpBand::Dormant);
    }

    #[test]
    fn passed_followup_escalates_recent_items() {
        let mut recent = item(ItemKind::Project, "Active", Some(1));
        recent.next_followup_at = Some(now() - Duration::hours(1));
        let banded = band(&recent, now(), &BandThresholds::default()).unwrap();
        assert_eq!(banded.band, FollowUpBand::ActionNeeded);
        assert_eq!(banded.band.tier(), RiskTier::Red);

        let mut dormant = item(ItemKind::Project, "Active", Some(20));
        dormant.next_followup_at = Some(now() - Duration::days(1));
        let banded = band(&dormant, now(), &BandThresholds::default()).unwrap();
        assert_eq!(banded.band, FollowUpBand::Dormant);
    }

    #[test]
    fn missing_activity_counts_as_on_track() {
        let banded = band(
            &item(ItemKind::Lead, "Not Contacted", None),
            now(),
            &BandThresholds::default(),
        )
        .unwrap();
        assert_eq!(banded.days_silent, 0);
        assert_eq!(banded.band, FollowUpBand::OnTrack);
    }

    #[test]
    fn future_activity_is_clamped_to_zero_days() {
        let banded = band(
            &item(ItemKind::Project, "Active", Some(-5)),
            now(),
            &BandThresholds::default(),
        )
        .unwrap();
        assert_eq!(banded.days_silent, 0);
        assert_eq!(banded.band, FollowUpBand::OnTrack);
    }

    #[test]
    fn closed_items_are_not_banded() {
        let thresholds = BandThresholds::default();
        assert!(band(&item(ItemKind::Project, "Closed", Some(30)), now(), &thresholds).is_none());
        assert!(band(&item(ItemKind::Lead, "Converted", Some(30)), now(), &thresholds).is_none());
        assert!(band(&item(ItemKind::Lead, "Lost", Some(2)), now(), &thresholds).is_none());
    }

    #[test]
    fn tracker_lists_oldest_first() {
        let items = vec![
            item(ItemKind::Lead, "Contacted", Some(2)),
            item(ItemKind::Project, "Closed", Some(50)),
            item(ItemKind::Project, "Active", Some(20)),
            item(ItemKind::Lead, "Contacted", None),
            item(ItemKind::Lead, "Contacted", Some(9)),
        ];
        let tracker = build_tracker(&items, now(), &BandThresholds::default());
        let days: Vec<i64> = tracker.iter().map(|b| b.days_silent).collect();
        assert_eq!(days, vec![20, 9, 2, 0]);
    }

    #[test]
    fn custom_thresholds_shift_bands() {
        let thresholds = BandThresholds {
            follow_up_days: 1,
            action_needed_days: 2,
            dormant_days: 4,
        };
        assert_eq!(band_for_silence(1, false, &thresholds), FollowUpBand::FollowUp);
        assert_eq!(band_for_silence(3, false, &thresholds), FollowUpBand::ActionNeeded);
        assert_eq!(band_for_silence(5, false, &thresholds), FollowUpBand::Dormant);
    }
}
