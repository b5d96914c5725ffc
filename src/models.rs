use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ItemError;

pub const STAGE_SOURCING: &str = "Sourcing";
pub const STAGE_CONTRACT_PENDING: &str = "Contract Pending";
pub const DEFAULT_LEAD_STAGE: &str = "Pitched Lead";
pub const DEFAULT_PROJECT_STAGE: &str = "Waiting for JD";

pub const STATUS_ACTIVE: &str = "Active";
pub const LEAD_CLOSED_STATUSES: [&str; 2] = ["Converted", "Lost"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Lead,
    Project,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Lead => "Lead",
            ItemKind::Project => "Project",
        }
    }

    pub fn default_stage(&self) -> &'static str {
        match self {
            ItemKind::Lead => DEFAULT_LEAD_STAGE,
            ItemKind::Project => DEFAULT_PROJECT_STAGE,
        }
    }
}

impl FromStr for ItemKind {
    type Err = ItemError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lead" => Ok(ItemKind::Lead),
            "project" => Ok(ItemKind::Project),
            _ => Err(ItemError::UnknownKind(value.to_string())),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lead or project row as delivered by the data layer.
#[derive(Debug, Clone, Serialize)]
pub struct TrackableItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub client_name: String,
    /// Job title for projects; leads have none.
    pub position_title: Option<String>,
    pub owner_name: Option<String>,
    pub status: String,
    pub stage: String,
    pub block_reason: Option<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub next_followup_at: Option<DateTime<Utc>>,
    pub cv_count: u32,
}

impl TrackableItem {
    /// Closed items never show up on any risk surface.
    pub fn is_closed(&self) -> bool {
        match self.kind {
            ItemKind::Project => self.status != STATUS_ACTIVE,
            ItemKind::Lead => LEAD_CLOSED_STATUSES.contains(&self.status.as_str()),
        }
    }

    /// Reference instant for silence; a missing activity date counts as `now`.
    pub fn activity_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_activity_at.unwrap_or(now)
    }
}

/// Unvalidated row shape shared by the database fetch and the CSV import.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub id: Uuid,
    pub kind: String,
    pub client_name: String,
    pub position_title: Option<String>,
    pub owner_name: Option<String>,
    pub status: String,
    pub stage: Option<String>,
    pub block_reason: Option<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub next_followup_at: Option<DateTime<Utc>>,
    pub cv_count: Option<i32>,
}

impl TryFrom<RawItem> for TrackableItem {
    type Error = ItemError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let kind: ItemKind = raw.kind.parse()?;
        if raw.client_name.trim().is_empty() {
            return Err(ItemError::EmptyClientName);
        }
        let cv_count = match raw.cv_count.unwrap_or(0) {
            n if n < 0 => return Err(ItemError::NegativeCvCount(n)),
            n => n as u32,
        };
        let stage = raw
            .stage
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| kind.default_stage().to_string());
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Ok(TrackableItem {
            id: raw.id,
            kind,
            client_name: raw.client_name,
            position_title: non_blank(raw.position_title),
            owner_name: raw.owner_name,
            status: raw.status,
            stage,
            block_reason: non_blank(raw.block_reason),
            last_activity_at: raw.last_activity_at,
            next_followup_at: raw.next_followup_at,
            cv_count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Red,
    Yellow,
    Green,
    None,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Red => "red",
            RiskTier::Yellow => "yellow",
            RiskTier::Green => "green",
            RiskTier::None => "none",
        }
    }

    /// Sort rank: red first, then yellow, green and none share the tail.
    pub fn rank(&self) -> u8 {
        match self {
            RiskTier::Red => 0,
            RiskTier::Yellow => 1,
            RiskTier::Green | RiskTier::None => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskReason {
    NoCvsSourced,
    OverdueFollowUp,
    Silent { days: i64 },
    ContractPending,
    PendingFeedback,
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskReason::NoCvsSourced => f.write_str("No CVs Sourced"),
            RiskReason::OverdueFollowUp => f.write_str("Overdue Follow-up"),
            RiskReason::Silent { days } => write!(f, "Silent > {days} Days"),
            RiskReason::ContractPending => f.write_str("Contract Pending"),
            RiskReason::PendingFeedback => f.write_str("Pending Feedback"),
        }
    }
}

impl Serialize for RiskReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskClassification {
    pub tier: RiskTier,
    /// Serialized as the dashboard text; empty when nothing is flagged.
    #[serde(serialize_with = "serialize_reason")]
    pub reason: Option<RiskReason>,
}

fn serialize_reason<S: Serializer>(
    reason: &Option<RiskReason>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match reason {
        Some(reason) => serializer.collect_str(reason),
        None => serializer.serialize_str(""),
    }
}

impl RiskClassification {
    pub const NONE: RiskClassification = RiskClassification {
        tier: RiskTier::None,
        reason: None,
    };

    pub fn red(reason: RiskReason) -> Self {
        Self {
            tier: RiskTier::Red,
            reason: Some(reason),
        }
    }

    pub fn yellow(reason: RiskReason) -> Self {
        Self {
            tier: RiskTier::Yellow,
            reason: Some(reason),
        }
    }

    pub fn is_surfaced(&self) -> bool {
        self.tier != RiskTier::None
    }

    pub fn reason_label(&self) -> String {
        self.reason.map(|r| r.to_string()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedItem {
    pub item: TrackableItem,
    pub classification: RiskClassification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpBand {
    OnTrack,
    FollowUp,
    ActionNeeded,
    Dormant,
}

impl FollowUpBand {
    pub fn label(&self) -> &'static str {
        match self {
            FollowUpBand::OnTrack => "On Track",
            FollowUpBand::FollowUp => "Follow Up",
            FollowUpBand::ActionNeeded => "Action Needed",
            FollowUpBand::Dormant => "Dormant",
        }
    }

    /// Display color on the tracker; dormant rows are greyed out.
    pub fn tier(&self) -> RiskTier {
        match self {
            FollowUpBand::OnTrack => RiskTier::Green,
            FollowUpBand::FollowUp => RiskTier::Yellow,
            FollowUpBand::ActionNeeded => RiskTier::Red,
            FollowUpBand::Dormant => RiskTier::None,
        }
    }
}

impl Serialize for FollowUpBand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BandedItem {
    pub item: TrackableItem,
    pub band: FollowUpBand,
    pub days_silent: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierSummary {
    pub red: usize,
    pub yellow: usize,
    pub leads: usize,
    pub projects: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: ItemKind, status: &str) -> TrackableItem {
        TrackableItem {
            id: Uuid::new_v4(),
            kind,
            client_name: "Northwind".to_string(),
            position_title: None,
            owner_name: None,
            status: status.to_string(),
            stage: kind.default_stage().to_string(),
            block_reason: None,
            last_activity_at: None,
            next_followup_at: None,
            cv_count: 0,
        }
    }

    #[test]
    fn closed_status_depends_on_kind() {
        assert!(!item(ItemKind::Project, "Active").is_closed());
        assert!(item(ItemKind::Project, "Closed").is_closed());
        assert!(item(ItemKind::Project, "On Hold").is_closed());
        assert!(!item(ItemKind::Lead, "Contacted").is_closed());
        assert!(item(ItemKind::Lead, "Converted").is_closed());
        assert!(item(ItemKind::Lead, "Lost").is_closed());
    }

    #[test]
    fn reason_labels_match_dashboard_text() {
        assert_eq!(RiskReason::Silent { days: 5 }.to_string(), "Silent > 5 Days");
        assert_eq!(RiskReason::OverdueFollowUp.to_string(), "Overdue Follow-up");
        assert_eq!(RiskClassification::NONE.reason_label(), "");
    }

    fn raw(kind: &str) -> RawItem {
        RawItem {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            client_name: "Contoso".to_string(),
            position_title: Some(" ".to_string()),
            owner_name: Some("Priya".to_string()),
            status: "Active".to_string(),
            stage: None,
            block_reason: Some("Waiting on budget sign-off".to_string()),
            last_activity_at: None,
            next_followup_at: None,
            cv_count: None,
        }
    }

    #[test]
    fn raw_rows_get_kind_specific_default_stage() {
        let lead = TrackableItem::try_from(raw("Lead")).unwrap();
        assert_eq!(lead.stage, "Pitched Lead");
        assert_eq!(lead.cv_count, 0);
        assert_eq!(lead.position_title, None);
        assert_eq!(lead.block_reason.as_deref(), Some("Waiting on budget sign-off"));

        let mut blank = raw("Project");
        blank.stage = Some("  ".to_string());
        let project = TrackableItem::try_from(blank).unwrap();
        assert_eq!(project.stage, "Waiting for JD");
    }

    #[test]
    fn raw_rows_are_rejected_at_the_boundary() {
        let mut negative = raw("Project");
        negative.cv_count = Some(-2);
        assert_eq!(
            TrackableItem::try_from(negative).unwrap_err(),
            ItemError::NegativeCvCount(-2)
        );

        let mut nameless = raw("Lead");
        nameless.client_name = String::new();
        assert_eq!(
            TrackableItem::try_from(nameless).unwrap_err(),
            ItemError::EmptyClientName
        );

        assert_eq!(
            TrackableItem::try_from(raw("Candidate")).unwrap_err(),
            ItemError::UnknownKind("Candidate".to_string())
        );
    }

    #[test]
    fn json_uses_dashboard_labels() {
        let silent = RiskClassification::red(RiskReason::Silent { days: 3 });
        assert_eq!(
            serde_json::to_value(silent).unwrap(),
            serde_json::json!({"tier": "red", "reason": "Silent > 3 Days"})
        );
        assert_eq!(
            serde_json::to_value(RiskClassification::red(RiskReason::NoCvsSourced)).unwrap(),
            serde_json::json!({"tier": "red", "reason": "No CVs Sourced"})
        );
        assert_eq!(
            serde_json::to_value(RiskClassification::NONE).unwrap(),
            serde_json::json!({"tier": "none", "reason": ""})
        );
        assert_eq!(
            serde_json::to_string(&FollowUpBand::ActionNeeded).unwrap(),
            "\"Action Needed\""
        );
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("lead".parse::<ItemKind>().unwrap(), ItemKind::Lead);
        assert_eq!(" Project ".parse::<ItemKind>().unwrap(), ItemKind::Project);
        assert!("candidate".parse::<ItemKind>().is_err());
    }
}
