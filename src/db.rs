use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::calendar::Month;
use crate::models::{ItemKind, RawItem, TrackableItem};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// A validated import row plus its idempotency key.
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub source_key: String,
    pub item: TrackableItem,
}

pub async fn insert_item(pool: &PgPool, row: &ImportRow) -> anyhow::Result<bool> {
    let item = &row.item;
    let result = match item.kind {
        ItemKind::Lead => {
            sqlx::query(
                r#"
                INSERT INTO followup_risk.leads
                (id, company_name, status, follow_up_stage, last_followup_at,
                 next_followup_date, owner_name, block_reason, source_key)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (source_key) DO NOTHING
                "#,
            )
            .bind(item.id)
            .bind(&item.client_name)
            .bind(&item.status)
            .bind(&item.stage)
            .bind(item.last_activity_at)
            .bind(item.next_followup_at)
            .bind(&item.owner_name)
            .bind(&item.block_reason)
            .bind(&row.source_key)
            .execute(pool)
            .await?
        }
        ItemKind::Project => {
            sqlx::query(
                r#"
                INSERT INTO followup_risk.projects
                (id, client_name, position_title, status, follow_up_stage, last_activity_at,
                 next_followup_date, cv_count, owner_name, block_reason, source_key)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (source_key) DO NOTHING
                "#,
            )
            .bind(item.id)
            .bind(&item.client_name)
            .bind(&item.position_title)
            .bind(&item.status)
            .bind(&item.stage)
            .bind(item.last_activity_at)
            .bind(item.next_followup_at)
            .bind(item.cv_count as i32)
            .bind(&item.owner_name)
            .bind(&item.block_reason)
            .bind(&row.source_key)
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

/// Demo leads and projects, with activity stamped relative to `now`.
fn seed_rows(now: DateTime<Utc>) -> Vec<ImportRow> {
    let ago = |days: i64| Some(now - Duration::days(days));
    let ahead = |days: i64| Some(now + Duration::days(days));

    let rows = vec![
        (
            "seed-lead-001",
            ItemKind::Lead,
            "Harbor Logistics",
            None,
            "Contacted",
            "Requirement Discussion",
            ago(6),
            None,
            0,
            "Nadia Rahman",
            None,
        ),
        (
            "seed-lead-002",
            ItemKind::Lead,
            "Crescent Foods",
            None,
            "Contacted",
            "Contract Pending",
            ago(2),
            None,
            0,
            "Nadia Rahman",
            Some("Legal reviewing payment terms"),
        ),
        (
            "seed-lead-003",
            ItemKind::Lead,
            "Bluepeak Telecom",
            None,
            "Not Contacted",
            "Pitched Lead",
            None,
            ago(1),
            0,
            "Samir Haddad",
            None,
        ),
        (
            "seed-lead-004",
            ItemKind::Lead,
            "Orchid Retail",
            None,
            "Converted",
            "Contract Pending",
            ago(30),
            ago(20),
            0,
            "Samir Haddad",
            None,
        ),
        (
            "seed-proj-001",
            ItemKind::Project,
            "Harbor Logistics",
            Some("Fleet Analyst"),
            "Active",
            "Sourcing",
            ago(1),
            ahead(2),
            0,
            "Lina Farouk",
            None,
        ),
        (
            "seed-proj-002",
            ItemKind::Project,
            "Crescent Foods",
            Some("QA Engineer"),
            "Active",
            "Interviewing",
            ago(2),
            ahead(1),
            6,
            "Lina Farouk",
            None,
        ),
        (
            "seed-proj-003",
            ItemKind::Project,
            "Vertex Health",
            Some("Data Engineer"),
            "Active",
            "Client Review",
            ago(9),
            None,
            4,
            "Omar Said",
            Some("Hiring manager on leave"),
        ),
        (
            "seed-proj-004",
            ItemKind::Project,
            "Vertex Health",
            Some("Nurse Manager"),
            "Closed",
            "Sourcing",
            ago(40),
            None,
            0,
            "Omar Said",
            None,
        ),
    ];

    let mut seeded = Vec::with_capacity(rows.len());
    for (
        source_key,
        kind,
        client,
        position,
        status,
        stage,
        last_activity_at,
        next_followup_at,
        cv_count,
        owner,
        block,
    ) in rows
    {
        seeded.push(ImportRow {
            source_key: source_key.to_string(),
            item: TrackableItem {
                id: Uuid::new_v4(),
                kind,
                client_name: client.to_string(),
                position_title: position.map(str::to_string),
                owner_name: Some(owner.to_string()),
                status: status.to_string(),
                stage: stage.to_string(),
                block_reason: block.map(str::to_string),
                last_activity_at,
                next_followup_at,
                cv_count,
            },
        });
    }
    seeded
}

pub async fn seed(pool: &PgPool, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for row in seed_rows(now) {
        if insert_item(pool, &row).await? {
            inserted += 1;
        }
    }

    tracing::info!(inserted, "seeded leads and projects");
    Ok(inserted)
}

/// Optional scoping for [`fetch_items`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemFilter<'a> {
    pub owner: Option<&'a str>,
    /// Only rows created during this month.
    pub created_in: Option<Month>,
}

/// `WHERE` clause for a filter; placeholders are numbered in bind order
/// (owner first, then the month's start and end).
fn where_clause(filter: &ItemFilter<'_>) -> String {
    let mut conditions = Vec::new();
    let mut next_param = 1;

    if filter.owner.is_some() {
        conditions.push(format!("owner_name = ${next_param}"));
        next_param += 1;
    }
    if filter.created_in.is_some() {
        conditions.push(format!(
            "created_at >= ${} AND created_at < ${}",
            next_param,
            next_param + 1
        ));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// Fetch every lead and project matching the filter.
///
/// Rows that fail validation are logged and skipped.
pub async fn fetch_items(
    pool: &PgPool,
    filter: ItemFilter<'_>,
) -> anyhow::Result<Vec<TrackableItem>> {
    let clause = where_clause(&filter);
    let lead_query = format!(
        "SELECT id, company_name AS client_name, NULL::TEXT AS position_title, owner_name, \
         status, follow_up_stage, block_reason, last_followup_at AS last_activity_at, \
         next_followup_date, NULL::INTEGER AS cv_count \
         FROM followup_risk.leads{clause}"
    );
    let project_query = format!(
        "SELECT id, client_name, position_title, owner_name, status, follow_up_stage, \
         block_reason, last_activity_at, next_followup_date, cv_count \
         FROM followup_risk.projects{clause}"
    );

    let mut items = Vec::new();
    for (kind, query) in [(ItemKind::Lead, &lead_query), (ItemKind::Project, &project_query)] {
        let mut rows = sqlx::query(query);
        if let Some(value) = filter.owner {
            rows = rows.bind(value);
        }
        if let Some(month) = filter.created_in {
            let (start, end) = month.bounds();
            rows = rows.bind(start).bind(end);
        }

        for row in rows.fetch_all(pool).await? {
            let raw = RawItem {
                id: row.get("id"),
                kind: kind.as_str().to_string(),
                client_name: row.get("client_name"),
                position_title: row.get("position_title"),
                owner_name: row.get("owner_name"),
                status: row.get("status"),
                stage: row.get("follow_up_stage"),
                block_reason: row.get("block_reason"),
                last_activity_at: row.get("last_activity_at"),
                next_followup_at: row.get("next_followup_date"),
                cv_count: row.get("cv_count"),
            };
            let id = raw.id;
            match TrackableItem::try_from(raw) {
                Ok(item) => items.push(item),
                Err(err) => tracing::warn!(%id, kind = %kind, error = %err, "skipping row"),
            }
        }
    }

    tracing::debug!(
        count = items.len(),
        owner = ?filter.owner,
        month = ?filter.created_in.map(|m| m.to_string()),
        "fetched trackable items"
    );
    Ok(items)
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    kind: String,
    client_name: String,
    position_title: Option<String>,
    owner_name: Option<String>,
    status: String,
    stage: Option<String>,
    #[serde(default)]
    block_reason: Option<String>,
    last_activity_at: Option<DateTime<Utc>>,
    next_followup_at: Option<DateTime<Utc>>,
    cv_count: Option<i32>,
    source_key: Option<String>,
}

/// Parse and validate a CSV export; invalid rows are skipped with a warning.
pub fn read_csv(csv_path: &Path) -> anyhow::Result<Vec<ImportRow>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let raw = RawItem {
            id: Uuid::new_v4(),
            kind: row.kind,
            client_name: row.client_name,
            position_title: row.position_title,
            owner_name: row.owner_name,
            status: row.status,
            stage: row.stage,
            block_reason: row.block_reason,
            last_activity_at: row.last_activity_at,
            next_followup_at: row.next_followup_at,
            cv_count: row.cv_count,
        };

        match TrackableItem::try_from(raw) {
            Ok(item) => rows.push(ImportRow {
                source_key: row
                    .source_key
                    .unwrap_or_else(|| format!("import-{}", Uuid::new_v4())),
                item,
            }),
            Err(err) => tracing::warn!(record = line + 1, error = %err, "skipping csv row"),
        }
    }

    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let rows = read_csv(csv_path)?;
    let mut inserted = 0usize;

    for row in &rows {
        if insert_item(pool, row).await? {
            inserted += 1;
        }
    }

    tracing::info!(parsed = rows.len(), inserted, path = %csv_path.display(), "imported csv");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_csv_validates_and_defaults_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "kind,client_name,position_title,owner_name,status,stage,last_activity_at,next_followup_at,cv_count,source_key\n\
             Lead,Harbor Logistics,,Nadia,Contacted,,2026-10-10T09:00:00Z,,,lead-1\n\
             Project,Vertex Health,Data Engineer,Omar,Active,Sourcing,,2026-10-20T00:00:00Z,0,proj-1\n\
             Candidate,Nobody,,,Active,,,,,bad-1\n\
             Project,Vertex Health,Nurse,Omar,Active,Sourcing,,,-1,bad-2\n"
        )
        .unwrap();

        let rows = read_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);

        let lead = &rows[0];
        assert_eq!(lead.source_key, "lead-1");
        assert_eq!(lead.item.kind, ItemKind::Lead);
        assert_eq!(lead.item.stage, "Pitched Lead");
        assert!(lead.item.last_activity_at.is_some());
        assert!(lead.item.next_followup_at.is_none());

        let project = &rows[1];
        assert_eq!(project.item.position_title.as_deref(), Some("Data Engineer"));
        assert_eq!(project.item.cv_count, 0);
        assert!(project.item.last_activity_at.is_none());
    }

    #[test]
    fn read_csv_picks_up_block_reason_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "kind,client_name,position_title,owner_name,status,stage,block_reason,last_activity_at,next_followup_at,cv_count,source_key\n\
             Project,Vertex Health,Data Engineer,Omar,Active,Client Review,Hiring manager on leave,,,3,proj-2\n"
        )
        .unwrap();

        let rows = read_csv(file.path()).unwrap();
        assert_eq!(
            rows[0].item.block_reason.as_deref(),
            Some("Hiring manager on leave")
        );
    }

    #[test]
    fn seed_rows_cover_both_kinds_with_unique_keys() {
        use chrono::TimeZone;

        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        let rows = seed_rows(now);
        assert_eq!(rows.len(), 8);

        let mut keys: Vec<&str> = rows.iter().map(|r| r.source_key.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), rows.len());

        let blocked = rows.iter().filter(|r| r.item.block_reason.is_some()).count();
        assert_eq!(blocked, 2);
        assert!(rows
            .iter()
            .filter(|r| r.item.kind == ItemKind::Lead)
            .all(|r| r.item.position_title.is_none()));
        assert!(rows
            .iter()
            .filter(|r| r.item.kind == ItemKind::Project)
            .all(|r| r.item.position_title.is_some()));
    }

    #[test]
    fn where_clause_numbers_placeholders_in_bind_order() {
        assert_eq!(where_clause(&ItemFilter::default()), "");

        let owner_only = ItemFilter {
            owner: Some("Omar"),
            created_in: None,
        };
        assert_eq!(where_clause(&owner_only), " WHERE owner_name = $1");

        let month: Month = "2026-10".parse().unwrap();
        let month_only = ItemFilter {
            owner: None,
            created_in: Some(month),
        };
        assert_eq!(
            where_clause(&month_only),
            " WHERE created_at >= $1 AND created_at < $2"
        );

        let both = ItemFilter {
            owner: Some("Omar"),
            created_in: Some(month),
        };
        assert_eq!(
            where_clause(&both),
            " WHERE owner_name = $1 AND created_at >= $2 AND created_at < $3"
        );
    }

    #[test]
    fn read_csv_generates_missing_source_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "kind,client_name,position_title,owner_name,status,stage,last_activity_at,next_followup_at,cv_count,source_key\n\
             Lead,Orchid Retail,,,Contacted,Contract Pending,,,,\n"
        )
        .unwrap();

        let rows = read_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].source_key.starts_with("import-"));
    }
}
