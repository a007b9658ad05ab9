use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use atelier_core::domain::activity::{
    ActivityLog, ActivityLogId, ActivityType, EntityRef, NewActivity,
};
use atelier_core::domain::user::UserId;

use super::{parse_rfc3339, timestamp, RepositoryError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityRecord {
    pub id: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub activity_type: String,
    pub message: Option<String>,
    pub payload_json: Option<String>,
    pub actor_id: Option<String>,
    pub created_at: String,
}

impl TryFrom<ActivityRecord> for ActivityLog {
    type Error = RepositoryError;

    fn try_from(value: ActivityRecord) -> Result<Self, Self::Error> {
        let entity = EntityRef::from_parts(&value.entity_kind, value.entity_id).ok_or_else(|| {
            RepositoryError::Decode(format!("invalid activity entity kind: {}", value.entity_kind))
        })?;
        let activity_type = value.activity_type.parse::<ActivityType>().map_err(|_| {
            RepositoryError::Decode(format!("invalid activity type: {}", value.activity_type))
        })?;
        let payload = value
            .payload_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|err| RepositoryError::Decode(format!("invalid activity payload: {err}")))?;

        Ok(Self {
            id: ActivityLogId(value.id),
            entity,
            activity_type,
            message: value.message,
            payload,
            actor_id: value.actor_id.map(UserId),
            created_at: parse_rfc3339("activity created_at", &value.created_at)?,
        })
    }
}

fn activity_record_from_row(row: &SqliteRow) -> Result<ActivityRecord, RepositoryError> {
    Ok(ActivityRecord {
        id: row.try_get("id")?,
        entity_kind: row.try_get("entity_kind")?,
        entity_id: row.try_get("entity_id")?,
        activity_type: row.try_get("activity_type")?,
        message: row.try_get("message")?,
        payload_json: row.try_get("payload_json")?,
        actor_id: row.try_get("actor_id")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) async fn append(
    conn: &mut SqliteConnection,
    entry: NewActivity,
) -> Result<ActivityLogId, RepositoryError> {
    let id = ActivityLogId::generate();
    let payload_json = entry
        .payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| RepositoryError::Decode(format!("unencodable activity payload: {err}")))?;

    sqlx::query(
        "INSERT INTO activity_log (
            id, entity_kind, entity_id, activity_type, message, payload_json, actor_id, created_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id.0)
    .bind(entry.entity.kind())
    .bind(entry.entity.id())
    .bind(entry.activity_type.as_str())
    .bind(&entry.message)
    .bind(payload_json)
    .bind(entry.actor_id.as_ref().map(|actor| actor.0.as_str()))
    .bind(timestamp(entry.occurred_at))
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

pub(crate) async fn list_for_entity(
    conn: &mut SqliteConnection,
    entity: &EntityRef,
) -> Result<Vec<ActivityLog>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, entity_kind, entity_id, activity_type, message, payload_json, actor_id,
                created_at
         FROM activity_log
         WHERE entity_kind = ? AND entity_id = ?
         ORDER BY created_at DESC, rowid DESC",
    )
    .bind(entity.kind())
    .bind(entity.id())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(|row| ActivityLog::try_from(activity_record_from_row(row)?)).collect()
}
