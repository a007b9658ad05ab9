use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use atelier_core::domain::inquiry::{Inquiry, InquiryDetails, InquiryId, InquiryStatus};
use atelier_core::domain::user::UserId;

use super::{non_negative_u32, parse_date, parse_rfc3339, timestamp, RepositoryError};

const SELECT_INQUIRY: &str = "SELECT id, contact_name, contact_email, contact_phone, event_type,
        event_date, address1, address2, city, state, zip_code, guest_count_adults,
        guest_count_children, vision_notes, source, status, assigned_to_id, created_at, updated_at
     FROM inquiry";

/// Column values of one `inquiry` row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InquiryRecord {
    pub id: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub event_type: String,
    pub event_date: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub guest_count_adults: Option<i64>,
    pub guest_count_children: Option<i64>,
    pub vision_notes: Option<String>,
    pub source: Option<String>,
    pub status: String,
    pub assigned_to_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Inquiry> for InquiryRecord {
    fn from(value: &Inquiry) -> Self {
        let details = &value.details;
        Self {
            id: value.id.0.clone(),
            contact_name: details.contact_name.clone(),
            contact_email: details.contact_email.clone(),
            contact_phone: details.contact_phone.clone(),
            event_type: details.event_type.clone(),
            event_date: details.event_date.map(|date| date.format("%Y-%m-%d").to_string()),
            address1: details.address1.clone(),
            address2: details.address2.clone(),
            city: details.city.clone(),
            state: details.state.clone(),
            zip_code: details.zip_code.clone(),
            guest_count_adults: details.guest_count_adults.map(i64::from),
            guest_count_children: details.guest_count_children.map(i64::from),
            vision_notes: details.vision_notes.clone(),
            source: details.source.clone(),
            status: value.status.as_str().to_string(),
            assigned_to_id: value.assigned_to.as_ref().map(|user| user.0.clone()),
            created_at: timestamp(value.created_at),
            updated_at: timestamp(value.updated_at),
        }
    }
}

impl TryFrom<InquiryRecord> for Inquiry {
    type Error = RepositoryError;

    fn try_from(value: InquiryRecord) -> Result<Self, Self::Error> {
        let status = value.status.parse::<InquiryStatus>().map_err(|_| {
            RepositoryError::Decode(format!("invalid inquiry status: {}", value.status))
        })?;

        Ok(Self {
            id: InquiryId(value.id),
            details: InquiryDetails {
                contact_name: value.contact_name,
                contact_email: value.contact_email,
                contact_phone: value.contact_phone,
                event_type: value.event_type,
                event_date: value
                    .event_date
                    .as_deref()
                    .map(|date| parse_date("inquiry event_date", date))
                    .transpose()?,
                address1: value.address1,
                address2: value.address2,
                city: value.city,
                state: value.state,
                zip_code: value.zip_code,
                guest_count_adults: value
                    .guest_count_adults
                    .map(|count| non_negative_u32("guest_count_adults", count))
                    .transpose()?,
                guest_count_children: value
                    .guest_count_children
                    .map(|count| non_negative_u32("guest_count_children", count))
                    .transpose()?,
                vision_notes: value.vision_notes,
                source: value.source,
            },
            status,
            assigned_to: value.assigned_to_id.map(UserId),
            created_at: parse_rfc3339("inquiry created_at", &value.created_at)?,
            updated_at: parse_rfc3339("inquiry updated_at", &value.updated_at)?,
        })
    }
}

fn inquiry_record_from_row(row: &SqliteRow) -> Result<InquiryRecord, RepositoryError> {
    Ok(InquiryRecord {
        id: row.try_get("id")?,
        contact_name: row.try_get("contact_name")?,
        contact_email: row.try_get("contact_email")?,
        contact_phone: row.try_get("contact_phone")?,
        event_type: row.try_get("event_type")?,
        event_date: row.try_get("event_date")?,
        address1: row.try_get("address1")?,
        address2: row.try_get("address2")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        zip_code: row.try_get("zip_code")?,
        guest_count_adults: row.try_get("guest_count_adults")?,
        guest_count_children: row.try_get("guest_count_children")?,
        vision_notes: row.try_get("vision_notes")?,
        source: row.try_get("source")?,
        status: row.try_get("status")?,
        assigned_to_id: row.try_get("assigned_to_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn inquiry_from_row(row: &SqliteRow) -> Result<Inquiry, RepositoryError> {
    inquiry_record_from_row(row)?.try_into()
}

pub(crate) async fn find(
    conn: &mut SqliteConnection,
    id: &InquiryId,
) -> Result<Option<Inquiry>, RepositoryError> {
    let row = sqlx::query(&format!("{SELECT_INQUIRY} WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(inquiry_from_row).transpose()
}

pub(crate) async fn list(conn: &mut SqliteConnection) -> Result<Vec<Inquiry>, RepositoryError> {
    let rows = sqlx::query(&format!("{SELECT_INQUIRY} ORDER BY created_at DESC, rowid DESC"))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(inquiry_from_row).collect()
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    inquiry: &Inquiry,
) -> Result<(), RepositoryError> {
    let record = InquiryRecord::from(inquiry);
    sqlx::query(
        "INSERT INTO inquiry (
            id, contact_name, contact_email, contact_phone, event_type, event_date,
            address1, address2, city, state, zip_code, guest_count_adults,
            guest_count_children, vision_notes, source, status, assigned_to_id,
            created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id)
    .bind(record.contact_name)
    .bind(record.contact_email)
    .bind(record.contact_phone)
    .bind(record.event_type)
    .bind(record.event_date)
    .bind(record.address1)
    .bind(record.address2)
    .bind(record.city)
    .bind(record.state)
    .bind(record.zip_code)
    .bind(record.guest_count_adults)
    .bind(record.guest_count_children)
    .bind(record.vision_notes)
    .bind(record.source)
    .bind(record.status)
    .bind(record.assigned_to_id)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn update_details(
    conn: &mut SqliteConnection,
    id: &InquiryId,
    details: &InquiryDetails,
    updated_at: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE inquiry
         SET contact_name = ?, contact_email = ?, contact_phone = ?, event_type = ?,
             event_date = ?, address1 = ?, address2 = ?, city = ?, state = ?, zip_code = ?,
             guest_count_adults = ?, guest_count_children = ?, vision_notes = ?, source = ?,
             updated_at = ?
         WHERE id = ?",
    )
    .bind(&details.contact_name)
    .bind(&details.contact_email)
    .bind(&details.contact_phone)
    .bind(&details.event_type)
    .bind(details.event_date.map(|date| date.format("%Y-%m-%d").to_string()))
    .bind(&details.address1)
    .bind(&details.address2)
    .bind(&details.city)
    .bind(&details.state)
    .bind(&details.zip_code)
    .bind(details.guest_count_adults.map(i64::from))
    .bind(details.guest_count_children.map(i64::from))
    .bind(&details.vision_notes)
    .bind(&details.source)
    .bind(timestamp(updated_at))
    .bind(&id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_status(
    conn: &mut SqliteConnection,
    id: &InquiryId,
    status: InquiryStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE inquiry SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(timestamp(updated_at))
        .bind(&id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_assignee(
    conn: &mut SqliteConnection,
    id: &InquiryId,
    assignee: Option<&UserId>,
    updated_at: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE inquiry SET assigned_to_id = ?, updated_at = ? WHERE id = ?")
        .bind(assignee.map(|user| user.0.as_str()))
        .bind(timestamp(updated_at))
        .bind(&id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Writes the row back unchanged. As the first statement of a deferred transaction this
/// takes SQLite's write lock without editing the inquiry; other writers wait on it
/// (`busy_timeout`) until commit or rollback.
pub(crate) async fn lock(
    conn: &mut SqliteConnection,
    id: &InquiryId,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE inquiry SET status = status WHERE id = ?")
        .bind(&id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use atelier_core::domain::inquiry::{Inquiry, InquiryDetails, InquiryId, InquiryStatus};
    use atelier_core::domain::user::UserId;

    use super::{find, insert, list, lock, update_assignee, update_status, InquiryRecord};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn inquiry(name: &str) -> Inquiry {
        Inquiry::new(
            InquiryDetails {
                contact_name: name.to_string(),
                contact_email: "client@example.com".to_string(),
                contact_phone: Some("555-0100".to_string()),
                event_type: "Wedding".to_string(),
                event_date: NaiveDate::from_ymd_opt(2026, 9, 12),
                address1: None,
                address2: None,
                city: Some("Savannah".to_string()),
                state: Some("GA".to_string()),
                zip_code: None,
                guest_count_adults: Some(180),
                guest_count_children: Some(12),
                vision_notes: Some("Garden romance, blush and ivory".to_string()),
                source: Some("instagram".to_string()),
            },
            Utc::now(),
        )
    }

    #[test]
    fn record_round_trip_keeps_dates_and_counts() {
        let value = inquiry("Lena Park");
        let decoded = Inquiry::try_from(InquiryRecord::from(&value)).expect("decode");

        assert_eq!(decoded.details, value.details);
        assert_eq!(decoded.status, InquiryStatus::New);
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let mut record = InquiryRecord::from(&inquiry("Lena Park"));
        record.status = "ARCHIVED".to_string();
        assert!(Inquiry::try_from(record).is_err());
    }

    #[tokio::test]
    async fn insert_find_and_update_inquiry() {
        let pool = setup_pool().await;
        let mut conn = pool.acquire().await.expect("acquire");
        let value = inquiry("Lena Park");

        insert(&mut conn, &value).await.expect("insert");
        assert!(update_status(&mut conn, &value.id, InquiryStatus::Quoting, Utc::now())
            .await
            .expect("update status"));
        let planner = UserId("planner".to_string());
        assert!(update_assignee(&mut conn, &value.id, Some(&planner), Utc::now())
            .await
            .expect("assign"));

        let found = find(&mut conn, &value.id).await.expect("find").expect("exists");
        assert_eq!(found.status, InquiryStatus::Quoting);
        assert_eq!(found.assigned_to, Some(UserId("planner".to_string())));
        assert_eq!(found.details.event_date, NaiveDate::from_ymd_opt(2026, 9, 12));
    }

    #[tokio::test]
    async fn missing_rows_report_false_or_none() {
        let pool = setup_pool().await;
        let mut conn = pool.acquire().await.expect("acquire");
        let missing = InquiryId("missing".to_string());

        assert!(find(&mut conn, &missing).await.expect("find").is_none());
        assert!(!lock(&mut conn, &missing).await.expect("lock"));
        assert!(!update_status(&mut conn, &missing, InquiryStatus::Lost, Utc::now())
            .await
            .expect("update"));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let pool = setup_pool().await;
        let mut conn = pool.acquire().await.expect("acquire");

        let mut older = inquiry("Older");
        older.created_at = Utc::now() - chrono::Duration::days(2);
        let newer = inquiry("Newer");
        insert(&mut conn, &older).await.expect("insert older");
        insert(&mut conn, &newer).await.expect("insert newer");

        let names: Vec<String> = list(&mut conn)
            .await
            .expect("list")
            .into_iter()
            .map(|inquiry| inquiry.details.contact_name)
            .collect();
        assert_eq!(names, vec!["Newer".to_string(), "Older".to_string()]);
    }
}
