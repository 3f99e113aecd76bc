//! PostgreSQL implementation of the profile, document and application stores.

use async_trait::async_trait;
use sqlx::postgres::PgQueryResult;
use sqlx::types::Json;
use sqlx::{Executor, PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::models::document::{DocumentRow, DocumentSummary};
use crate::models::profile::{
    AchievementRow, BulletRow, EducationRow, ExperienceRow, LanguageRow, ProfileRow, SkillRow,
};
use crate::store::schema::SCHEMA;
use crate::store::{
    ApplicationStore, ChangeSet, Collection, DocumentStore, ProfileStore, ProfileUpsert, Row,
    RowOp, StoreError, StoredProfile,
};

const APPLICATION_COLUMNS: &str = "id, user_id, job_title, company, job_url, location, status, \
     document_id, cover_letter, notes, applied_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates any missing tables and indexes.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.pool.execute(SCHEMA).await?;
        info!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<StoredProfile>, StoreError> {
        // One snapshot for all eight reads, so a concurrent sync is never seen half-applied.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let profile: Option<ProfileRow> = sqlx::query_as(
            "SELECT user_id, identity, summary, additional, updated_at FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(profile) = profile else {
            tx.commit().await?;
            return Ok(None);
        };

        let experience = sqlx::query_as::<_, ExperienceRow>(
            "SELECT id, user_id, company, title, dates, sort_order FROM experience \
             WHERE user_id = $1 ORDER BY sort_order ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let bullets = sqlx::query_as::<_, BulletRow>(
            r#"
            SELECT b.id, b.experience_id, b.text, b.sort_order
            FROM bullets b
            JOIN experience e ON e.id = b.experience_id
            WHERE e.user_id = $1
            ORDER BY b.experience_id, b.sort_order ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let education = sqlx::query_as::<_, EducationRow>(
            "SELECT id, user_id, institution, degree, field_of_study, dates, sort_order \
             FROM education WHERE user_id = $1 ORDER BY sort_order ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let achievements = sqlx::query_as::<_, AchievementRow>(
            "SELECT id, user_id, title, issuer, date, sort_order \
             FROM achievements WHERE user_id = $1 ORDER BY sort_order ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let skills = sqlx::query_as::<_, SkillRow>(
            "SELECT id, user_id, name, sort_order FROM skills WHERE user_id = $1 ORDER BY sort_order ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let languages = sqlx::query_as::<_, LanguageRow>(
            "SELECT id, user_id, language, level, sort_order \
             FROM languages WHERE user_id = $1 ORDER BY sort_order ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(StoredProfile {
            profile,
            experience,
            bullets,
            education,
            achievements,
            skills,
            languages,
        }))
    }

    async fn apply(&self, user_id: Uuid, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        upsert_profile(&mut tx, user_id, &changes.profile).await?;
        for op in &changes.ops {
            match op {
                RowOp::Insert(row) => insert_row(&mut tx, user_id, row).await?,
                RowOp::Update(row) => update_row(&mut tx, user_id, row).await?,
                RowOp::Delete { collection, id } => {
                    delete_row(&mut tx, user_id, *collection, *id).await?
                }
            }
        }

        // Dropping `tx` on any `?` above rolls the whole change set back.
        tx.commit().await?;
        debug!("Applied {} row operations for user {user_id}", changes.ops.len());
        Ok(())
    }
}

async fn upsert_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
    profile: &ProfileUpsert,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, identity, summary, additional, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id) DO UPDATE
        SET identity = EXCLUDED.identity,
            summary = EXCLUDED.summary,
            additional = EXCLUDED.additional,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id)
    .bind(Json(&profile.identity))
    .bind(&profile.summary)
    .bind(Json(&profile.additional))
    .bind(profile.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_row(conn: &mut PgConnection, user_id: Uuid, row: &Row) -> Result<(), StoreError> {
    let result = match row {
        Row::Experience(r) => {
            sqlx::query(
                "INSERT INTO experience (id, user_id, company, title, dates, sort_order) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(r.id)
            .bind(user_id)
            .bind(&r.company)
            .bind(&r.title)
            .bind(&r.dates)
            .bind(r.sort_order)
            .execute(&mut *conn)
            .await?
        }
        Row::Bullet(r) => {
            // The parent must belong to this user.
            sqlx::query(
                r#"
                INSERT INTO bullets (id, experience_id, text, sort_order)
                SELECT $1, $2, $3, $4
                WHERE EXISTS (SELECT 1 FROM experience WHERE id = $2 AND user_id = $5)
                "#,
            )
            .bind(r.id)
            .bind(r.experience_id)
            .bind(&r.text)
            .bind(r.sort_order)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        }
        Row::Education(r) => {
            sqlx::query(
                "INSERT INTO education (id, user_id, institution, degree, field_of_study, dates, sort_order) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(r.id)
            .bind(user_id)
            .bind(&r.institution)
            .bind(&r.degree)
            .bind(&r.field_of_study)
            .bind(&r.dates)
            .bind(r.sort_order)
            .execute(&mut *conn)
            .await?
        }
        Row::Achievement(r) => {
            sqlx::query(
                "INSERT INTO achievements (id, user_id, title, issuer, date, sort_order) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(r.id)
            .bind(user_id)
            .bind(&r.title)
            .bind(&r.issuer)
            .bind(&r.date)
            .bind(r.sort_order)
            .execute(&mut *conn)
            .await?
        }
        Row::Skill(r) => {
            sqlx::query("INSERT INTO skills (id, user_id, name, sort_order) VALUES ($1, $2, $3, $4)")
                .bind(r.id)
                .bind(user_id)
                .bind(&r.name)
                .bind(r.sort_order)
                .execute(&mut *conn)
                .await?
        }
        Row::Language(r) => {
            sqlx::query(
                "INSERT INTO languages (id, user_id, language, level, sort_order) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(r.id)
            .bind(user_id)
            .bind(&r.language)
            .bind(&r.level)
            .bind(r.sort_order)
            .execute(&mut *conn)
            .await?
        }
    };
    expect_row("insert", row, &result)
}

async fn update_row(conn: &mut PgConnection, user_id: Uuid, row: &Row) -> Result<(), StoreError> {
    let result = match row {
        Row::Experience(r) => {
            sqlx::query(
                "UPDATE experience SET company = $1, title = $2, dates = $3, sort_order = $4 \
                 WHERE id = $5 AND user_id = $6",
            )
            .bind(&r.company)
            .bind(&r.title)
            .bind(&r.dates)
            .bind(r.sort_order)
            .bind(r.id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        }
        Row::Bullet(r) => {
            sqlx::query(
                r#"
                UPDATE bullets SET text = $1, sort_order = $2
                WHERE id = $3 AND experience_id = $4
                  AND experience_id IN (SELECT id FROM experience WHERE user_id = $5)
                "#,
            )
            .bind(&r.text)
            .bind(r.sort_order)
            .bind(r.id)
            .bind(r.experience_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        }
        Row::Education(r) => {
            sqlx::query(
                "UPDATE education SET institution = $1, degree = $2, field_of_study = $3, dates = $4, \
                 sort_order = $5 WHERE id = $6 AND user_id = $7",
            )
            .bind(&r.institution)
            .bind(&r.degree)
            .bind(&r.field_of_study)
            .bind(&r.dates)
            .bind(r.sort_order)
            .bind(r.id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        }
        Row::Achievement(r) => {
            sqlx::query(
                "UPDATE achievements SET title = $1, issuer = $2, date = $3, sort_order = $4 \
                 WHERE id = $5 AND user_id = $6",
            )
            .bind(&r.title)
            .bind(&r.issuer)
            .bind(&r.date)
            .bind(r.sort_order)
            .bind(r.id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        }
        Row::Skill(r) => {
            sqlx::query("UPDATE skills SET name = $1, sort_order = $2 WHERE id = $3 AND user_id = $4")
                .bind(&r.name)
                .bind(r.sort_order)
                .bind(r.id)
                .bind(user_id)
                .execute(&mut *conn)
                .await?
        }
        Row::Language(r) => {
            sqlx::query(
                "UPDATE languages SET language = $1, level = $2, sort_order = $3 \
                 WHERE id = $4 AND user_id = $5",
            )
            .bind(&r.language)
            .bind(&r.level)
            .bind(r.sort_order)
            .bind(r.id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
        }
    };
    expect_row("update", row, &result)
}

async fn delete_row(
    conn: &mut PgConnection,
    user_id: Uuid,
    collection: Collection,
    id: Uuid,
) -> Result<(), StoreError> {
    // A row that is already gone is not an error.
    match collection {
        Collection::Bullet => {
            sqlx::query(
                "DELETE FROM bullets WHERE id = $1 \
                 AND experience_id IN (SELECT id FROM experience WHERE user_id = $2)",
            )
            .bind(id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        }
        other => {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE id = $1 AND user_id = $2",
                other.table()
            ))
            .bind(id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

fn expect_row(action: &str, row: &Row, result: &PgQueryResult) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!(
            "{action} of {} row {} matched nothing",
            row.collection().table(),
            row.id()
        )));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn save_document(&self, document: &DocumentRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, user_id, file_name, raw_text, parsed_data, storage_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(document.id)
        .bind(document.user_id)
        .bind(&document.file_name)
        .bind(&document.raw_text)
        .bind(&document.parsed_data)
        .bind(&document.storage_key)
        .bind(document.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentSummary>, StoreError> {
        Ok(sqlx::query_as::<_, DocumentSummary>(
            "SELECT id, file_name, created_at FROM documents WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<DocumentRow>, StoreError> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            "SELECT id, user_id, file_name, raw_text, parsed_data, storage_key, created_at \
             FROM documents WHERE id = $1 AND user_id = $2",
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn latest_document(&self, user_id: Uuid) -> Result<Option<DocumentRow>, StoreError> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            "SELECT id, user_id, file_name, raw_text, parsed_data, storage_key, created_at \
             FROM documents WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn create_application(&self, application: &ApplicationRow) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO applications
                (id, user_id, job_title, company, job_url, location, status,
                 document_id, cover_letter, notes, applied_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(application.id)
        .bind(application.user_id)
        .bind(&application.job_title)
        .bind(&application.company)
        .bind(&application.job_url)
        .bind(&application.location)
        .bind(application.status.as_str())
        .bind(application.document_id)
        .bind(&application.cover_letter)
        .bind(&application.notes)
        .bind(application.applied_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_applications(
        &self,
        user_id: Uuid,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRow>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY applied_at DESC"
        );
        Ok(sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(user_id)
            .bind(status.map(ApplicationStatus::as_str))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_application_status(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationRow>, StoreError> {
        let sql = format!(
            "UPDATE applications SET status = $3 WHERE id = $1 AND user_id = $2 \
             RETURNING {APPLICATION_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(application_id)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if updated.is_some() {
            debug!("Application {application_id} moved to {status}");
        }
        Ok(updated)
    }
}
