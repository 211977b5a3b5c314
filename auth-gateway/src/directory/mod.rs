//! Read-mostly queries against the shared relational user directory (component B).
//!
//! The gateway does not own this schema — it is a consumer. Writes are limited to
//! `last_login_at`, the four federated-identity columns, and the append-only attempt log.

mod model;

pub use model::{Discriminator, DiscriminatorColumn, LinkError, MagicLinkToken, Provider, RoleRecord, Subject};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct Directory {
    pool: PgPool,
}

impl Directory {
    pub async fn connect(database_url: &str, pool_size: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn find_subject_by_email(&self, email: &str) -> sqlx::Result<Option<Subject>> {
        sqlx::query_as::<_, Subject>(
            "SELECT id, external_id, email, name, password_digest, discriminator, role_id, last_login_at \
             FROM subjects WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_subject_by_id(&self, user_id: i64) -> sqlx::Result<Option<Subject>> {
        sqlx::query_as::<_, Subject>(
            "SELECT id, external_id, email, name, password_digest, discriminator, role_id, last_login_at \
             FROM subjects WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_role_record(&self, discriminator: Discriminator, role_id: i64) -> sqlx::Result<Option<RoleRecord>> {
        match discriminator {
            Discriminator::Teacher => {
                sqlx::query_as::<_, model::TeacherRow>(
                    "SELECT id, p1_subject, p2_subject FROM teachers WHERE id = $1",
                )
                .bind(role_id)
                .fetch_optional(&self.pool)
                .await
                .map(|row| row.map(RoleRecord::from))
            }
            Discriminator::Student => {
                sqlx::query_as::<_, model::StudentRow>(
                    "SELECT id, p1_subject, p2_subject, p3_subject FROM students WHERE id = $1",
                )
                .bind(role_id)
                .fetch_optional(&self.pool)
                .await
                .map(|row| row.map(RoleRecord::from))
            }
            Discriminator::Parent => {
                sqlx::query_as::<_, model::ParentRow>("SELECT id, p3_subject FROM parents WHERE id = $1")
                    .bind(role_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map(|row| row.map(RoleRecord::from))
            }
            Discriminator::Admin => sqlx::query_as::<_, model::AdminRow>("SELECT id FROM admins WHERE id = $1")
                .bind(role_id)
                .fetch_optional(&self.pool)
                .await
                .map(|row| row.map(RoleRecord::from)),
        }
    }

    /// Looks up the (subject, role record) pair owning `provider_subject`, searching only
    /// the role tables that carry that provider's column.
    pub async fn find_role_by_provider_subject(
        &self,
        provider: Provider,
        provider_subject: &str,
    ) -> sqlx::Result<Option<(Subject, RoleRecord)>> {
        for discriminator in provider.eligible_discriminators() {
            let column = provider.column_name(discriminator).expect("checked by eligible_discriminators");

            let role_id: Option<i64> = sqlx::query_scalar(&format!(
                "SELECT id FROM {} WHERE {column} = $1",
                discriminator.table_name()
            ))
            .bind(provider_subject)
            .fetch_optional(&self.pool)
            .await?;

            let Some(role_id) = role_id else { continue };

            let Some(subject) = self.find_subject_by_role(discriminator, role_id).await? else {
                continue;
            };
            let Some(role_record) = self.find_role_record(discriminator, role_id).await? else {
                continue;
            };

            return Ok(Some((subject, role_record)));
        }

        Ok(None)
    }

    async fn find_subject_by_role(&self, discriminator: Discriminator, role_id: i64) -> sqlx::Result<Option<Subject>> {
        sqlx::query_as::<_, Subject>(
            "SELECT id, external_id, email, name, password_digest, discriminator, role_id, last_login_at \
             FROM subjects WHERE discriminator = $1 AND role_id = $2",
        )
        .bind(discriminator.as_str())
        .bind(role_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_magic_link(&self, secret: &str) -> sqlx::Result<Option<MagicLinkToken>> {
        sqlx::query_as::<_, MagicLinkToken>(
            "SELECT secret, user_id, permanent, created_at FROM login_tokens WHERE secret = $1",
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await
    }

    /// Best-effort write: failures are logged by the caller and never surfaced.
    pub async fn touch_last_login(&self, user_id: i64) -> sqlx::Result<()> {
        sqlx::query("UPDATE subjects SET last_login_at = $1 WHERE id = $2")
            .bind(OffsetDateTime::now_utc())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn link_provider_subject(
        &self,
        discriminator: Discriminator,
        role_id: i64,
        provider: Provider,
        provider_subject: &str,
    ) -> Result<(), LinkError> {
        let Some(column) = provider.column_name(discriminator) else {
            return Err(LinkError::ProviderRoleMismatch);
        };

        let result = sqlx::query(&format!("UPDATE {} SET {column} = $1 WHERE id = $2", discriminator.table_name()))
            .bind(provider_subject)
            .bind(role_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => Err(LinkError::Conflict),
            Err(source) => Err(LinkError::Other(source)),
        }
    }

    /// Best-effort write; non-persistent links are deleted on first successful use.
    pub async fn delete_magic_link(&self, secret: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM login_tokens WHERE secret = $1")
            .bind(secret)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Best-effort write for out-of-band audit only; never read on the hot path.
    pub async fn append_attempt_log(&self, identity: &str, client_addr: &str, success: bool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO attempt_log (identity, client_addr, success, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(identity)
        .bind(client_addr)
        .bind(success)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
