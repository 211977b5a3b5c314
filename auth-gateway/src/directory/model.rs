use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Discriminator-selected role extension — teachers, students, parents, and admins
/// each carry a different set of federated-identity columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    Teacher,
    Student,
    Parent,
    Admin,
}

impl Discriminator {
    pub fn as_str(self) -> &'static str {
        match self {
            Discriminator::Teacher => "TEACHER",
            Discriminator::Student => "STUDENT",
            Discriminator::Parent => "PARENT",
            Discriminator::Admin => "ADMIN",
        }
    }

    pub(super) fn table_name(self) -> &'static str {
        match self {
            Discriminator::Teacher => "teachers",
            Discriminator::Student => "students",
            Discriminator::Parent => "parents",
            Discriminator::Admin => "admins",
        }
    }
}

impl std::str::FromStr for Discriminator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEACHER" => Ok(Discriminator::Teacher),
            "STUDENT" => Ok(Discriminator::Student),
            "PARENT" => Ok(Discriminator::Parent),
            "ADMIN" => Ok(Discriminator::Admin),
            other => anyhow::bail!("unknown discriminator `{other}`"),
        }
    }
}

/// One of the four federated identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    P1,
    P2,
    P3,
    P4,
}

impl Provider {
    /// Roles this provider is allowed to link.
    pub fn eligible_discriminators(self) -> &'static [Discriminator] {
        match self {
            Provider::P1 | Provider::P2 => &[Discriminator::Teacher, Discriminator::Student],
            Provider::P3 | Provider::P4 => &[Discriminator::Student, Discriminator::Parent],
        }
    }

    /// The column this provider writes/reads on a given role table, or `None` if the
    /// provider is not allowed to link that role (`PROVIDER_ROLE_MISMATCH`).
    pub fn column_name(self, discriminator: Discriminator) -> Option<&'static str> {
        if !self.eligible_discriminators().contains(&discriminator) {
            return None;
        }

        match self {
            Provider::P1 => Some("p1_subject"),
            Provider::P2 => Some("p2_subject"),
            Provider::P3 | Provider::P4 => Some("p3_subject"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::P1 => "p1",
            Provider::P2 => "p2",
            Provider::P3 => "p3",
            Provider::P4 => "p4",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "p1" => Ok(Provider::P1),
            "p2" => Ok(Provider::P2),
            "p3" => Ok(Provider::P3),
            "p4" => Ok(Provider::P4),
            _ => Err(()),
        }
    }
}

#[derive(Debug, FromRow, Clone)]
pub struct Subject {
    pub id: i64,
    pub external_id: Uuid,
    pub email: String,
    pub name: String,
    pub password_digest: Option<String>,
    #[sqlx(try_from = "String")]
    pub discriminator: DiscriminatorColumn,
    pub role_id: i64,
    pub last_login_at: Option<OffsetDateTime>,
}

/// Thin wrapper so `sqlx`'s `try_from` column conversion can go through `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscriminatorColumn(pub Discriminator);

impl TryFrom<String> for DiscriminatorColumn {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map(DiscriminatorColumn)
    }
}

impl Subject {
    pub fn discriminator(&self) -> Discriminator {
        self.discriminator.0
    }
}

#[derive(Debug, Clone)]
pub enum RoleRecord {
    Teacher { id: i64, p1_subject: Option<String>, p2_subject: Option<String> },
    Student {
        id: i64,
        p1_subject: Option<String>,
        p2_subject: Option<String>,
        p3_subject: Option<String>,
    },
    Parent { id: i64, p3_subject: Option<String> },
    Admin { id: i64 },
}

impl RoleRecord {
    pub fn id(&self) -> i64 {
        match self {
            RoleRecord::Teacher { id, .. }
            | RoleRecord::Student { id, .. }
            | RoleRecord::Parent { id, .. }
            | RoleRecord::Admin { id } => *id,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct TeacherRow {
    id: i64,
    p1_subject: Option<String>,
    p2_subject: Option<String>,
}

impl From<TeacherRow> for RoleRecord {
    fn from(row: TeacherRow) -> Self {
        RoleRecord::Teacher {
            id: row.id,
            p1_subject: row.p1_subject,
            p2_subject: row.p2_subject,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct StudentRow {
    id: i64,
    p1_subject: Option<String>,
    p2_subject: Option<String>,
    p3_subject: Option<String>,
}

impl From<StudentRow> for RoleRecord {
    fn from(row: StudentRow) -> Self {
        RoleRecord::Student {
            id: row.id,
            p1_subject: row.p1_subject,
            p2_subject: row.p2_subject,
            p3_subject: row.p3_subject,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct ParentRow {
    id: i64,
    p3_subject: Option<String>,
}

impl From<ParentRow> for RoleRecord {
    fn from(row: ParentRow) -> Self {
        RoleRecord::Parent {
            id: row.id,
            p3_subject: row.p3_subject,
        }
    }
}

#[derive(Debug, FromRow)]
pub(super) struct AdminRow {
    id: i64,
}

impl From<AdminRow> for RoleRecord {
    fn from(row: AdminRow) -> Self {
        RoleRecord::Admin { id: row.id }
    }
}

#[derive(Debug, FromRow)]
pub struct MagicLinkToken {
    pub secret: String,
    pub user_id: i64,
    pub permanent: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("provider is not allowed to link this role")]
    ProviderRoleMismatch,
    #[error("provider subject is already linked to another subject")]
    Conflict,
    #[error("directory error")]
    Other(#[source] sqlx::Error),
}
