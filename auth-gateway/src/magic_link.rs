//! Single-use and permanent login-link authentication (component G).

use time::OffsetDateTime;

use crate::directory::{Directory, RoleRecord, Subject};

const DEFAULT_TOKEN_LIFETIME: time::Duration = time::Duration::minutes(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicLinkOutcome {
    Ok,
    NotFound,
    Expired,
}

pub struct MagicLinkAuthenticator {
    directory: Directory,
}

impl MagicLinkAuthenticator {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }

    /// Resolves `secret` to a subject/role pair. Single-use tokens (`permanent = false`)
    /// are deleted immediately after a successful resolution so a second use of the same
    /// link always resolves to `NotFound`.
    pub async fn resolve(&self, secret: &str) -> anyhow::Result<(MagicLinkOutcome, Option<(Subject, RoleRecord)>)> {
        let Some(link) = self.directory.find_magic_link(secret).await? else {
            return Ok((MagicLinkOutcome::NotFound, None));
        };

        if !link.permanent && OffsetDateTime::now_utc() - link.created_at > DEFAULT_TOKEN_LIFETIME {
            self.directory.delete_magic_link(secret).await?;
            return Ok((MagicLinkOutcome::Expired, None));
        }

        let Some(subject) = self.directory.find_subject_by_id(link.user_id).await? else {
            return Ok((MagicLinkOutcome::NotFound, None));
        };

        let role = self
            .directory
            .find_role_record(subject.discriminator(), subject.role_id)
            .await?;

        if !link.permanent {
            self.directory.delete_magic_link(secret).await?;
        }

        Ok((MagicLinkOutcome::Ok, role.map(|role| (subject, role))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lifetime_is_five_minutes() {
        assert_eq!(DEFAULT_TOKEN_LIFETIME, time::Duration::minutes(5));
    }
}
