//! Email/password verification against the directory (component F).
//!
//! A missing subject still pays the cost of a bcrypt comparison against a fixed dummy
//! hash, so that "no such account" and "wrong password" take the same amount of time.

use crate::directory::{Directory, RoleRecord, Subject};

/// A valid bcrypt hash of an unguessable constant, never matched by a real password.
const DUMMY_DIGEST: &str = "$2b$12$C6UzMDM.H6dfI/f/IKcEeO5x1NrC0zZ7cP9F5FQ2mJY0m1QxE9nO2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Ok,
    NoSuchAccount,
    WrongPassword,
    NoPasswordSet,
}

const MIN_PASSWORD_LEN: usize = 3;

/// Pragmatic shape check: one `@`, at least one dot in the domain part, no
/// whitespace. Not a full RFC 5322 grammar — the directory is the source of truth for
/// whether the address actually exists.
pub fn email_shape_is_valid(email: &str) -> bool {
    let email = email.trim();

    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub fn password_shape_is_valid(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LEN
}

/// Trims and case-folds the address; callers compare/store against this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct CredentialVerifier {
    directory: Directory,
}

impl CredentialVerifier {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }

    /// Looks up `email` (case-insensitively, using the same normalization) and verifies
    /// `password` against the stored digest. The resolved subject/role pair is only
    /// returned when the outcome is `Ok` — callers never act on an identity whose
    /// credential check failed.
    pub async fn verify(&self, email: &str, password: &str) -> anyhow::Result<(VerifyOutcome, Option<(Subject, RoleRecord)>)> {
        let normalized = normalize_email(email);
        let subject = self.directory.find_subject_by_email(&normalized).await?;

        let Some(subject) = subject else {
            // Burn the same bcrypt cost as a real check so the response latency does not
            // distinguish "unknown email" from "wrong password".
            let _ = tokio::task::spawn_blocking({
                let password = password.to_owned();
                move || bcrypt::verify(password, DUMMY_DIGEST)
            })
            .await;
            return Ok((VerifyOutcome::NoSuchAccount, None));
        };

        let Some(digest) = subject.password_digest.clone() else {
            return Ok((VerifyOutcome::NoPasswordSet, None));
        };

        let matches = tokio::task::spawn_blocking({
            let password = password.to_owned();
            move || bcrypt::verify(password, &digest)
        })
        .await
        .unwrap_or(Ok(false))
        .unwrap_or(false);

        if !matches {
            return Ok((VerifyOutcome::WrongPassword, None));
        }

        let role = self
            .directory
            .find_role_record(subject.discriminator(), subject.role_id)
            .await?;

        Ok((VerifyOutcome::Ok, role.map(|role| (subject, role))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_digest_is_a_valid_bcrypt_hash() {
        assert!(bcrypt::verify("anything", DUMMY_DIGEST).is_ok());
    }

    #[rstest::rstest]
    #[case("t@example.com", true)]
    #[case("  t@example.com  ", true)]
    #[case("no-at-sign.example.com", false)]
    #[case("t@localhost", false)]
    #[case("t @example.com", false)]
    #[case("t@.example.com", false)]
    #[case("t@example.", false)]
    fn email_shape(#[case] email: &str, #[case] expected: bool) {
        assert_eq!(email_shape_is_valid(email), expected);
    }

    #[test]
    fn password_below_minimum_length_is_rejected() {
        assert!(!password_shape_is_valid("ab"));
        assert!(password_shape_is_valid("abc"));
    }
}
