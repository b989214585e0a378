// src/auth.rs
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::staff::{Staff, StaffId};

pub const GUEST_ID: &str = "guest";
const GUEST_ROLE: &str = "OP";

/// Who the identity provider says is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
}

/// The signed-in user as the board sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: StaffId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_guest: bool,
}

/// Maps an identity onto a staff record by exact email match. Anyone else
/// becomes a guest operator.
pub fn identify(identity: &Identity, staff: &[Staff]) -> SessionUser {
    match staff
        .iter()
        .find(|s| s.email.as_deref() == Some(identity.email.as_str()))
    {
        Some(member) => {
            debug!("{} signed in as staff {}", identity.email, member.id);
            SessionUser {
                id: member.id.clone(),
                name: member.name.clone(),
                email: identity.email.clone(),
                role: member.role.clone(),
                is_guest: false,
            }
        }
        None => {
            info!("{} has no staff record, signing in as guest", identity.email);
            SessionUser {
                id: GUEST_ID.to_string(),
                name: identity.name.clone(),
                email: identity.email.clone(),
                role: GUEST_ROLE.to_string(),
                is_guest: true,
            }
        }
    }
}

// --- Admin Policy ---

/// Who counts as an admin. Loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPolicy {
    pub admin_emails: Vec<String>,
    pub admin_staff_ids: Vec<StaffId>,
    /// Lower-case hex SHA-256 of the admin passphrase.
    pub admin_passphrase_sha256: Option<String>,
}

impl AdminPolicy {
    /// Emails compare case-insensitively. Guests never match by staff id.
    pub fn is_admin(&self, user: &SessionUser) -> bool {
        let by_email = self
            .admin_emails
            .iter()
            .any(|email| email.eq_ignore_ascii_case(&user.email));
        let by_id = !user.is_guest && self.admin_staff_ids.iter().any(|id| *id == user.id);
        by_email || by_id
    }

    /// False when no passphrase is configured.
    pub fn verify_passphrase(&self, passphrase: &str) -> bool {
        match &self.admin_passphrase_sha256 {
            Some(expected) => expected.eq_ignore_ascii_case(&passphrase_digest(passphrase)),
            None => false,
        }
    }
}

pub fn is_admin(user: &SessionUser, policy: &AdminPolicy) -> bool {
    policy.is_admin(user)
}

pub fn passphrase_digest(passphrase: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn staff() -> Vec<Staff> {
        vec![
            Staff {
                id: "admin".to_string(),
                name: "管理者".to_string(),
                role: "SV".to_string(),
                email: Some("boss@example.com".to_string()),
                ..Default::default()
            },
            Staff {
                id: "s1".to_string(),
                name: "山田".to_string(),
                role: "OP".to_string(),
                email: Some("yamada@example.com".to_string()),
                ..Default::default()
            },
        ]
    }

    fn identity(email: &str) -> Identity {
        Identity {
            email: email.to_string(),
            name: "Someone".to_string(),
        }
    }

    fn policy() -> AdminPolicy {
        AdminPolicy {
            admin_emails: vec!["Owner@Example.com".to_string()],
            admin_staff_ids: vec!["admin".to_string()],
            admin_passphrase_sha256: Some(passphrase_digest("open sesame")),
        }
    }

    #[test]
    fn identify_matches_staff_by_exact_email() {
        let user = identify(&identity("yamada@example.com"), &staff());
        assert_eq!(user.id, "s1");
        assert_eq!(user.name, "山田");
        assert!(!user.is_guest);

        let guest = identify(&identity("YAMADA@example.com"), &staff());
        assert_eq!(guest.id, GUEST_ID);
        assert_eq!(guest.role, "OP");
        assert_eq!(guest.name, "Someone");
        assert!(guest.is_guest);
    }

    #[test]
    fn admin_by_staff_id_or_email() {
        let policy = policy();
        assert!(is_admin(&identify(&identity("boss@example.com"), &staff()), &policy));
        assert!(!is_admin(&identify(&identity("yamada@example.com"), &staff()), &policy));
        // Allow-listed emails count even without a staff record.
        assert!(is_admin(&identify(&identity("owner@example.com"), &staff()), &policy));
        assert!(!is_admin(&identify(&identity("stranger@example.com"), &staff()), &policy));
    }

    #[test]
    fn guest_cannot_claim_staff_id() {
        let policy = AdminPolicy {
            admin_staff_ids: vec![GUEST_ID.to_string()],
            ..Default::default()
        };
        let guest = identify(&identity("stranger@example.com"), &staff());
        assert!(!policy.is_admin(&guest));
    }

    #[test]
    fn passphrase_is_checked_by_digest() {
        let policy = policy();
        assert!(policy.verify_passphrase("open sesame"));
        assert!(!policy.verify_passphrase("open sesame "));
        assert!(!AdminPolicy::default().verify_passphrase("open sesame"));
        assert_eq!(
            passphrase_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
