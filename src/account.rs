//! Customer account as read from the account datastore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "server")]
use sqlx::FromRow;

/// Lifecycle status of an account.
///
/// The sweep only ever reads `trial` accounts and only ever writes `expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Trial,
    Expired,
    Active,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Trial => "trial",
            AccountStatus::Expired => "expired",
            AccountStatus::Active => "active",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account record.
///
/// This mirrors the `accounts` table. `status` stays a plain string because
/// the datastore knows more statuses than this job cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(FromRow))]
pub struct Account {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: String,
    pub plan: String,
    pub status: String,
    pub trial_end: DateTime<Utc>,
}

impl Account {
    /// Name used to greet the account: the contact person if known, else
    /// the account name.
    pub fn display_name(&self) -> &str {
        self.contact_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.name.as_str())
    }

    pub fn is_trial(&self) -> bool {
        self.status == AccountStatus::Trial.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(contact: Option<&str>) -> Account {
        Account {
            id: "ph-1".to_string(),
            name: "Pharmacie du Port".to_string(),
            contact_name: contact.map(str::to_string),
            email: "port@example.sn".to_string(),
            plan: "Starter".to_string(),
            status: "trial".to_string(),
            trial_end: Utc::now(),
        }
    }

    #[test]
    fn display_name_prefers_contact() {
        assert_eq!(account(Some("Awa Diop")).display_name(), "Awa Diop");
    }

    #[test]
    fn display_name_falls_back_to_name() {
        assert_eq!(account(None).display_name(), "Pharmacie du Port");
        assert_eq!(account(Some("   ")).display_name(), "Pharmacie du Port");
    }

    #[test]
    fn status_strings() {
        assert_eq!(AccountStatus::Trial.as_str(), "trial");
        assert_eq!(AccountStatus::Expired.to_string(), "expired");
        assert!(account(None).is_trial());
    }
}
