//! Allowlist policy — sender validation.
//!
//! Decides which chat users may reach the agent. The list is built once at
//! startup from configuration and never mutated afterwards.

use std::collections::BTreeSet;

use clawbridge_config::TelegramConfig;

/// Result of checking a sender against the allowlist.
#[derive(Debug, Clone, PartialEq)]
pub enum SenderCheckResult {
    /// Sender is allowed
    Allowed,
    /// Sender is denied
    Denied { sender_id: i64, reason: String },
}

impl SenderCheckResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Immutable set of authorized user IDs.
///
/// Rules:
/// - If the set is empty → deny all (secure by default)
/// - Otherwise, the sender must be in the set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    users: BTreeSet<i64>,
}

impl AllowList {
    pub fn new(users: impl IntoIterator<Item = i64>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    /// Build the allowlist from the Telegram section of the config.
    pub fn from_config(config: &TelegramConfig) -> Self {
        let list = Self::new(config.allowed_users.iter().copied());
        if list.is_empty() {
            tracing::warn!("Allowed user list is empty, all users will be denied");
        }
        list
    }

    /// Check if a sender may use the relay.
    pub fn check_sender(&self, sender_id: i64) -> SenderCheckResult {
        if self.users.is_empty() {
            return SenderCheckResult::Denied {
                sender_id,
                reason: "No users configured (deny by default)".into(),
            };
        }

        if self.users.contains(&sender_id) {
            SenderCheckResult::Allowed
        } else {
            SenderCheckResult::Denied {
                sender_id,
                reason: format!(
                    "Sender {} not in allowlist ({} users configured)",
                    sender_id,
                    self.users.len()
                ),
            }
        }
    }

    pub fn is_allowed(&self, sender_id: i64) -> bool {
        self.check_sender(sender_id).is_allowed()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Authorized IDs in ascending order.
    pub fn users(&self) -> impl Iterator<Item = i64> + '_ {
        self.users.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_denies_all() {
        let list = AllowList::default();
        let result = list.check_sender(123);
        assert_eq!(
            result,
            SenderCheckResult::Denied {
                sender_id: 123,
                reason: "No users configured (deny by default)".into(),
            }
        );
        assert!(!list.is_allowed(0));
        assert!(!list.is_allowed(-1));
    }

    #[test]
    fn specific_user_allowed() {
        let list = AllowList::new([123, 456]);
        assert_eq!(list.check_sender(123), SenderCheckResult::Allowed);
        assert!(list.is_allowed(456));
    }

    #[test]
    fn unknown_user_denied() {
        let list = AllowList::new([123]);
        match list.check_sender(999) {
            SenderCheckResult::Denied { sender_id, reason } => {
                assert_eq!(sender_id, 999);
                assert!(reason.contains("not in allowlist"));
            }
            _ => panic!("Expected denied"),
        }
    }

    #[test]
    fn built_from_config() {
        let config = TelegramConfig {
            bot_token: None,
            allowed_users: vec![7, 7, 8],
        };
        let list = AllowList::from_config(&config);
        assert_eq!(list.len(), 2);
        assert_eq!(list.users().collect::<Vec<_>>(), vec![7, 8]);
    }
}
