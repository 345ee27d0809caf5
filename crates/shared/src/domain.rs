use alloy_primitives::U256;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "Deposit",
            EntryKind::Withdrawal => "Withdrawal",
        }
    }
}

/// One row of the remote contract's transaction log. Ordering is whatever the
/// contract reported; the client never re-sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub kind: EntryKind,
    pub amount: U256,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn from_parts(is_deposit: bool, amount: U256, epoch_seconds: u64) -> Self {
        let kind = if is_deposit {
            EntryKind::Deposit
        } else {
            EntryKind::Withdrawal
        };
        let secs = i64::try_from(epoch_seconds).unwrap_or(i64::MAX);
        let timestamp = DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH);
        Self {
            kind,
            amount,
            timestamp,
        }
    }

    /// Timestamp in the viewer's timezone; conversion happens only here, at
    /// render time.
    pub fn local_display(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}
