//! Events flowing from the backend worker to the UI thread.

use alloy_primitives::{Address, U256};
use shared::domain::TransactionRecord;

pub enum UiEvent {
    Info(String),
    BridgeDetected { present: bool },
    AccountConnected { account: Address },
    BalanceUpdated { balance: U256 },
    HistoryUpdated { entries: Vec<TransactionRecord> },
    BusyChanged { busy: bool },
    StatusChanged { status: String },
    WorkerFailed { reason: String },
}
