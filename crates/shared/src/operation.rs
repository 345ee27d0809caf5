use alloy_primitives::{Address, U256};

/// The five state-changing calls the ATM exposes. Each carries its already
/// parsed parameter plus the fixed status line shown for every phase of the
/// submission; callers never compose status text themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmOperation {
    Deposit { amount: U256 },
    Withdraw { amount: U256 },
    TransferOwnership { new_owner: Address },
    IncreaseBalance { amount: U256 },
    DecreaseBalance { amount: U256 },
}

impl AtmOperation {
    pub fn name(&self) -> &'static str {
        match self {
            AtmOperation::Deposit { .. } => "deposit",
            AtmOperation::Withdraw { .. } => "withdraw",
            AtmOperation::TransferOwnership { .. } => "transfer_ownership",
            AtmOperation::IncreaseBalance { .. } => "increase_balance",
            AtmOperation::DecreaseBalance { .. } => "decrease_balance",
        }
    }

    pub fn in_progress_message(&self) -> &'static str {
        match self {
            AtmOperation::Deposit { .. } => "Depositing...",
            AtmOperation::Withdraw { .. } => "Withdrawing...",
            AtmOperation::TransferOwnership { .. } => "Transferring ownership...",
            AtmOperation::IncreaseBalance { .. } => "Increasing balance...",
            AtmOperation::DecreaseBalance { .. } => "Decreasing balance...",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            AtmOperation::Deposit { .. } => "Deposit successful!",
            AtmOperation::Withdraw { .. } => "Withdrawal successful!",
            AtmOperation::TransferOwnership { .. } => "Ownership transferred successfully!",
            AtmOperation::IncreaseBalance { .. } => "Balance increased successfully!",
            AtmOperation::DecreaseBalance { .. } => "Balance decreased successfully!",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            AtmOperation::Deposit { .. } => "Deposit failed.",
            AtmOperation::Withdraw { .. } => "Withdrawal failed.",
            AtmOperation::TransferOwnership { .. } => "Ownership transfer failed.",
            AtmOperation::IncreaseBalance { .. } => "Balance increase failed.",
            AtmOperation::DecreaseBalance { .. } => "Balance decrease failed.",
        }
    }
}
