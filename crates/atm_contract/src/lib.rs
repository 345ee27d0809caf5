use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use shared::{domain::TransactionRecord, operation::AtmOperation};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use wallet_bridge::{BridgeError, CallRequest, TransactionRequest, WalletBridge};

pub mod abi;

use abi::{
    decreaseBalanceCall, depositCall, getBalanceCall, getTransactionHistoryCall,
    increaseBalanceCall, transferOwnershipCall, withdrawCall,
};

#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("could not decode {call} return data: {source}")]
    Decode {
        call: &'static str,
        #[source]
        source: alloy_sol_types::Error,
    },
    #[error("transaction {hash} was mined but reverted")]
    Reverted { hash: B256 },
}

impl ContractError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ContractError::Bridge(bridge) if bridge.is_user_rejection())
    }
}

/// How a contract handle is bound; comes straight out of the session
/// settings.
#[derive(Debug, Clone)]
pub struct ContractOptions {
    pub address: Address,
    pub receipt_poll_interval: Duration,
    /// Wei-denominated deployments take the deposit amount as native value on
    /// the payable entry point; unit-denominated ones take it as a plain
    /// argument.
    pub attach_deposit_value: bool,
}

/// Typed handle over the deployed ATM contract, bound to one caller account.
/// The handle keeps no chain state of its own; every read goes back to the
/// bridge.
#[derive(Clone)]
pub struct AtmContract {
    bridge: Arc<dyn WalletBridge>,
    address: Address,
    account: Address,
    receipt_poll_interval: Duration,
    attach_deposit_value: bool,
}

impl AtmContract {
    /// Pure construction; no network traffic until the first call.
    pub fn bind(bridge: Arc<dyn WalletBridge>, account: Address, options: ContractOptions) -> Self {
        Self {
            bridge,
            address: options.address,
            account,
            receipt_poll_interval: options.receipt_poll_interval,
            attach_deposit_value: options.attach_deposit_value,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub async fn balance(&self) -> Result<U256, ContractError> {
        let raw = self
            .bridge
            .call(self.read_request(getBalanceCall {}.abi_encode()))
            .await?;
        getBalanceCall::abi_decode_returns(&raw).map_err(|source| ContractError::Decode {
            call: "getBalance",
            source,
        })
    }

    /// History rows exactly as the contract reported them; order is
    /// preserved, nothing is merged or re-sorted locally.
    pub async fn transaction_history(&self) -> Result<Vec<TransactionRecord>, ContractError> {
        let raw = self
            .bridge
            .call(self.read_request(getTransactionHistoryCall {}.abi_encode()))
            .await?;
        let entries = getTransactionHistoryCall::abi_decode_returns(&raw).map_err(|source| {
            ContractError::Decode {
                call: "getTransactionHistory",
                source,
            }
        })?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                TransactionRecord::from_parts(
                    entry.isDeposit,
                    entry.amount,
                    entry.timestamp.saturating_to::<u64>(),
                )
            })
            .collect())
    }

    /// Sends the state-changing call through the bridge and waits until the
    /// remote system confirms it. There is no timeout and no retry: the call
    /// runs to a mined receipt or an error, exactly once.
    pub async fn submit(&self, operation: AtmOperation) -> Result<B256, ContractError> {
        let (data, value) = self.encode_operation(&operation);
        let hash = self
            .bridge
            .send_transaction(TransactionRequest {
                from: self.account,
                to: self.address,
                value,
                data: data.into(),
            })
            .await?;
        info!(operation = operation.name(), %hash, "transaction submitted");
        self.wait_for_confirmation(hash).await?;
        Ok(hash)
    }

    fn read_request(&self, data: Vec<u8>) -> CallRequest {
        CallRequest {
            from: Some(self.account),
            to: self.address,
            data: data.into(),
        }
    }

    fn encode_operation(&self, operation: &AtmOperation) -> (Vec<u8>, Option<U256>) {
        match *operation {
            AtmOperation::Deposit { amount } => {
                let value = self.attach_deposit_value.then_some(amount);
                (depositCall { amount }.abi_encode(), value)
            }
            AtmOperation::Withdraw { amount } => (withdrawCall { amount }.abi_encode(), None),
            AtmOperation::TransferOwnership { new_owner } => (
                transferOwnershipCall {
                    newOwner: new_owner,
                }
                .abi_encode(),
                None,
            ),
            AtmOperation::IncreaseBalance { amount } => {
                (increaseBalanceCall { amount }.abi_encode(), None)
            }
            AtmOperation::DecreaseBalance { amount } => {
                (decreaseBalanceCall { amount }.abi_encode(), None)
            }
        }
    }

    async fn wait_for_confirmation(&self, hash: B256) -> Result<(), ContractError> {
        let mut polls = 0u32;
        loop {
            match self.bridge.transaction_receipt(hash).await? {
                Some(receipt) if receipt.succeeded() => {
                    debug!(%hash, polls, block = ?receipt.block_number, "transaction confirmed");
                    return Ok(());
                }
                Some(_) => {
                    warn!(%hash, polls, "transaction reverted");
                    return Err(ContractError::Reverted { hash });
                }
                None => {
                    polls += 1;
                    sleep(self.receipt_poll_interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
