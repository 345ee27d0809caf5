use std::sync::Arc;

use alloy_primitives::{Address, U256};
use atm_contract::{AtmContract, ContractError};
use shared::{domain::TransactionRecord, operation::AtmOperation};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use wallet_bridge::{BridgeError, HttpBridge, WalletBridge};

pub mod config;

use config::Settings;

pub const INSTALL_PROMPT: &str = "Please install a wallet bridge in order to use this ATM.";
pub const CONNECT_PROMPT: &str = "Please connect your wallet.";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no wallet bridge has been detected")]
    BridgeMissing,
    #[error("no account is connected")]
    NotConnected,
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// Broadcast to UI consumers on every state change; the session itself never
/// waits for anyone to listen.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    BridgeDetected { present: bool },
    AccountConnected { account: Address },
    BalanceUpdated { balance: U256 },
    HistoryUpdated { entries: Vec<TransactionRecord> },
    BusyChanged { busy: bool },
    StatusChanged { status: String },
}

/// Point-in-time copy of everything a UI needs to paint the page.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub bridge_present: bool,
    pub account: Option<Address>,
    pub balance: Option<U256>,
    pub history: Vec<TransactionRecord>,
    pub busy: bool,
    pub status: String,
}

struct SessionState {
    bridge: Option<Arc<dyn WalletBridge>>,
    account: Option<Address>,
    contract: Option<AtmContract>,
    balance: Option<U256>,
    history: Vec<TransactionRecord>,
    busy: bool,
    status: String,
}

/// The wallet-session controller. Owns the whole Disconnected to Connected to
/// ContractBound progression plus the displayed view state; every remote
/// interaction in the app funnels through here.
///
/// Balance and history are read-through views: they hold whatever the remote
/// side last answered, nothing is ever computed locally and nothing is
/// written optimistically.
pub struct WalletSession {
    settings: Settings,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl WalletSession {
    pub fn new(settings: Settings) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            settings,
            inner: Mutex::new(SessionState {
                bridge: None,
                account: None,
                contract: None,
                balance: None,
                history: Vec::new(),
                busy: false,
                status: String::new(),
            }),
            events,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        SessionSnapshot {
            bridge_present: guard.bridge.is_some(),
            account: guard.account,
            balance: guard.balance,
            history: guard.history.clone(),
            busy: guard.busy,
            status: guard.status.clone(),
        }
    }

    /// Desktop analog of probing for the injected provider object: a
    /// configured endpoint counts as an installed bridge, anything else is
    /// the bridge-absent state with its install prompt. No network traffic
    /// happens here.
    pub async fn detect_bridge(&self) -> bool {
        let bridge = self
            .settings
            .bridge_url
            .clone()
            .map(|endpoint| Arc::new(HttpBridge::new(endpoint)) as Arc<dyn WalletBridge>);
        let present = bridge.is_some();

        let mut guard = self.inner.lock().await;
        guard.bridge = bridge;
        if present {
            debug!("wallet bridge configured");
        } else {
            info!("no wallet bridge configured; prompting install");
            self.set_status(&mut guard, INSTALL_PROMPT);
        }
        drop(guard);
        self.emit(SessionEvent::BridgeDetected { present });
        present
    }

    /// Silent resume: asks the bridge for accounts it already authorized,
    /// without prompting the user. An empty answer leaves the session signed
    /// out and is not an error.
    pub async fn restore_accounts(&self) -> Result<(), SessionError> {
        let bridge = self.bridge().await?;
        let accounts = bridge.accounts().await?;
        match accounts.first().copied() {
            Some(account) => self.adopt_account(bridge, account).await,
            None => {
                debug!("no previously authorized accounts");
                Ok(())
            }
        }
    }

    /// Interactive authorization. Zero granted accounts, or the user
    /// declining the wallet prompt, leaves the session signed out with the
    /// connect prompt; neither is an error.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let bridge = self.bridge().await?;
        let accounts = match bridge.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) if err.is_user_rejection() => {
                info!("user declined the connect prompt");
                let mut guard = self.inner.lock().await;
                self.set_status(&mut guard, CONNECT_PROMPT);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        match accounts.first().copied() {
            Some(account) => self.adopt_account(bridge, account).await,
            None => {
                info!("bridge granted no accounts");
                let mut guard = self.inner.lock().await;
                self.set_status(&mut guard, CONNECT_PROMPT);
                Ok(())
            }
        }
    }

    /// Re-reads the remote balance and replaces the view wholesale. Racing
    /// refreshes are not coordinated; whichever response lands last wins.
    pub async fn refresh_balance(&self) -> Result<U256, SessionError> {
        let contract = self.contract().await?;
        let balance = contract.balance().await?;
        let mut guard = self.inner.lock().await;
        guard.balance = Some(balance);
        drop(guard);
        self.emit(SessionEvent::BalanceUpdated { balance });
        Ok(balance)
    }

    pub async fn refresh_history(&self) -> Result<(), SessionError> {
        let contract = self.contract().await?;
        let entries = contract.transaction_history().await?;
        let mut guard = self.inner.lock().await;
        guard.history = entries.clone();
        drop(guard);
        self.emit(SessionEvent::HistoryUpdated { entries });
        Ok(())
    }

    /// Runs one state-changing operation end to end: busy flag and progress
    /// line up, transaction through the bridge, receipt awaited, then on
    /// success exactly one balance read and one history read. Any failure
    /// along the way collapses into the operation's fixed failure line; the
    /// views are left untouched and nothing is retried. The busy flag is
    /// cleared in every outcome.
    ///
    /// A handled operation failure still returns `Ok`; `Err` here means the
    /// session was not in a state to try at all.
    pub async fn submit(&self, operation: AtmOperation) -> Result<(), SessionError> {
        let contract = self.contract().await?;
        {
            let mut guard = self.inner.lock().await;
            self.set_busy(&mut guard, true);
            self.set_status(&mut guard, operation.in_progress_message());
        }

        match contract.submit(operation).await {
            Ok(hash) => {
                info!(operation = operation.name(), %hash, "operation confirmed");
                {
                    let mut guard = self.inner.lock().await;
                    self.set_status(&mut guard, operation.success_message());
                }
                if let Err(err) = self.refresh_balance().await {
                    warn!(error = %err, "balance refresh after success failed");
                }
                if let Err(err) = self.refresh_history().await {
                    warn!(error = %err, "history refresh after success failed");
                }
            }
            Err(err) => {
                if err.is_user_rejection() {
                    info!(operation = operation.name(), "user declined signing");
                } else {
                    warn!(operation = operation.name(), error = %err, "operation failed");
                }
                let mut guard = self.inner.lock().await;
                self.set_status(&mut guard, operation.failure_message());
            }
        }

        let mut guard = self.inner.lock().await;
        self.set_busy(&mut guard, false);
        Ok(())
    }

    async fn adopt_account(
        &self,
        bridge: Arc<dyn WalletBridge>,
        account: Address,
    ) -> Result<(), SessionError> {
        info!(%account, "account connected");
        let contract = AtmContract::bind(bridge, account, self.settings.contract_options());
        {
            let mut guard = self.inner.lock().await;
            guard.account = Some(account);
            guard.contract = Some(contract);
        }
        self.emit(SessionEvent::AccountConnected { account });
        // First paint of both views as soon as the contract is reachable.
        self.refresh_balance().await?;
        self.refresh_history().await?;
        Ok(())
    }

    async fn bridge(&self) -> Result<Arc<dyn WalletBridge>, SessionError> {
        let guard = self.inner.lock().await;
        guard.bridge.clone().ok_or(SessionError::BridgeMissing)
    }

    async fn contract(&self) -> Result<AtmContract, SessionError> {
        let guard = self.inner.lock().await;
        guard.contract.clone().ok_or(SessionError::NotConnected)
    }

    fn set_status(&self, guard: &mut SessionState, status: impl Into<String>) {
        let status = status.into();
        guard.status = status.clone();
        self.emit(SessionEvent::StatusChanged { status });
    }

    fn set_busy(&self, guard: &mut SessionState, busy: bool) {
        guard.busy = busy;
        self.emit(SessionEvent::BusyChanged { busy });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
