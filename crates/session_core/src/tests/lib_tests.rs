use super::*;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex as StdMutex,
    },
    time::Duration,
};

use alloy_primitives::{hex, B256};
use alloy_sol_types::{SolCall, SolValue};
use anyhow::Result;
use atm_contract::abi::{getBalanceCall, getTransactionHistoryCall, HistoryEntry};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use shared::domain::EntryKind;
use tokio::{net::TcpListener, time::sleep};
use url::Url;
use wallet_bridge::{methods, USER_REJECTED_REQUEST};

const TEST_ACCOUNT: Address = Address::repeat_byte(0x42);

/// Miniature ATM chain behind a JSON-RPC endpoint: fixed account list, one
/// balance cell, a history log, and knobs for the failure modes the session
/// has to survive.
#[derive(Default)]
struct FakeAtm {
    accounts: StdMutex<Vec<Address>>,
    balance: StdMutex<U256>,
    /// Applied to the balance when the next transaction is accepted.
    next_balance: StdMutex<Option<U256>>,
    history: StdMutex<Vec<(bool, u64, u64)>>,
    reject_account_requests: AtomicBool,
    reject_sends_with: StdMutex<Option<i64>>,
    hold_receipts: AtomicBool,
    revert_receipts: AtomicBool,
    counts: StdMutex<HashMap<String, u32>>,
    balance_reads: StdMutex<u32>,
    history_reads: StdMutex<u32>,
}

impl FakeAtm {
    fn with_accounts(accounts: Vec<Address>) -> Arc<Self> {
        let fake = FakeAtm::default();
        *fake.accounts.lock().unwrap() = accounts;
        Arc::new(fake)
    }

    fn set_balance(&self, value: u64) {
        *self.balance.lock().unwrap() = U256::from(value);
    }

    fn count(&self, method: &str) -> u32 {
        self.counts
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    fn balance_reads(&self) -> u32 {
        *self.balance_reads.lock().unwrap()
    }

    fn history_reads(&self) -> u32 {
        *self.history_reads.lock().unwrap()
    }

    fn handle_call(&self, data: &str) -> Value {
        if data.starts_with(&hex::encode_prefixed(getBalanceCall::SELECTOR)) {
            *self.balance_reads.lock().unwrap() += 1;
            let balance = *self.balance.lock().unwrap();
            json!(hex::encode_prefixed(balance.abi_encode()))
        } else if data.starts_with(&hex::encode_prefixed(getTransactionHistoryCall::SELECTOR)) {
            *self.history_reads.lock().unwrap() += 1;
            let entries: Vec<HistoryEntry> = self
                .history
                .lock()
                .unwrap()
                .iter()
                .map(|(is_deposit, amount, epoch)| HistoryEntry {
                    isDeposit: *is_deposit,
                    amount: U256::from(*amount),
                    timestamp: U256::from(*epoch),
                })
                .collect();
            json!(hex::encode_prefixed(entries.abi_encode()))
        } else {
            Value::Null
        }
    }
}

fn rpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

async fn handle_rpc(State(state): State<Arc<FakeAtm>>, Json(body): Json<Value>) -> Json<Value> {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    *state
        .counts
        .lock()
        .unwrap()
        .entry(method.clone())
        .or_insert(0) += 1;
    let id = body["id"].clone();

    let result = match method.as_str() {
        methods::ACCOUNTS => json!(state.accounts.lock().unwrap().clone()),
        methods::REQUEST_ACCOUNTS => {
            if state.reject_account_requests.load(Ordering::SeqCst) {
                return Json(rpc_error(
                    id,
                    USER_REJECTED_REQUEST,
                    "User rejected the request.",
                ));
            }
            json!(state.accounts.lock().unwrap().clone())
        }
        methods::CALL => {
            let data = body["params"][0]["data"].as_str().unwrap_or_default();
            state.handle_call(data)
        }
        methods::SEND_TRANSACTION => {
            if let Some(code) = *state.reject_sends_with.lock().unwrap() {
                return Json(rpc_error(id, code, "User rejected the request."));
            }
            if let Some(next) = state.next_balance.lock().unwrap().take() {
                *state.balance.lock().unwrap() = next;
            }
            json!(B256::repeat_byte(0x99))
        }
        methods::TRANSACTION_RECEIPT => {
            if state.hold_receipts.load(Ordering::SeqCst) {
                Value::Null
            } else {
                let status = if state.revert_receipts.load(Ordering::SeqCst) {
                    "0x0"
                } else {
                    "0x1"
                };
                json!({ "transactionHash": body["params"][0], "status": status })
            }
        }
        _ => Value::Null,
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn spawn_fake_atm(state: Arc<FakeAtm>) -> Result<Url> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/", post(handle_rpc)).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Url::parse(&format!("http://{addr}/"))?)
}

/// Detected session pointed at the fake, polling fast enough for tests.
async fn session_with(fake: Arc<FakeAtm>) -> Result<Arc<WalletSession>> {
    let endpoint = spawn_fake_atm(fake).await?;
    let settings = Settings {
        bridge_url: Some(endpoint),
        receipt_poll_ms: 5,
        ..Settings::default()
    };
    let session = WalletSession::new(settings);
    assert!(session.detect_bridge().await);
    Ok(session)
}

#[tokio::test]
async fn install_prompt_when_no_bridge_is_configured() {
    let session = WalletSession::new(Settings::default());
    assert!(!session.detect_bridge().await);

    let snapshot = session.snapshot().await;
    assert!(!snapshot.bridge_present);
    assert_eq!(snapshot.status, INSTALL_PROMPT);

    // Nothing to talk to, so connecting cannot even be attempted.
    assert!(matches!(
        session.connect().await,
        Err(SessionError::BridgeMissing)
    ));
}

#[tokio::test]
async fn connect_prompt_when_the_bridge_grants_no_accounts() -> Result<()> {
    let fake = FakeAtm::with_accounts(Vec::new());
    let session = session_with(fake.clone()).await?;

    session.connect().await?;

    let snapshot = session.snapshot().await;
    assert!(snapshot.account.is_none());
    assert_eq!(snapshot.status, CONNECT_PROMPT);
    assert_eq!(fake.count(methods::REQUEST_ACCOUNTS), 1);
    assert_eq!(fake.balance_reads(), 0);
    Ok(())
}

#[tokio::test]
async fn declined_connect_prompt_reads_the_same_as_no_accounts() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    fake.reject_account_requests.store(true, Ordering::SeqCst);
    let session = session_with(fake.clone()).await?;

    session.connect().await?;

    let snapshot = session.snapshot().await;
    assert!(snapshot.account.is_none());
    assert_eq!(snapshot.status, CONNECT_PROMPT);
    assert_eq!(fake.balance_reads(), 0);
    Ok(())
}

#[tokio::test]
async fn connect_adopts_the_first_account_and_loads_both_views() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT, Address::repeat_byte(0x43)]);
    fake.set_balance(100);
    fake.history.lock().unwrap().push((true, 100, 1_700_000_000));
    let session = session_with(fake.clone()).await?;

    session.connect().await?;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.account, Some(TEST_ACCOUNT));
    assert_eq!(snapshot.balance, Some(U256::from(100u64)));
    assert_eq!(snapshot.history.len(), 1);
    assert!(snapshot.status.is_empty());
    assert_eq!(fake.balance_reads(), 1);
    assert_eq!(fake.history_reads(), 1);
    Ok(())
}

#[tokio::test]
async fn restore_resumes_a_previously_authorized_account() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    fake.set_balance(25);
    let session = session_with(fake.clone()).await?;

    session.restore_accounts().await?;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.account, Some(TEST_ACCOUNT));
    assert_eq!(snapshot.balance, Some(U256::from(25u64)));
    // Silent resume never raises the interactive prompt.
    assert_eq!(fake.count(methods::ACCOUNTS), 1);
    assert_eq!(fake.count(methods::REQUEST_ACCOUNTS), 0);
    Ok(())
}

#[tokio::test]
async fn deposit_success_rereads_the_balance_exactly_once() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    fake.set_balance(100);
    let session = session_with(fake.clone()).await?;
    session.connect().await?;
    assert_eq!(fake.balance_reads(), 1);

    *fake.next_balance.lock().unwrap() = Some(U256::from(150u64));
    session
        .submit(AtmOperation::Deposit {
            amount: U256::from(50u64),
        })
        .await?;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, "Deposit successful!");
    assert_eq!(snapshot.balance, Some(U256::from(150u64)));
    assert!(!snapshot.busy);
    assert_eq!(fake.balance_reads(), 2);
    assert_eq!(fake.history_reads(), 2);
    Ok(())
}

#[tokio::test]
async fn busy_is_raised_while_the_receipt_is_pending() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    let session = session_with(fake.clone()).await?;
    session.connect().await?;

    fake.hold_receipts.store(true, Ordering::SeqCst);
    let submitting = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .submit(AtmOperation::Deposit {
                    amount: U256::from(1u64),
                })
                .await
        })
    };

    let mut saw_busy = false;
    for _ in 0..200 {
        let snapshot = session.snapshot().await;
        if snapshot.busy {
            assert_eq!(snapshot.status, "Depositing...");
            saw_busy = true;
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert!(saw_busy, "submission never reported busy");

    fake.hold_receipts.store(false, Ordering::SeqCst);
    submitting.await??;

    let snapshot = session.snapshot().await;
    assert!(!snapshot.busy);
    assert_eq!(snapshot.status, "Deposit successful!");
    Ok(())
}

#[tokio::test]
async fn history_preserves_remote_order() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    {
        let mut history = fake.history.lock().unwrap();
        // Deliberately newest-first so any local re-sorting would show up.
        history.push((false, 5, 1_700_000_100));
        history.push((true, 3, 1_700_000_000));
    }
    let session = session_with(fake.clone()).await?;
    session.connect().await?;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.history[0].kind, EntryKind::Withdrawal);
    assert_eq!(snapshot.history[0].amount, U256::from(5u64));
    assert_eq!(snapshot.history[1].kind, EntryKind::Deposit);
    assert_eq!(snapshot.history[1].timestamp.timestamp(), 1_700_000_000);
    for record in &snapshot.history {
        assert_eq!(record.local_display().len(), 19);
    }
    Ok(())
}

#[tokio::test]
async fn rejected_withdrawal_keeps_the_displayed_balance() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    fake.set_balance(100);
    let session = session_with(fake.clone()).await?;
    session.connect().await?;

    *fake.reject_sends_with.lock().unwrap() = Some(USER_REJECTED_REQUEST);
    session
        .submit(AtmOperation::Withdraw {
            amount: U256::from(10u64),
        })
        .await?;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, "Withdrawal failed.");
    assert_eq!(snapshot.balance, Some(U256::from(100u64)));
    assert!(!snapshot.busy);
    // No refresh happens on failure, and no receipt was ever polled.
    assert_eq!(fake.balance_reads(), 1);
    assert_eq!(fake.count(methods::TRANSACTION_RECEIPT), 0);
    Ok(())
}

#[tokio::test]
async fn reverted_operation_shows_its_failure_line() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    fake.revert_receipts.store(true, Ordering::SeqCst);
    let session = session_with(fake.clone()).await?;
    session.connect().await?;

    session
        .submit(AtmOperation::IncreaseBalance {
            amount: U256::from(1u64),
        })
        .await?;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, "Balance increase failed.");
    assert!(!snapshot.busy);
    assert_eq!(fake.balance_reads(), 1);
    Ok(())
}

#[tokio::test]
async fn submit_emits_the_full_event_sequence() -> Result<()> {
    let fake = FakeAtm::with_accounts(vec![TEST_ACCOUNT]);
    let session = session_with(fake.clone()).await?;
    session.connect().await?;

    let mut events = session.subscribe_events();
    *fake.next_balance.lock().unwrap() = Some(U256::from(10u64));
    session
        .submit(AtmOperation::Deposit {
            amount: U256::from(10u64),
        })
        .await?;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(
        seen.first(),
        Some(SessionEvent::BusyChanged { busy: true })
    ));
    assert!(seen.iter().any(
        |event| matches!(event, SessionEvent::StatusChanged { status } if status == "Depositing...")
    ));
    assert!(seen.iter().any(|event| matches!(
        event,
        SessionEvent::StatusChanged { status } if status == "Deposit successful!"
    )));
    assert!(seen.iter().any(|event| matches!(
        event,
        SessionEvent::BalanceUpdated { balance } if *balance == U256::from(10u64)
    )));
    assert!(seen
        .iter()
        .any(|event| matches!(event, SessionEvent::HistoryUpdated { .. })));
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::BusyChanged { busy: false })
    ));
    Ok(())
}
