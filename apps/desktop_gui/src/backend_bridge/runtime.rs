//! Backend worker: owns the tokio runtime and the wallet session, consumes
//! UI commands and forwards session events back to the UI queue.

use std::thread;

use crossbeam_channel::{Receiver, Sender};
use session_core::{config::Settings, SessionEvent, WalletSession};
use tracing::{error, warn};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;

pub fn spawn_backend_thread(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::WorkerFailed {
                    reason: format!("failed to build runtime: {err}"),
                });
                error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let session = WalletSession::new(settings);

            let mut events = session.subscribe_events();
            let ui_tx_clone = ui_tx.clone();
            tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let event = match event {
                        SessionEvent::BridgeDetected { present } => {
                            UiEvent::BridgeDetected { present }
                        }
                        SessionEvent::AccountConnected { account } => {
                            UiEvent::AccountConnected { account }
                        }
                        SessionEvent::BalanceUpdated { balance } => {
                            UiEvent::BalanceUpdated { balance }
                        }
                        SessionEvent::HistoryUpdated { entries } => {
                            UiEvent::HistoryUpdated { entries }
                        }
                        SessionEvent::BusyChanged { busy } => UiEvent::BusyChanged { busy },
                        SessionEvent::StatusChanged { status } => UiEvent::StatusChanged { status },
                    };
                    let _ = ui_tx_clone.try_send(event);
                }
            });

            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::DetectBridge => {
                        if session.detect_bridge().await {
                            // Resume a previously authorized session without
                            // bothering the user.
                            if let Err(err) = session.restore_accounts().await {
                                warn!(error = %err, "account restore failed");
                            }
                        }
                    }
                    BackendCommand::Connect => {
                        if let Err(err) = session.connect().await {
                            warn!(error = %err, "connect failed");
                            let _ = ui_tx.try_send(UiEvent::StatusChanged {
                                status: "Could not reach the wallet bridge.".to_string(),
                            });
                        }
                    }
                    BackendCommand::Submit { operation } => {
                        if let Err(err) = session.submit(operation).await {
                            warn!(error = %err, operation = operation.name(), "submit refused");
                            let _ = ui_tx.try_send(UiEvent::StatusChanged {
                                status: operation.failure_message().to_string(),
                            });
                        }
                    }
                }
            }
        });
    });
}
