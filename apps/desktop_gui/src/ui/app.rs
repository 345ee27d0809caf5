use alloy_primitives::{Address, U256};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use session_core::{config::Settings, CONNECT_PROMPT, INSTALL_PROMPT};
use shared::{domain::TransactionRecord, operation::AtmOperation, units::AmountUnit};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::controller::orchestration::dispatch_backend_command;

/// Single-page ATM front end. All remote work happens on the backend worker;
/// this struct only mirrors the session state it is told about and queues
/// commands back.
pub struct AtmApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    amount_unit: AmountUnit,
    /// `None` until the worker answers the initial detection probe.
    bridge_present: Option<bool>,
    account: Option<Address>,
    balance: Option<U256>,
    history: Vec<TransactionRecord>,
    busy: bool,
    status: String,
    amount_input: String,
    new_owner_input: String,
}

impl AtmApp {
    pub fn new(
        settings: Settings,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            amount_unit: settings.amount_unit,
            bridge_present: None,
            account: None,
            balance: None,
            history: Vec::new(),
            busy: false,
            status: String::new(),
            amount_input: String::new(),
            new_owner_input: String::new(),
        };
        dispatch_backend_command(&app.cmd_tx, BackendCommand::DetectBridge, &mut app.status);
        app
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => tracing::debug!(%message, "worker note"),
                UiEvent::BridgeDetected { present } => self.bridge_present = Some(present),
                UiEvent::AccountConnected { account } => self.account = Some(account),
                UiEvent::BalanceUpdated { balance } => self.balance = Some(balance),
                UiEvent::HistoryUpdated { entries } => self.history = entries,
                UiEvent::BusyChanged { busy } => self.busy = busy,
                UiEvent::StatusChanged { status } => self.status = status,
                UiEvent::WorkerFailed { reason } => {
                    self.status = format!("Backend worker failed: {reason}");
                }
            }
        }
    }

    fn show_page(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Welcome to the ATM!");
        });
        ui.add_space(8.0);

        match self.bridge_present {
            None => {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label("Looking for a wallet bridge...");
                });
            }
            Some(false) => {
                ui.label(INSTALL_PROMPT);
            }
            Some(true) => match self.account {
                None => self.show_connect(ui),
                Some(account) => self.show_atm(ui, account),
            },
        }
    }

    fn show_connect(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            if ui.button(CONNECT_PROMPT).clicked() {
                dispatch_backend_command(&self.cmd_tx, BackendCommand::Connect, &mut self.status);
            }
        });
        if !self.status.is_empty() {
            ui.add_space(8.0);
            ui.vertical_centered(|ui| {
                ui.label(self.status.clone());
            });
        }
    }

    fn show_atm(&mut self, ui: &mut egui::Ui, account: Address) {
        let unit = self.amount_unit;

        ui.label(format!("Your Account: {account}"));
        ui.label(balance_line(unit, self.balance));
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Amount:");
            ui.add(
                egui::TextEdit::singleline(&mut self.amount_input)
                    .hint_text(match unit {
                        AmountUnit::Units => "e.g. 10",
                        AmountUnit::Ether => "e.g. 1.5",
                    })
                    .desired_width(120.0),
            );
        });
        ui.horizontal(|ui| {
            ui.label("New owner:");
            ui.add(
                egui::TextEdit::singleline(&mut self.new_owner_input)
                    .hint_text("0x...")
                    .desired_width(320.0),
            );
        });
        ui.add_space(8.0);

        // One in-flight submission at a time; the busy flag is the only guard.
        let busy = self.busy;
        ui.horizontal_wrapped(|ui| {
            if ui.add_enabled(!busy, egui::Button::new("Deposit")).clicked() {
                self.submit_amount_operation(|amount| AtmOperation::Deposit { amount });
            }
            if ui.add_enabled(!busy, egui::Button::new("Withdraw")).clicked() {
                self.submit_amount_operation(|amount| AtmOperation::Withdraw { amount });
            }
            if ui
                .add_enabled(!busy, egui::Button::new("Increase Balance"))
                .clicked()
            {
                self.submit_amount_operation(|amount| AtmOperation::IncreaseBalance { amount });
            }
            if ui
                .add_enabled(!busy, egui::Button::new("Decrease Balance"))
                .clicked()
            {
                self.submit_amount_operation(|amount| AtmOperation::DecreaseBalance { amount });
            }
            if ui
                .add_enabled(!busy, egui::Button::new("Transfer Ownership"))
                .clicked()
            {
                self.submit_transfer_ownership();
            }
        });

        ui.add_space(8.0);
        if busy {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label(self.status.clone());
            });
        } else if !self.status.is_empty() {
            ui.label(self.status.clone());
        }

        ui.add_space(12.0);
        ui.separator();
        ui.heading("Transaction History");
        egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
            if self.history.is_empty() {
                ui.label("No transactions yet.");
            }
            for record in &self.history {
                ui.label(history_line(unit, record));
            }
        });
    }

    fn submit_amount_operation(&mut self, build: fn(U256) -> AtmOperation) {
        match self.amount_unit.parse_amount(&self.amount_input) {
            Ok(amount) => self.queue_operation(build(amount)),
            Err(err) => self.status = err.to_string(),
        }
    }

    fn submit_transfer_ownership(&mut self) {
        match parse_owner_address(&self.new_owner_input) {
            Ok(new_owner) => self.queue_operation(AtmOperation::TransferOwnership { new_owner }),
            Err(message) => self.status = message,
        }
    }

    fn queue_operation(&mut self, operation: AtmOperation) {
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Submit { operation },
            &mut self.status,
        );
    }
}

impl eframe::App for AtmApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_page(ui);
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

fn parse_owner_address(input: &str) -> Result<Address, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Enter the new owner's address first.".to_string());
    }
    trimmed
        .parse()
        .map_err(|_| format!("'{trimmed}' is not a valid address."))
}

fn balance_line(unit: AmountUnit, balance: Option<U256>) -> String {
    match balance {
        Some(value) => format!("Your Balance: {} {}", unit.format_amount(value), unit.label()),
        None => "Your Balance: ...".to_string(),
    }
}

fn history_line(unit: AmountUnit, record: &TransactionRecord) -> String {
    format!(
        "{} | {} {} | {}",
        record.kind.label(),
        unit.format_amount(record.amount),
        unit.label(),
        record.local_display(),
    )
}
