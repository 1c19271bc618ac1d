// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use settle_rs::logging::{LogFormat, init_logging};
use settle_rs::{
    AccountId, AccountProfile, Config, Engine, LedgerError, NoRewards, RecipientLookup,
    TransactionId, TransactionStatus,
};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::{debug, warn};

/// Ledger replay - apply a CSV of ledger operations
///
/// Reads operations from a CSV file and writes the resulting accounts to stdout.
/// Supports open, credit, debit, transfer and approve.
#[derive(Parser, Debug)]
#[command(name = "settle-rs")]
#[command(about = "Replays ledger operations from a CSV file", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,subject,ref,amount,status,label
    /// Example: cargo run -- operations.csv > accounts.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON config file; built-in defaults when absent
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long, default_value = "pretty")]
    log_format: String,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Disable points and cashback, for exact balances
    #[arg(long)]
    no_rewards: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level, LogFormat::from_str_lossy(&args.log_format));

    let config = match &args.config {
        Some(path) => match Config::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let mut builder = match Engine::builder().config(config.ledger) {
        Ok(builder) => builder,
        Err(e) => {
            eprintln!("Error in config: {}", e);
            process::exit(1);
        }
    };
    if args.no_rewards {
        builder = builder.reward_policy(NoRewards);
    }
    let engine = builder.build();

    if let Err(e) = replay(&engine, BufReader::new(file)) {
        eprintln!("Error processing operations: {}", e);
        process::exit(1);
    }

    if let Err(e) = write_accounts(&engine, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record.
///
/// Fields: `type, subject, ref, amount, status, label`. What `subject` and
/// `ref` hold depends on `type`.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op: String,
    subject: String,
    #[serde(rename = "ref", default)]
    reference: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    label: String,
}

#[derive(Debug)]
enum Operation {
    Open(AccountProfile),
    Credit {
        account: AccountId,
        amount: Decimal,
        label: String,
        status: TransactionStatus,
    },
    Debit {
        account: AccountId,
        amount: Decimal,
        label: String,
    },
    Transfer {
        sender: AccountId,
        receiver: String,
        amount: Decimal,
        remark: Option<String>,
    },
    Approve {
        transaction: TransactionId,
        decision: TransactionStatus,
        reason: Option<String>,
    },
}

fn parse_status(raw: &str) -> Option<TransactionStatus> {
    match raw.to_lowercase().as_str() {
        "pending" => Some(TransactionStatus::Pending),
        "success" => Some(TransactionStatus::Success),
        "failed" => Some(TransactionStatus::Failed),
        _ => None,
    }
}

fn non_empty(raw: String) -> Option<String> {
    (!raw.is_empty()).then_some(raw)
}

impl CsvRecord {
    /// Returns `None` for unknown operations or missing required fields.
    fn into_operation(self) -> Option<Operation> {
        match self.op.to_lowercase().as_str() {
            "open" => Some(Operation::Open(AccountProfile::new(
                non_empty(self.label)?,
                non_empty(self.subject)?,
                non_empty(self.reference)?,
            ))),
            "credit" => Some(Operation::Credit {
                account: AccountId(self.subject.parse().ok()?),
                amount: self.amount?,
                label: non_empty(self.label).unwrap_or_else(|| "Bank transfer".into()),
                status: if self.status.is_empty() {
                    TransactionStatus::Success
                } else {
                    parse_status(&self.status)?
                },
            }),
            "debit" => Some(Operation::Debit {
                account: AccountId(self.subject.parse().ok()?),
                amount: self.amount?,
                label: non_empty(self.label).unwrap_or_else(|| "Payment".into()),
            }),
            "transfer" => Some(Operation::Transfer {
                sender: AccountId(self.subject.parse().ok()?),
                receiver: non_empty(self.reference)?,
                amount: self.amount?,
                remark: non_empty(self.label),
            }),
            "approve" => Some(Operation::Approve {
                transaction: TransactionId(self.subject.parse().ok()?),
                decision: parse_status(&self.status)?,
                reason: non_empty(self.label),
            }),
            _ => None,
        }
    }
}

fn apply(engine: &Engine, op: Operation) -> Result<(), LedgerError> {
    match op {
        Operation::Open(profile) => engine.open_account(profile).map(drop),
        Operation::Credit {
            account,
            amount,
            label,
            status,
        } => engine.credit(account, amount, &label, status, None).map(drop),
        Operation::Debit {
            account,
            amount,
            label,
        } => engine.debit(account, amount, &label, None).map(drop),
        Operation::Transfer {
            sender,
            receiver,
            amount,
            remark,
        } => {
            // A mobile number first, then an account number.
            let by_mobile = RecipientLookup::Mobile(receiver.clone());
            let lookup = if engine.resolve(&by_mobile).is_some() {
                by_mobile
            } else {
                RecipientLookup::AccountNumber(receiver)
            };
            engine.transfer(sender, &lookup, amount, remark).map(drop)
        }
        Operation::Approve {
            transaction,
            decision,
            reason,
        } => engine.approve(transaction, decision, reason).map(drop),
    }
}

/// Applies every operation of a CSV reader to `engine`, streaming.
///
/// Malformed rows and rejected operations are logged and skipped.
///
/// # CSV Format
///
/// Columns: `type, subject, ref, amount, status, label`
/// - `open`: subject = mobile, ref = account number, label = display name
/// - `credit`: subject = account id, status defaults to `Success`, label = source
/// - `debit`: subject = account id, label = payee
/// - `transfer`: subject = sender id, ref = receiver mobile or account number, label = remark
/// - `approve`: subject = transaction id, status = `Success` or `Failed`, label = rejection reason
///
/// # Example
///
/// ```csv
/// type,subject,ref,amount,status,label
/// open,9000000001,ACC1,,,Asha
/// credit,1,,500.00,Pending,HDFC NEFT
/// approve,1,,,Success,
/// ```
///
/// # Errors
///
/// Returns a CSV error only if the reader itself fails.
pub fn replay<R: Read>(engine: &Engine, reader: R) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!(line = line + 2, reason = %e, "skipping malformed row");
                continue;
            }
        };
        let Some(op) = record.into_operation() else {
            warn!(line = line + 2, "skipping invalid operation");
            continue;
        };
        if let Err(e) = apply(engine, op) {
            debug!(line = line + 2, reason = %e, "operation rejected");
        }
    }
    Ok(())
}

/// Writes account snapshots as CSV.
///
/// Columns: `account, name, number, balance, points`
///
/// ```csv
/// account,name,number,balance,points
/// 1,Asha,ACC1,460.00,0
/// ```
pub fn write_accounts<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for account in engine.accounts() {
        wtr.serialize(&*account)?;
    }
    wtr.flush()?;
    Ok(())
}
