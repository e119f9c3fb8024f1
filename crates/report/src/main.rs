//! finledger-report: balance histories and net-worth timelines from a JSON snapshot.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use finledger_accounting::{DateRange, FlowFilter};
use finledger_core::{AccountId, AgentId, CurrencyId};
use finledger_infra::config::ENV_SNAPSHOT;
use finledger_infra::{ChangeRequest, ReportConfig, ReportService, SnapshotEventSource};

#[derive(Parser)]
#[command(name = "finledger-report")]
#[command(about = "Reconstruct account balances and net worth from recorded events")]
#[command(version)]
struct Cli {
    /// Snapshot document to read
    #[arg(long, short = 's', env = ENV_SNAPSHOT, global = true)]
    snapshot: Option<PathBuf>,

    /// Instant that closes every series (RFC 3339); defaults to the current time
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct Paging {
    /// Zero-based page index
    #[arg(long, allow_negative_numbers = true)]
    page: Option<i64>,

    /// Rows per page
    #[arg(long, allow_negative_numbers = true)]
    page_size: Option<i64>,
}

#[derive(Args, Debug, Default)]
struct Window {
    /// Inclusive lower bound (RFC 3339)
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Exclusive upper bound (RFC 3339)
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Case-insensitive text to look for in names and comments
    #[arg(long)]
    search: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Change list of one account with running balances, newest first
    Ledger {
        account_id: AccountId,
        #[command(flatten)]
        paging: Paging,
        #[command(flatten)]
        window: Window,
    },

    /// Current balance and the latest changes of one account
    Balance {
        account_id: AccountId,
        /// Number of latest changes to include
        #[arg(long, default_value_t = 5)]
        last: usize,
    },

    /// Step plot of one account's balance
    Plot { account_id: AccountId },

    /// Stacked net-worth series of one currency
    NetWorth {
        currency_id: CurrencyId,
        /// Emit typed timeline instead of chart series
        #[arg(long)]
        raw: bool,
    },

    /// Floating debt flows with running totals, newest first
    Debt {
        currency_id: CurrencyId,
        #[arg(long)]
        counterparty: Option<AgentId>,
        #[arg(long)]
        min_amount: Option<u64>,
        #[arg(long)]
        max_amount: Option<u64>,
        #[command(flatten)]
        paging: Paging,
        #[command(flatten)]
        window: Window,
    },

    /// Income and expenses per calendar month
    Monthly {
        currency_id: CurrencyId,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
    },

    /// Number of events that reference an account
    Dependencies { account_id: AccountId },

    /// Known currencies
    Currencies,
}

#[derive(Serialize)]
struct BalanceReport<T> {
    account_id: AccountId,
    balance: i64,
    last: T,
}

#[derive(Serialize)]
struct DependencyReport {
    account_id: AccountId,
    dependencies: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ReportConfig::from_env();
    finledger_observability::init(config.log_format);

    let Some(path) = cli.snapshot.clone().or_else(|| config.snapshot_path.clone()) else {
        bail!("no snapshot given; pass --snapshot or set {ENV_SNAPSHOT}");
    };
    let source = SnapshotEventSource::open(&path)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    let service = ReportService::new(source, config);
    let now = cli.now.unwrap_or_else(Utc::now);

    tracing::debug!(snapshot = %path.display(), %now, "report started");

    match cli.command {
        Command::Ledger {
            account_id,
            paging,
            window,
        } => {
            let request = ChangeRequest {
                page: paging.page,
                page_size: paging.page_size,
                start: window.start,
                end: window.end,
                search: window.search,
            };
            emit(cli.compact, &service.account_changes(account_id, &request)?)
        }
        Command::Balance { account_id, last } => {
            let ledger = service.account_ledger(account_id)?;
            emit(
                cli.compact,
                &BalanceReport {
                    account_id,
                    balance: ledger.current_balance(),
                    last: ledger.last(last),
                },
            )
        }
        Command::Plot { account_id } => emit(cli.compact, &service.account_plot(account_id, now)?),
        Command::NetWorth { currency_id, raw } => {
            if raw {
                emit(cli.compact, &service.net_worth(currency_id, now)?)
            } else {
                emit(cli.compact, &service.net_worth_series(currency_id, now)?)
            }
        }
        Command::Debt {
            currency_id,
            counterparty,
            min_amount,
            max_amount,
            paging,
            window,
        } => {
            let filter = FlowFilter {
                counterparty,
                min_amount,
                max_amount,
                range: DateRange::new(window.start, window.end)?,
                search: window.search,
            };
            emit(
                cli.compact,
                &service.flows(currency_id, &filter, paging.page, paging.page_size)?,
            )
        }
        Command::Monthly {
            currency_id,
            start,
            end,
        } => emit(cli.compact, &service.monthly_totals(currency_id, start, end)?),
        Command::Dependencies { account_id } => emit(
            cli.compact,
            &DependencyReport {
                account_id,
                dependencies: service.dependency_count(account_id)?,
            },
        ),
        Command::Currencies => emit(cli.compact, &service.currencies()?),
    }
}

fn emit<T: Serialize>(compact: bool, value: &T) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if compact {
        serde_json::to_writer(&mut out, value)?;
    } else {
        serde_json::to_writer_pretty(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}
