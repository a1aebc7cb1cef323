use anyhow::Context;
use clap::Parser;

use singil_cli::args::Cli;
use singil_core::UuidIdGenerator;
use singil_infra::{Config, LedgerSession};
use singil_ledger::LedgerEngine;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_lookup(|key| {
        cli.override_for(key)
            .or_else(|| std::env::var(key).ok())
    })
    .context("invalid configuration")?;

    singil_observability::init(config.log_format);
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        slot = %config.slot,
        store = ?config.store,
        "resolved configuration"
    );

    let mut session = LedgerSession::open(config.open_store(), LedgerEngine::new(UuidIdGenerator))
        .with_context(|| format!("failed to open ledger `{}`", config.slot))?;

    let today = chrono::Local::now().date_naive();
    let mut out = std::io::stdout().lock();
    let result = singil_cli::commands::execute(&mut session, cli.command, today, &mut out);

    let saved = if session.is_dirty() { session.flush() } else { Ok(()) };
    singil_cli::commands::conclude(result, saved)
}
