//! `treasury-admin` — the bundled administrative utility. Talks to the
//! core directly against a configured Postgres database; no HTTP
//! transport, per the out-of-scope list.
//!
//! Exit codes follow `0` success, `2` bad arguments, `3` data
//! integrity violation discovered, `4` authorization failure.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use treasury_core::authz::{authorize, Action, AuthzDenial, Target};
use treasury_core::config::CoreConfig;
use treasury_core::domain::fund::codes;
use treasury_core::domain::{Principal, Role};
use treasury_core::ledger::{FundLedger, LedgerSliceQuery, PgFundLedger};
use treasury_core::money::Money;
use treasury_core::{churches::PgChurchStore, providers::PgProviderStore};
use treasury_core::{seeds, CoreError};

#[derive(Parser)]
#[command(name = "treasury-admin")]
#[command(about = "Administrative utility for the church treasury core")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "treasury.toml")]
    config: PathBuf,

    /// Email of the operator running this command, recorded on the
    /// principal the authorization check is evaluated against.
    #[arg(long, default_value = "admin@treasury.local")]
    principal_email: String,

    /// Role of the operator running this command: `admin`,
    /// `national_treasurer`, `fund_director`, `pastor`, `treasurer`,
    /// `church_manager`, or `secretary`.
    #[arg(long, default_value = "admin")]
    principal_role: String,

    #[command(subcommand)]
    command: Commands,
}

fn parse_role(s: &str) -> Option<Role> {
    match s.to_ascii_lowercase().as_str() {
        "admin" => Some(Role::Admin),
        "national_treasurer" => Some(Role::NationalTreasurer),
        "fund_director" => Some(Role::FundDirector),
        "pastor" => Some(Role::Pastor),
        "treasurer" => Some(Role::Treasurer),
        "church_manager" => Some(Role::ChurchManager),
        "secretary" => Some(Role::Secretary),
        _ => None,
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Loads the church list, fund set, and special providers
    /// Idempotent.
    Seed,

    /// Replays the fund ledger and compares the sum against each
    /// fund's cached `current_balance`.
    /// Exits `3` on any mismatch.
    CheckIntegrity,

    /// Prints a single fund's cached balance by code.
    FundBalance {
        /// Fund code, e.g. `FONDO_GENERAL`.
        code: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let Some(role) = parse_role(&cli.principal_role) else {
        log::error!("unrecognized --principal-role '{}'", cli.principal_role);
        return ExitCode::from(2);
    };
    let principal = Principal {
        id: Uuid::nil(),
        email: cli.principal_email.clone(),
        full_name: "CLI operator".to_string(),
        role,
        church_scope: None,
        active: true,
    };
    let target = Target {
        church_id: None,
        fund_id: None,
        created_by: None,
        status_is_editable: true,
    };
    if let Err(denial) = authorize(&principal, Action::UserManage, &target, &[]) {
        return fail("authorize", denial_to_error(denial));
    }

    let config = match CoreConfig::load(&cli.config) {
        Ok(config) => config,
        Err(_) => {
            log::warn!(
                "no config file at {:?}, falling back to defaults",
                cli.config
            );
            CoreConfig::default()
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            log::error!("failed to connect to database: {err}");
            return ExitCode::from(3);
        }
    };

    let ledger: Arc<dyn FundLedger> = Arc::new(PgFundLedger::new(pool.clone()));

    match cli.command {
        Commands::Seed => run_seed(pool).await,
        Commands::CheckIntegrity => run_check_integrity(ledger).await,
        Commands::FundBalance { code } => run_fund_balance(ledger, &code).await,
    }
}

async fn run_seed(pool: sqlx::PgPool) -> ExitCode {
    let churches = Arc::new(PgChurchStore::new(pool.clone()));
    let providers = Arc::new(PgProviderStore::new(pool.clone()));
    let ledger: Arc<dyn FundLedger> = Arc::new(PgFundLedger::new(pool));

    let church_count = match seeds::seed_churches(&(churches as Arc<dyn treasury_core::churches::ChurchStore>)).await {
        Ok(count) => count,
        Err(err) => return fail("seed churches", err),
    };
    let fund_count = match seeds::seed_funds(&ledger).await {
        Ok(count) => count,
        Err(err) => return fail("seed funds", err),
    };
    let provider_count = match seeds::seed_special_providers(
        &(providers as Arc<dyn treasury_core::providers::ProviderStore>),
    )
    .await
    {
        Ok(count) => count,
        Err(err) => return fail("seed special providers", err),
    };

    log::info!(
        "seeded {church_count} churches, {fund_count} funds, {provider_count} special providers"
    );
    ExitCode::SUCCESS
}

/// Replays every fund's transaction log from an empty balance and
/// compares the running total against the cached `current_balance`
/// ("F.current_balance(t) = Σ{amount_in − amount_out : ...}").
async fn run_check_integrity(ledger: Arc<dyn FundLedger>) -> ExitCode {
    let funds = match ledger.list_funds().await {
        Ok(funds) => funds,
        Err(err) => return fail("list funds", err),
    };

    let mut mismatches = 0;
    for fund in &funds {
        let rows = match ledger
            .ledger_slice(LedgerSliceQuery {
                fund_id: Some(fund.id),
                church_id: None,
                from: None,
                to: None,
                limit: i64::MAX,
                offset: 0,
            })
            .await
        {
            Ok(rows) => rows,
            Err(err) => return fail("ledger slice", err),
        };

        let replayed: Money = rows
            .iter()
            .fold(Money::ZERO, |acc, tx| (acc + tx.amount_in) - tx.amount_out);

        if replayed.as_i64() != fund.current_balance.as_i64() {
            mismatches += 1;
            log::error!(
                "fund {} ({}) cached balance {} != replayed balance {}",
                fund.name,
                fund.code,
                fund.current_balance,
                replayed
            );
        }
    }

    if mismatches > 0 {
        log::error!("{mismatches} fund(s) failed integrity check");
        return ExitCode::from(3);
    }

    log::info!("integrity check passed for {} fund(s)", funds.len());
    ExitCode::SUCCESS
}

async fn run_fund_balance(ledger: Arc<dyn FundLedger>, code: &str) -> ExitCode {
    if !codes::ALL_DESIGNATED.contains(&code)
        && code != codes::FONDO_GENERAL
        && code != codes::FONDO_NACIONAL
    {
        log::warn!("fund code '{code}' is not in the seeded set; looking it up anyway");
    }

    match ledger.find_fund_by_code(code).await {
        Ok(Some(fund)) => {
            println!("{} ({}): {}", fund.name, fund.code, fund.current_balance);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            log::error!("no fund with code '{code}'");
            ExitCode::from(2)
        }
        Err(err) => fail("fund balance", err),
    }
}

fn denial_to_error(denial: AuthzDenial) -> CoreError {
    match denial {
        AuthzDenial::NotAuthenticated => CoreError::NotAuthenticated,
        AuthzDenial::Forbidden => CoreError::Forbidden,
        AuthzDenial::OutOfScope => CoreError::OutOfScope,
    }
}

fn fail(op: &str, err: CoreError) -> ExitCode {
    log::error!("{op} failed: {err}");
    match err {
        CoreError::NotAuthenticated | CoreError::Forbidden | CoreError::OutOfScope => {
            ExitCode::from(4)
        }
        CoreError::DomainRangeError(_) | CoreError::MissingField(_) => ExitCode::from(2),
        _ => ExitCode::from(3),
    }
}
