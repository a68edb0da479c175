//! PostgreSQL-backed `FundLedger`.
//!
//! Uses runtime SQL queries rather than the `query!` compile-time macro
//! so the crate builds without a live `DATABASE_URL`. The `_tx` free
//! functions operate on a caller-supplied transaction so the Report and
//! Event engines can fold a ledger posting into their own unit of work
//! ("any failure reverts all three"); the trait impl
//! wraps them in a fresh transaction for standalone callers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::{CreateFundInput, Fund, FundTransaction, FundType};
use crate::error::{CoreError, Result};
use crate::money::Money;

use super::{
    apply_entry, lock_order, FundLedger, LedgerSliceQuery, PackageInput, PostEntryInput,
    PostedEntry, TransferInput, TransferResult,
};

fn fund_type_str(fund_type: FundType) -> &'static str {
    match fund_type {
        FundType::General => "general",
        FundType::Restricted => "restricted",
        FundType::Designated => "designated",
    }
}

fn parse_fund_type(s: &str) -> FundType {
    match s {
        "general" => FundType::General,
        "restricted" => FundType::Restricted,
        _ => FundType::Designated,
    }
}

fn row_to_fund(row: sqlx::postgres::PgRow) -> Fund {
    Fund {
        id: row.get("id"),
        name: row.get("name"),
        code: row.get("code"),
        fund_type: parse_fund_type(row.get::<String, _>("fund_type").as_str()),
        current_balance: Money::from_raw(row.get::<i64, _>("current_balance")),
        active: row.get("active"),
    }
}

pub struct PgFundLedger {
    pool: PgPool,
}

impl PgFundLedger {
    pub fn new(pool: PgPool) -> PgFundLedger {
        PgFundLedger { pool }
    }
}

#[allow(clippy::too_many_arguments)]
async fn insert_and_apply(
    tx: &mut Transaction<'_, Postgres>,
    fund_id: Uuid,
    date: NaiveDate,
    concept: &str,
    amount_in: Money,
    amount_out: Money,
    church_id: Option<Uuid>,
    report_id: Option<Uuid>,
    event_id: Option<Uuid>,
    provider_id: Option<Uuid>,
    related_transaction_id: Option<Uuid>,
    created_by: &str,
    allow_overdraw: bool,
) -> Result<PostedEntry> {
    FundTransaction::validate_single_sided(amount_in, amount_out)?;

    let row = sqlx::query("SELECT current_balance FROM funds WHERE id = $1 FOR UPDATE")
        .bind(fund_id)
        .fetch_optional(&mut **tx)
        .await?;
    let Some(row) = row else {
        return Err(CoreError::NotFound {
            kind: "Fund".to_string(),
            id: fund_id.to_string(),
        });
    };
    let current_balance = Money::from_raw(row.get::<i64, _>("current_balance"));
    let new_balance = apply_entry(current_balance, amount_in, amount_out, allow_overdraw)?;

    let transaction_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO fund_transactions
            (id, date, fund_id, church_id, report_id, event_id, provider_id, concept,
             amount_in, amount_out, balance_after, related_transaction_id, created_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now())
        "#,
    )
    .bind(transaction_id)
    .bind(date)
    .bind(fund_id)
    .bind(church_id)
    .bind(report_id)
    .bind(event_id)
    .bind(provider_id)
    .bind(concept)
    .bind(amount_in.as_i64())
    .bind(amount_out.as_i64())
    .bind(new_balance.as_i64())
    .bind(related_transaction_id)
    .bind(created_by)
    .execute(&mut **tx)
    .await?;

    sqlx::query("UPDATE funds SET current_balance = $1 WHERE id = $2")
        .bind(new_balance.as_i64())
        .bind(fund_id)
        .execute(&mut **tx)
        .await?;

    info!(
        "posted ledger entry {transaction_id} to fund {fund_id} (balance_after={new_balance})"
    );

    Ok(PostedEntry {
        transaction_id,
        balance_after: new_balance,
    })
}

pub async fn post_entry_tx(
    tx: &mut Transaction<'_, Postgres>,
    input: &PostEntryInput,
) -> Result<PostedEntry> {
    insert_and_apply(
        tx,
        input.fund_id,
        input.date,
        &input.concept,
        input.amount_in,
        input.amount_out,
        input.church_id,
        input.report_id,
        input.event_id,
        input.provider_id,
        None,
        &input.created_by,
        input.allow_overdraw,
    )
    .await
}

pub async fn post_transfer_tx(
    tx: &mut Transaction<'_, Postgres>,
    input: &TransferInput,
) -> Result<TransferResult> {
    if input.amount.is_zero() {
        return Err(CoreError::InvalidEntry(
            "transfer amount must be positive".to_string(),
        ));
    }

    // Lock both fund rows in ascending id order before debiting either
    // side, so two transfers touching the same pair in opposite
    // directions never deadlock.
    let (first, second) = lock_order(input.source_fund_id, input.dest_fund_id);
    for fund_id in [first, second] {
        sqlx::query("SELECT id FROM funds WHERE id = $1 FOR UPDATE")
            .bind(fund_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "Fund".to_string(),
                id: fund_id.to_string(),
            })?;
    }

    let related = Uuid::new_v4();
    let out_entry = insert_and_apply(
        tx,
        input.source_fund_id,
        input.date,
        &format!("Transfer to fund {}: {}", input.dest_fund_id, input.concept),
        Money::ZERO,
        input.amount,
        None,
        None,
        None,
        None,
        Some(related),
        &input.created_by,
        false,
    )
    .await?;
    let in_entry = insert_and_apply(
        tx,
        input.dest_fund_id,
        input.date,
        &format!("Transfer from fund {}: {}", input.source_fund_id, input.concept),
        input.amount,
        Money::ZERO,
        None,
        None,
        None,
        None,
        Some(related),
        &input.created_by,
        false,
    )
    .await?;

    Ok(TransferResult {
        out_transaction_id: out_entry.transaction_id,
        in_transaction_id: in_entry.transaction_id,
    })
}

pub async fn post_package_tx(
    tx: &mut Transaction<'_, Postgres>,
    package: &PackageInput,
) -> Result<Vec<PostedEntry>> {
    let mut fund_ids: Vec<Uuid> = package.entries.iter().map(|e| e.fund_id).collect();
    fund_ids.sort();
    fund_ids.dedup();
    for fund_id in &fund_ids {
        sqlx::query("SELECT id FROM funds WHERE id = $1 FOR UPDATE")
            .bind(fund_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "Fund".to_string(),
                id: fund_id.to_string(),
            })?;
    }

    let mut group_ids: HashMap<u32, Uuid> = HashMap::new();
    let mut posted = Vec::with_capacity(package.entries.len());
    for entry in &package.entries {
        let related = entry
            .link_group
            .map(|group| *group_ids.entry(group).or_insert_with(Uuid::new_v4));
        let posted_entry = insert_and_apply(
            tx,
            entry.fund_id,
            package.date,
            &entry.concept,
            entry.amount_in,
            entry.amount_out,
            entry.church_id,
            package.report_id,
            package.event_id,
            entry.provider_id,
            related,
            &package.created_by,
            package.allow_overdraw,
        )
        .await?;
        posted.push(posted_entry);
    }
    Ok(posted)
}

/// Re-invocation is a no-op. The Report Engine checks this before
/// composing the package so the whole approval stays cheap on the
/// common path.
pub async fn package_already_posted_tx(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT 1 AS present FROM fund_transactions WHERE report_id = $1 AND created_by = $2 LIMIT 1",
    )
    .bind(report_id)
    .bind(FundTransaction::SYSTEM_ACTOR)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.is_some())
}

pub async fn reverse_package_tx(tx: &mut Transaction<'_, Postgres>, report_id: Uuid) -> Result<()> {
    let rows = sqlx::query(
        "SELECT id, fund_id, amount_in, amount_out FROM fund_transactions WHERE report_id = $1 AND created_by = $2",
    )
    .bind(report_id)
    .bind(FundTransaction::SYSTEM_ACTOR)
    .fetch_all(&mut **tx)
    .await?;

    if rows.is_empty() {
        return Ok(());
    }

    let mut fund_ids: Vec<Uuid> = rows.iter().map(|row| row.get("fund_id")).collect();
    fund_ids.sort();
    fund_ids.dedup();
    for fund_id in &fund_ids {
        sqlx::query("SELECT id FROM funds WHERE id = $1 FOR UPDATE")
            .bind(fund_id)
            .fetch_optional(&mut **tx)
            .await?;
    }

    for row in &rows {
        let fund_id: Uuid = row.get("fund_id");
        let amount_in: i64 = row.get("amount_in");
        let amount_out: i64 = row.get("amount_out");
        sqlx::query("UPDATE funds SET current_balance = current_balance - $1 + $2 WHERE id = $3")
            .bind(amount_in)
            .bind(amount_out)
            .bind(fund_id)
            .execute(&mut **tx)
            .await?;
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();
    sqlx::query("DELETE FROM fund_transactions WHERE id = ANY($1)")
        .bind(&ids)
        .execute(&mut **tx)
        .await?;

    info!("reversed {} ledger rows for report {report_id}", ids.len());
    Ok(())
}

fn row_to_transaction(row: sqlx::postgres::PgRow) -> FundTransaction {
    FundTransaction {
        id: row.get("id"),
        date: row.get("date"),
        fund_id: row.get("fund_id"),
        church_id: row.get("church_id"),
        report_id: row.get("report_id"),
        event_id: row.get("event_id"),
        provider_id: row.get("provider_id"),
        concept: row.get("concept"),
        amount_in: Money::from_raw(row.get::<i64, _>("amount_in")),
        amount_out: Money::from_raw(row.get::<i64, _>("amount_out")),
        balance_after: Money::from_raw(row.get::<i64, _>("balance_after")),
        related_transaction_id: row.get("related_transaction_id"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl FundLedger for PgFundLedger {
    async fn post_entry(&self, input: PostEntryInput) -> Result<PostedEntry> {
        let mut tx = self.pool.begin().await?;
        let result = post_entry_tx(&mut tx, &input).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn post_transfer(&self, input: TransferInput) -> Result<TransferResult> {
        let mut tx = self.pool.begin().await?;
        let result = post_transfer_tx(&mut tx, &input).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn post_package(&self, package: PackageInput) -> Result<Vec<PostedEntry>> {
        let mut tx = self.pool.begin().await?;
        let result = post_package_tx(&mut tx, &package).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn package_already_posted(&self, report_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let present = package_already_posted_tx(&mut tx, report_id).await?;
        tx.commit().await?;
        Ok(present)
    }

    async fn reverse_package(&self, report_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        reverse_package_tx(&mut tx, report_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn balance(&self, fund_id: Uuid) -> Result<Money> {
        let row = sqlx::query("SELECT current_balance FROM funds WHERE id = $1")
            .bind(fund_id)
            .fetch_optional(&self.pool)
            .await?;
        let row = row.ok_or_else(|| CoreError::NotFound {
            kind: "Fund".to_string(),
            id: fund_id.to_string(),
        })?;
        Ok(Money::from_raw(row.get::<i64, _>("current_balance")))
    }

    async fn ledger_slice(&self, query: LedgerSliceQuery) -> Result<Vec<FundTransaction>> {
        let mut qb = sqlx::QueryBuilder::<Postgres>::new(
            "SELECT id, date, fund_id, church_id, report_id, event_id, provider_id, concept, \
             amount_in, amount_out, balance_after, related_transaction_id, created_by, created_at \
             FROM fund_transactions WHERE 1 = 1",
        );
        if let Some(fund_id) = query.fund_id {
            qb.push(" AND fund_id = ").push_bind(fund_id);
        }
        if let Some(church_id) = query.church_id {
            qb.push(" AND church_id = ").push_bind(church_id);
        }
        if let Some(from) = query.from {
            qb.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            qb.push(" AND date <= ").push_bind(to);
        }
        qb.push(" ORDER BY date ASC, created_at ASC, id ASC LIMIT ")
            .push_bind(query.limit.max(1))
            .push(" OFFSET ")
            .push_bind(query.offset.max(0));

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_transaction).collect())
    }

    async fn create_fund(&self, input: CreateFundInput) -> Result<Fund> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO funds (id, name, code, fund_type, current_balance, active) \
             VALUES ($1, $2, $3, $4, 0, true)",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.code)
        .bind(fund_type_str(input.fund_type))
        .execute(&self.pool)
        .await?;
        Ok(Fund {
            id,
            name: input.name,
            code: input.code,
            fund_type: input.fund_type,
            current_balance: Money::ZERO,
            active: true,
        })
    }

    async fn find_fund_by_code(&self, code: &str) -> Result<Option<Fund>> {
        let row = sqlx::query("SELECT id, name, code, fund_type, current_balance, active FROM funds WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_fund))
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        let rows = sqlx::query("SELECT id, name, code, fund_type, current_balance, active FROM funds ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_fund).collect())
    }
}
