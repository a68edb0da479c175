//! PostgreSQL-backed `ReportStore`.
//!
//! As with the ledger, the mutation paths that the engine must fold
//! into one unit of work (`submit`, `approve`, `reverse`) are exposed
//! as `_tx` free functions over a caller-supplied transaction; the
//! trait impl wraps them in a fresh transaction for standalone use.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::{
    Report, ReportAttachments, ReportAttendance, ReportDeposit, ReportDerived, ReportDesignated,
    ReportDonor, ReportExpenses, ReportIncome, ReportInput, ReportProcessing, ReportStatus,
    ReportSubmission, SubmissionSource, SubmissionType,
};
use crate::error::{CoreError, Result};
use crate::money::Money;

use super::{compute_derived, ReportStore};

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> PgReportStore {
        PgReportStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn status_str(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Draft => "draft",
        ReportStatus::Submitted => "submitted",
        ReportStatus::PendingRevision => "pending_revision",
        ReportStatus::Approved => "approved",
        ReportStatus::Rejected => "rejected",
    }
}

fn parse_status(s: &str) -> ReportStatus {
    match s {
        "submitted" => ReportStatus::Submitted,
        "pending_revision" => ReportStatus::PendingRevision,
        "approved" => ReportStatus::Approved,
        "rejected" => ReportStatus::Rejected,
        _ => ReportStatus::Draft,
    }
}

fn row_to_report(row: sqlx::postgres::PgRow) -> Report {
    let submission = row
        .get::<Option<Uuid>, _>("submitted_by")
        .map(|submitted_by| ReportSubmission {
            submission_type: if row.get::<String, _>("submission_type") == "manual" {
                SubmissionType::Manual
            } else {
                SubmissionType::Online
            },
            source: if row.get::<String, _>("submission_source") == "admin_import" {
                SubmissionSource::AdminImport
            } else {
                SubmissionSource::ChurchPortal
            },
            submitted_by,
            submitted_at: row.get("submitted_at"),
        });

    Report {
        id: row.get("id"),
        church_id: row.get("church_id"),
        month: row.get::<i32, _>("month") as u32,
        year: row.get("year"),
        status: parse_status(row.get::<String, _>("status").as_str()),
        income: ReportIncome {
            diezmos: Money::from_raw(row.get("income_diezmos")),
            ofrendas: Money::from_raw(row.get("income_ofrendas")),
            anexos: Money::from_raw(row.get("income_anexos")),
            caballeros: Money::from_raw(row.get("income_caballeros")),
            damas: Money::from_raw(row.get("income_damas")),
            jovenes: Money::from_raw(row.get("income_jovenes")),
            ninos: Money::from_raw(row.get("income_ninos")),
            otros: Money::from_raw(row.get("income_otros")),
        },
        designated: ReportDesignated {
            misiones: Money::from_raw(row.get("designated_misiones")),
            lazos_amor: Money::from_raw(row.get("designated_lazos_amor")),
            mision_posible: Money::from_raw(row.get("designated_mision_posible")),
            apy: Money::from_raw(row.get("designated_apy")),
            iba: Money::from_raw(row.get("designated_iba")),
            aporte_caballeros: Money::from_raw(row.get("designated_aporte_caballeros")),
        },
        expenses: ReportExpenses {
            energia: Money::from_raw(row.get("expense_energia")),
            agua: Money::from_raw(row.get("expense_agua")),
            basura: Money::from_raw(row.get("expense_basura")),
            servicios: Money::from_raw(row.get("expense_servicios")),
            mantenimiento: Money::from_raw(row.get("expense_mantenimiento")),
            materiales: Money::from_raw(row.get("expense_materiales")),
            otros_gastos: Money::from_raw(row.get("expense_otros_gastos")),
            honorarios_pastoral: Money::from_raw(row.get("expense_honorarios_pastoral")),
        },
        deposit: ReportDeposit {
            number: row.get("deposit_number"),
            date: row.get("deposit_date"),
            amount: Money::from_raw(row.get("deposit_amount")),
        },
        attendance: ReportAttendance {
            visitors: row.get::<i32, _>("attendance_visitors") as u32,
            baptisms_water: row.get::<i32, _>("attendance_baptisms_water") as u32,
            baptisms_spirit: row.get::<i32, _>("attendance_baptisms_spirit") as u32,
        },
        derived: ReportDerived {
            fondo_nacional: Money::from_raw(row.get("derived_fondo_nacional")),
            total_fondo_nacional: Money::from_raw(row.get("derived_total_fondo_nacional")),
            total_entradas: Money::from_raw(row.get("derived_total_entradas")),
            gastos_operativos: Money::from_raw(row.get("derived_gastos_operativos")),
            total_salidas: Money::from_raw(row.get("derived_total_salidas")),
            saldo_mes: row.get("derived_saldo_mes"),
        },
        observations: row.get("observations"),
        submission,
        processing: ReportProcessing {
            processed_by: row.get("processed_by"),
            processed_at: row.get("processed_at"),
            transactions_posted: row.get("transactions_posted"),
        },
        attachments: ReportAttachments {
            summary: row.get("attachment_summary"),
            deposit: row.get("attachment_deposit"),
        },
    }
}

const COLUMNS: &str = "id, church_id, month, year, status, \
    income_diezmos, income_ofrendas, income_anexos, income_caballeros, income_damas, \
    income_jovenes, income_ninos, income_otros, \
    designated_misiones, designated_lazos_amor, designated_mision_posible, designated_apy, \
    designated_iba, designated_aporte_caballeros, \
    expense_energia, expense_agua, expense_basura, expense_servicios, expense_mantenimiento, \
    expense_materiales, expense_otros_gastos, expense_honorarios_pastoral, \
    deposit_number, deposit_date, deposit_amount, \
    attendance_visitors, attendance_baptisms_water, attendance_baptisms_spirit, \
    derived_fondo_nacional, derived_total_fondo_nacional, derived_total_entradas, \
    derived_gastos_operativos, derived_total_salidas, derived_saldo_mes, \
    observations, submission_type, submission_source, submitted_by, submitted_at, \
    processed_by, processed_at, transactions_posted, attachment_summary, attachment_deposit";

pub async fn find_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Report> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM reports WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            kind: "Report".to_string(),
            id: id.to_string(),
        })?;
    Ok(row_to_report(row))
}

pub async fn list_donors_tx(tx: &mut Transaction<'_, Postgres>, report_id: Uuid) -> Result<Vec<ReportDonor>> {
    let rows = sqlx::query(
        "SELECT id, report_id, first_name, last_name, document, amount FROM report_donors WHERE report_id = $1",
    )
    .bind(report_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| ReportDonor {
            id: row.get("id"),
            report_id: row.get("report_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            document: row.get("document"),
            amount: Money::from_raw(row.get("amount")),
        })
        .collect())
}

pub async fn set_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: ReportStatus,
) -> Result<()> {
    sqlx::query("UPDATE reports SET status = $1 WHERE id = $2")
        .bind(status_str(status))
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_submitted_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    submitted_by: Uuid,
) -> Result<()> {
    sqlx::query(
        "UPDATE reports SET status = 'submitted', submission_type = 'online', \
         submission_source = 'church_portal', submitted_by = $1, submitted_at = now() WHERE id = $2",
    )
    .bind(submitted_by)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn mark_processed_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    processed_by: Uuid,
) -> Result<()> {
    sqlx::query(
        "UPDATE reports SET status = 'approved', processed_by = $1, processed_at = now(), \
         transactions_posted = true WHERE id = $2",
    )
    .bind(processed_by)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn clear_processing_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE reports SET status = 'pending_revision', processed_by = NULL, \
         processed_at = NULL, transactions_posted = false WHERE id = $1",
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn create(&self, input: ReportInput) -> Result<Report> {
        let existing = self.find_by_natural_key(input.church_id, input.month, input.year).await?;
        if let Some(existing) = existing {
            return Err(CoreError::AlreadyExists {
                kind: "Report".to_string(),
                id: existing.id.to_string(),
            });
        }
        let derived = compute_derived(&input);
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO reports (
                id, church_id, month, year, status,
                income_diezmos, income_ofrendas, income_anexos, income_caballeros, income_damas,
                income_jovenes, income_ninos, income_otros,
                designated_misiones, designated_lazos_amor, designated_mision_posible,
                designated_apy, designated_iba, designated_aporte_caballeros,
                expense_energia, expense_agua, expense_basura, expense_servicios,
                expense_mantenimiento, expense_materiales, expense_otros_gastos,
                expense_honorarios_pastoral,
                deposit_number, deposit_date, deposit_amount,
                attendance_visitors, attendance_baptisms_water, attendance_baptisms_spirit,
                derived_fondo_nacional, derived_total_fondo_nacional, derived_total_entradas,
                derived_gastos_operativos, derived_total_salidas, derived_saldo_mes,
                observations, transactions_posted
            ) VALUES (
                $1, $2, $3, $4, 'draft',
                $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18,
                $19, $20, $21, $22, $23, $24, $25, $26,
                $27, $28, $29,
                $30, $31, $32,
                $33, $34, $35, $36, $37, $38,
                $39, false
            )
            "#,
        )
        .bind(id)
        .bind(input.church_id)
        .bind(input.month as i32)
        .bind(input.year)
        .bind(input.income.diezmos.as_i64())
        .bind(input.income.ofrendas.as_i64())
        .bind(input.income.anexos.as_i64())
        .bind(input.income.caballeros.as_i64())
        .bind(input.income.damas.as_i64())
        .bind(input.income.jovenes.as_i64())
        .bind(input.income.ninos.as_i64())
        .bind(input.income.otros.as_i64())
        .bind(input.designated.misiones.as_i64())
        .bind(input.designated.lazos_amor.as_i64())
        .bind(input.designated.mision_posible.as_i64())
        .bind(input.designated.apy.as_i64())
        .bind(input.designated.iba.as_i64())
        .bind(input.designated.aporte_caballeros.as_i64())
        .bind(input.expenses.energia.as_i64())
        .bind(input.expenses.agua.as_i64())
        .bind(input.expenses.basura.as_i64())
        .bind(input.expenses.servicios.as_i64())
        .bind(input.expenses.mantenimiento.as_i64())
        .bind(input.expenses.materiales.as_i64())
        .bind(input.expenses.otros_gastos.as_i64())
        .bind(input.expenses.honorarios_pastoral.as_i64())
        .bind(&input.deposit.number)
        .bind(input.deposit.date)
        .bind(input.deposit.amount.as_i64())
        .bind(input.attendance.visitors as i32)
        .bind(input.attendance.baptisms_water as i32)
        .bind(input.attendance.baptisms_spirit as i32)
        .bind(derived.fondo_nacional.as_i64())
        .bind(derived.total_fondo_nacional.as_i64())
        .bind(derived.total_entradas.as_i64())
        .bind(derived.gastos_operativos.as_i64())
        .bind(derived.total_salidas.as_i64())
        .bind(derived.saldo_mes)
        .bind(&input.observations)
        .execute(&mut *tx)
        .await?;

        for donor in &input.donors {
            sqlx::query(
                "INSERT INTO report_donors (id, report_id, first_name, last_name, document, amount) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&donor.first_name)
            .bind(&donor.last_name)
            .bind(&donor.document)
            .bind(donor.amount.as_i64())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.find(id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Report".to_string(),
            id: id.to_string(),
        })
    }

    async fn replace_inputs(&self, id: Uuid, input: ReportInput) -> Result<Report> {
        let derived = compute_derived(&input);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE reports SET
                income_diezmos = $1, income_ofrendas = $2, income_anexos = $3,
                income_caballeros = $4, income_damas = $5, income_jovenes = $6,
                income_ninos = $7, income_otros = $8,
                designated_misiones = $9, designated_lazos_amor = $10,
                designated_mision_posible = $11, designated_apy = $12, designated_iba = $13,
                designated_aporte_caballeros = $14,
                expense_energia = $15, expense_agua = $16, expense_basura = $17,
                expense_servicios = $18, expense_mantenimiento = $19, expense_materiales = $20,
                expense_otros_gastos = $21, expense_honorarios_pastoral = $22,
                deposit_number = $23, deposit_date = $24, deposit_amount = $25,
                attendance_visitors = $26, attendance_baptisms_water = $27,
                attendance_baptisms_spirit = $28,
                derived_fondo_nacional = $29, derived_total_fondo_nacional = $30,
                derived_total_entradas = $31, derived_gastos_operativos = $32,
                derived_total_salidas = $33, derived_saldo_mes = $34,
                observations = $35
            WHERE id = $36
            "#,
        )
        .bind(input.income.diezmos.as_i64())
        .bind(input.income.ofrendas.as_i64())
        .bind(input.income.anexos.as_i64())
        .bind(input.income.caballeros.as_i64())
        .bind(input.income.damas.as_i64())
        .bind(input.income.jovenes.as_i64())
        .bind(input.income.ninos.as_i64())
        .bind(input.income.otros.as_i64())
        .bind(input.designated.misiones.as_i64())
        .bind(input.designated.lazos_amor.as_i64())
        .bind(input.designated.mision_posible.as_i64())
        .bind(input.designated.apy.as_i64())
        .bind(input.designated.iba.as_i64())
        .bind(input.designated.aporte_caballeros.as_i64())
        .bind(input.expenses.energia.as_i64())
        .bind(input.expenses.agua.as_i64())
        .bind(input.expenses.basura.as_i64())
        .bind(input.expenses.servicios.as_i64())
        .bind(input.expenses.mantenimiento.as_i64())
        .bind(input.expenses.materiales.as_i64())
        .bind(input.expenses.otros_gastos.as_i64())
        .bind(input.expenses.honorarios_pastoral.as_i64())
        .bind(&input.deposit.number)
        .bind(input.deposit.date)
        .bind(input.deposit.amount.as_i64())
        .bind(input.attendance.visitors as i32)
        .bind(input.attendance.baptisms_water as i32)
        .bind(input.attendance.baptisms_spirit as i32)
        .bind(derived.fondo_nacional.as_i64())
        .bind(derived.total_fondo_nacional.as_i64())
        .bind(derived.total_entradas.as_i64())
        .bind(derived.gastos_operativos.as_i64())
        .bind(derived.total_salidas.as_i64())
        .bind(derived.saldo_mes)
        .bind(&input.observations)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM report_donors WHERE report_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for donor in &input.donors {
            sqlx::query(
                "INSERT INTO report_donors (id, report_id, first_name, last_name, document, amount) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&donor.first_name)
            .bind(&donor.last_name)
            .bind(&donor.document)
            .bind(donor.amount.as_i64())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        self.find(id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Report".to_string(),
            id: id.to_string(),
        })
    }

    async fn find(&self, id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_report))
    }

    async fn find_by_natural_key(&self, church_id: Uuid, month: u32, year: i32) -> Result<Option<Report>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM reports WHERE church_id = $1 AND month = $2 AND year = $3"
        ))
        .bind(church_id)
        .bind(month as i32)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_report))
    }

    async fn list_donors(&self, report_id: Uuid) -> Result<Vec<ReportDonor>> {
        let rows = sqlx::query(
            "SELECT id, report_id, first_name, last_name, document, amount FROM report_donors WHERE report_id = $1",
        )
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| ReportDonor {
                id: row.get("id"),
                report_id: row.get("report_id"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                document: row.get("document"),
                amount: Money::from_raw(row.get("amount")),
            })
            .collect())
    }

    async fn list_for_church(&self, church_id: Uuid) -> Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM reports WHERE church_id = $1 ORDER BY year DESC, month DESC"
        ))
        .bind(church_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_report).collect())
    }

    async fn set_status(&self, id: Uuid, status: ReportStatus) -> Result<Report> {
        let mut tx = self.pool.begin().await?;
        set_status_tx(&mut tx, id, status).await?;
        let report = find_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(report)
    }

    async fn mark_submitted(&self, id: Uuid, submitted_by: Uuid) -> Result<Report> {
        let mut tx = self.pool.begin().await?;
        mark_submitted_tx(&mut tx, id, submitted_by).await?;
        let report = find_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(report)
    }

    async fn mark_processed(&self, id: Uuid, processed_by: Uuid) -> Result<Report> {
        let mut tx = self.pool.begin().await?;
        mark_processed_tx(&mut tx, id, processed_by).await?;
        let report = find_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(report)
    }

    async fn clear_processing(&self, id: Uuid) -> Result<Report> {
        let mut tx = self.pool.begin().await?;
        clear_processing_tx(&mut tx, id).await?;
        let report = find_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(report)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM report_donors WHERE report_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

