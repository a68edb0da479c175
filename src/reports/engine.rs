//! Transactional shell for the Report Engine.
//!
//! Glues the pure functions in [`super`] to the Authorization Kernel,
//! the Fund Ledger, the Church directory, and the Audit Sink. Built
//! against the store traits rather than a concrete Postgres pool so it
//! runs unchanged against the `InMemory*` fakes in the contract tests;
//! the ledger package posting is the one step that must be atomic, and
//! that atomicity is [`crate::ledger::FundLedger::post_package`]'s job,
//! not this shell's.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::assignments::AssignmentStore;
use crate::audit::{AuditSink, NewNotification};
use crate::authz::{authorize, Action, AuthzDenial, Target};
use crate::churches::ChurchStore;
use crate::config::PolicyConfig;
use crate::domain::fund::codes;
use crate::domain::{DonorInput, FundTransaction, NotificationKind, Principal, Report, ReportInput};
use crate::error::{CoreError, Result};
use crate::ledger::{FundLedger, PackageEntry, PackageInput};

use super::{check_deposit_reconciliation, is_editable, next_status, validate_donor_reconciliation, ReportAction, ReportStore};

fn denial_to_error(denial: AuthzDenial) -> CoreError {
    match denial {
        AuthzDenial::NotAuthenticated => CoreError::NotAuthenticated,
        AuthzDenial::Forbidden => CoreError::Forbidden,
        AuthzDenial::OutOfScope => CoreError::OutOfScope,
    }
}

pub struct ReportEngine {
    reports: Arc<dyn ReportStore>,
    ledger: Arc<dyn FundLedger>,
    churches: Arc<dyn ChurchStore>,
    audit: Arc<dyn AuditSink>,
    assignments: Arc<dyn AssignmentStore>,
    policy: PolicyConfig,
}

impl ReportEngine {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        ledger: Arc<dyn FundLedger>,
        churches: Arc<dyn ChurchStore>,
        audit: Arc<dyn AuditSink>,
        assignments: Arc<dyn AssignmentStore>,
        policy: PolicyConfig,
    ) -> ReportEngine {
        ReportEngine {
            reports,
            ledger,
            churches,
            audit,
            assignments,
            policy,
        }
    }

    async fn guard(
        &self,
        principal: &Principal,
        action: Action,
        target: &Target,
        op: &str,
        target_id: Uuid,
    ) -> Result<()> {
        let assignments = self.assignments.list_for_principal(principal.id).await?;
        match authorize(principal, action, target, &assignments) {
            Ok(()) => Ok(()),
            Err(denial) => {
                let error = denial_to_error(denial);
                self.audit
                    .record_denied(principal.id, op, "Report", target_id, error.kind())
                    .await?;
                Err(error)
            }
        }
    }

    pub async fn create(&self, principal: &Principal, input: ReportInput) -> Result<Report> {
        let target = Target::church(input.church_id);
        self.guard(principal, Action::ReportCreate, &target, "report.create", Uuid::nil())
            .await?;
        let report = self.reports.create(input).await?;
        self.audit
            .record(principal.id, "report.create", "Report", report.id, serde_json::json!({}))
            .await?;
        Ok(report)
    }

    pub async fn edit(&self, principal: &Principal, report_id: Uuid, input: ReportInput) -> Result<Report> {
        let current = self.load(report_id).await?;
        let mut target = Target::church(current.church_id);
        target.status_is_editable = is_editable(current.status);
        self.guard(principal, Action::ReportEdit, &target, "report.edit", report_id)
            .await?;
        let report = self.reports.replace_inputs(report_id, input).await?;
        self.audit
            .record(principal.id, "report.edit", "Report", report.id, serde_json::json!({}))
            .await?;
        Ok(report)
    }

    pub async fn submit(&self, principal: &Principal, report_id: Uuid) -> Result<Report> {
        let current = self.load(report_id).await?;
        let mut target = Target::church(current.church_id);
        target.status_is_editable = is_editable(current.status);
        self.guard(principal, Action::ReportSubmit, &target, "report.submit", report_id)
            .await?;
        next_status(current.status, ReportAction::Submit)?;

        let donors: Vec<DonorInput> = self
            .reports
            .list_donors(report_id)
            .await?
            .into_iter()
            .map(|d| DonorInput {
                first_name: d.first_name,
                last_name: d.last_name,
                document: d.document,
                amount: d.amount,
            })
            .collect();
        validate_donor_reconciliation(current.income.diezmos, &donors)?;
        let warning = check_deposit_reconciliation(
            current.deposit.amount,
            current.derived.total_fondo_nacional,
            self.policy.strict_deposit,
        )?;

        let report = self.reports.mark_submitted(report_id, principal.id).await?;
        self.audit
            .record(
                principal.id,
                "report.submit",
                "Report",
                report.id,
                serde_json::json!({ "deposit_delta_warning": warning }),
            )
            .await?;
        Ok(report)
    }

    pub async fn request_revision(&self, principal: &Principal, report_id: Uuid) -> Result<Report> {
        let current = self.load(report_id).await?;
        let target = Target::church(current.church_id);
        self.guard(principal, Action::ReportReject, &target, "report.request_revision", report_id)
            .await?;
        let next = next_status(current.status, ReportAction::RequestRevision)?;
        let report = self.reports.set_status(report_id, next).await?;
        self.audit
            .record(
                principal.id,
                "report.request_revision",
                "Report",
                report.id,
                serde_json::json!({}),
            )
            .await?;
        self.notify(&report, NotificationKind::RevisionRequested).await?;
        Ok(report)
    }

    pub async fn approve(&self, principal: &Principal, report_id: Uuid) -> Result<Report> {
        let current = self.load(report_id).await?;
        let target = Target::church(current.church_id);
        self.guard(principal, Action::ReportApprove, &target, "report.approve", report_id)
            .await?;
        next_status(current.status, ReportAction::Approve)?;

        if !self.ledger.package_already_posted(report_id).await? {
            let package = self.build_package(&current, principal).await?;
            self.ledger.post_package(package).await?;
        }
        let report = self.reports.mark_processed(report_id, principal.id).await?;
        self.audit
            .record(principal.id, "report.approve", "Report", report.id, serde_json::json!({}))
            .await?;
        self.notify(&report, NotificationKind::Processed).await?;
        Ok(report)
    }

    pub async fn reject(&self, principal: &Principal, report_id: Uuid) -> Result<Report> {
        let current = self.load(report_id).await?;
        let target = Target::church(current.church_id);
        self.guard(principal, Action::ReportReject, &target, "report.reject", report_id)
            .await?;
        let next = next_status(current.status, ReportAction::Reject)?;
        let report = self.reports.set_status(report_id, next).await?;
        self.audit
            .record(principal.id, "report.reject", "Report", report.id, serde_json::json!({}))
            .await?;
        self.notify(&report, NotificationKind::Rejected).await?;
        Ok(report)
    }

    pub async fn rollback_to_pending_revision(&self, principal: &Principal, report_id: Uuid) -> Result<Report> {
        let current = self.load(report_id).await?;
        let target = Target::church(current.church_id);
        self.guard(principal, Action::ReportApprove, &target, "report.rollback", report_id)
            .await?;
        next_status(current.status, ReportAction::RollbackToRevision)?;
        if current.processing.transactions_posted {
            self.ledger.reverse_package(report_id).await?;
        }
        let report = self.reports.clear_processing(report_id).await?;
        self.audit
            .record(principal.id, "report.rollback", "Report", report.id, serde_json::json!({}))
            .await?;
        Ok(report)
    }

    pub async fn delete(&self, principal: &Principal, report_id: Uuid) -> Result<()> {
        let current = self.load(report_id).await?;
        let target = Target::church(current.church_id);
        self.guard(principal, Action::ReportDelete, &target, "report.delete", report_id)
            .await?;
        if current.processing.transactions_posted {
            self.ledger.reverse_package(report_id).await?;
        }
        self.reports.delete(report_id).await?;
        self.audit
            .record(principal.id, "report.delete", "Report", report_id, serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn load(&self, report_id: Uuid) -> Result<Report> {
        self.reports.find(report_id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Report".to_string(),
            id: report_id.to_string(),
        })
    }

    /// Composes the four-step ledger package:
    /// gross income into Fondo General, the national tithe and each
    /// designated-fund amount moved out of Fondo General as linked
    /// pairs, and pastoral honoraria plus operating expenses posted as
    /// single outbound rows. Posted under the system actor (rather
    /// than the approving principal) so [`FundLedger::reverse_package`]
    /// can find and undo exactly these rows on rollback.
    async fn build_package(&self, report: &Report, _principal: &Principal) -> Result<PackageInput> {
        let general = self.fund_id(codes::FONDO_GENERAL).await?;
        let nacional = self.fund_id(codes::FONDO_NACIONAL).await?;

        let mut entries = vec![PackageEntry {
            fund_id: general,
            concept: format!("Ingresos mes {}/{}", report.month, report.year),
            amount_in: report.derived.total_entradas,
            amount_out: crate::money::Money::ZERO,
            church_id: Some(report.church_id),
            provider_id: None,
            link_group: None,
        }];

        if !report.derived.fondo_nacional.is_zero() {
            entries.push(PackageEntry {
                fund_id: general,
                concept: "Diezmo nacional".to_string(),
                amount_in: crate::money::Money::ZERO,
                amount_out: report.derived.fondo_nacional,
                church_id: Some(report.church_id),
                provider_id: None,
                link_group: Some(1),
            });
            entries.push(PackageEntry {
                fund_id: nacional,
                concept: "Diezmo nacional".to_string(),
                amount_in: report.derived.fondo_nacional,
                amount_out: crate::money::Money::ZERO,
                church_id: Some(report.church_id),
                provider_id: None,
                link_group: Some(1),
            });
        }

        for (link_index, (code, amount)) in report.designated.nonzero_by_fund_code().into_iter().enumerate() {
            let fund_id = self.fund_id(code).await?;
            let group = 2 + link_index as u32;
            entries.push(PackageEntry {
                fund_id: general,
                concept: format!("Ofrenda designada {code}"),
                amount_in: crate::money::Money::ZERO,
                amount_out: amount,
                church_id: Some(report.church_id),
                provider_id: None,
                link_group: Some(group),
            });
            entries.push(PackageEntry {
                fund_id,
                concept: format!("Ofrenda designada {code}"),
                amount_in: amount,
                amount_out: crate::money::Money::ZERO,
                church_id: Some(report.church_id),
                provider_id: None,
                link_group: Some(group),
            });
        }

        if !report.expenses.honorarios_pastoral.is_zero() {
            entries.push(PackageEntry {
                fund_id: general,
                concept: "Honorarios pastorales".to_string(),
                amount_in: crate::money::Money::ZERO,
                amount_out: report.expenses.honorarios_pastoral,
                church_id: Some(report.church_id),
                provider_id: None,
                link_group: None,
            });
        }

        if !report.derived.gastos_operativos.is_zero() {
            entries.push(PackageEntry {
                fund_id: general,
                concept: "Gastos operativos".to_string(),
                amount_in: crate::money::Money::ZERO,
                amount_out: report.derived.gastos_operativos,
                church_id: Some(report.church_id),
                provider_id: None,
                link_group: None,
            });
        }

        Ok(PackageInput {
            date: report.deposit.date.unwrap_or_else(|| Utc::now().date_naive()),
            report_id: Some(report.id),
            event_id: None,
            created_by: FundTransaction::SYSTEM_ACTOR.to_string(),
            allow_overdraw: self.policy.allow_overdraw,
            entries,
        })
    }

    async fn fund_id(&self, code: &str) -> Result<Uuid> {
        self.ledger
            .find_fund_by_code(code)
            .await?
            .map(|f| f.id)
            .ok_or_else(|| CoreError::NotFound {
                kind: "Fund".to_string(),
                id: code.to_string(),
            })
    }

    async fn notify(&self, report: &Report, kind: NotificationKind) -> Result<()> {
        let recipient = match self.churches.find(report.church_id).await? {
            Some(church) => church.contact_email,
            None => return Ok(()),
        };
        let subject = match kind {
            NotificationKind::Processed => "Informe procesado",
            NotificationKind::Rejected => "Informe rechazado",
            NotificationKind::RevisionRequested => "Informe requiere revision",
        };
        self.audit
            .enqueue_notification(NewNotification {
                report_id: Some(report.id),
                kind,
                recipient,
                subject: subject.to_string(),
                body: format!("Informe {}/{} actualizado.", report.month, report.year),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignments::InMemoryAssignmentStore;
    use crate::audit::InMemoryAuditSink;
    use crate::churches::InMemoryChurchStore;
    use crate::domain::{
        CreateChurchInput, CreateFundInput, FundType, ReportAttendance, ReportDeposit, ReportDesignated,
        ReportExpenses, ReportIncome, Role,
    };
    use crate::ledger::InMemoryFundLedger;
    use crate::money::Money;
    use crate::reports::InMemoryReportStore;

    async fn setup() -> (ReportEngine, Principal, Uuid) {
        let churches = Arc::new(InMemoryChurchStore::new());
        let church = churches
            .create(CreateChurchInput {
                name: "Iglesia Central".to_string(),
                city: "Asuncion".to_string(),
                primary_pastor_name: "Pastor Juan".to_string(),
                contact_phone: "000".to_string(),
                contact_email: "central@example.org".to_string(),
                tax_id: None,
            })
            .await
            .unwrap();

        let ledger = Arc::new(InMemoryFundLedger::new());
        for (code, name) in [
            (codes::FONDO_GENERAL, "Fondo General"),
            (codes::FONDO_NACIONAL, "Fondo Nacional"),
        ] {
            ledger
                .create_fund(CreateFundInput {
                    name: name.to_string(),
                    code: code.to_string(),
                    fund_type: FundType::General,
                })
                .await
                .unwrap();
        }
        for code in codes::DESIGNATED {
            ledger
                .create_fund(CreateFundInput {
                    name: code.to_string(),
                    code: code.to_string(),
                    fund_type: FundType::Designated,
                })
                .await
                .unwrap();
        }

        let reports = Arc::new(InMemoryReportStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let assignments = Arc::new(InMemoryAssignmentStore::new());
        let engine = ReportEngine::new(reports, ledger, churches, audit, assignments, PolicyConfig::default());

        let treasurer = Principal {
            id: Uuid::new_v4(),
            email: "tesorero@example.org".to_string(),
            full_name: "Tesorero".to_string(),
            role: Role::Treasurer,
            church_scope: Some(church.id),
            active: true,
        };
        (engine, treasurer, church.id)
    }

    fn input(church_id: Uuid) -> ReportInput {
        ReportInput {
            church_id,
            month: 3,
            year: 2025,
            income: ReportIncome {
                diezmos: Money::new(1_000_000).unwrap(),
                ofrendas: Money::new(500_000).unwrap(),
                ..Default::default()
            },
            designated: ReportDesignated::default(),
            expenses: ReportExpenses::default(),
            deposit: ReportDeposit {
                number: Some("123".to_string()),
                date: None,
                amount: Money::new(100_000).unwrap(),
            },
            attendance: ReportAttendance::default(),
            observations: None,
            donors: vec![DonorInput {
                first_name: "Ana".to_string(),
                last_name: "Perez".to_string(),
                document: None,
                amount: Money::new(1_000_000).unwrap(),
            }],
        }
    }

    #[tokio::test]
    async fn full_approval_posts_package_and_marks_processed() {
        let (engine, treasurer, church_id) = setup().await;
        let report = engine.create(&treasurer, input(church_id)).await.unwrap();
        let report = engine.submit(&treasurer, report.id).await.unwrap();
        assert_eq!(report.status, crate::domain::ReportStatus::Submitted);

        let national_treasurer = Principal {
            id: Uuid::new_v4(),
            email: "nt@example.org".to_string(),
            full_name: "Tesorero Nacional".to_string(),
            role: Role::NationalTreasurer,
            church_scope: None,
            active: true,
        };
        let approved = engine.approve(&national_treasurer, report.id).await.unwrap();
        assert_eq!(approved.status, crate::domain::ReportStatus::Approved);
        assert!(approved.processing.transactions_posted);
    }

    #[tokio::test]
    async fn approve_retried_after_package_already_posted_does_not_double_post() {
        let (engine, treasurer, church_id) = setup().await;
        let report = engine.create(&treasurer, input(church_id)).await.unwrap();
        let report = engine.submit(&treasurer, report.id).await.unwrap();

        let national_treasurer = Principal {
            id: Uuid::new_v4(),
            email: "nt@example.org".to_string(),
            full_name: "Tesorero Nacional".to_string(),
            role: Role::NationalTreasurer,
            church_scope: None,
            active: true,
        };

        // Simulates a crash between the ledger post and the status
        // stamp on a prior attempt: the package is already posted, but
        // the report row is still `submitted`.
        let general = engine.fund_id(codes::FONDO_GENERAL).await.unwrap();
        engine
            .ledger
            .post_package(crate::ledger::PackageInput {
                date: chrono::Utc::now().date_naive(),
                report_id: Some(report.id),
                event_id: None,
                created_by: FundTransaction::SYSTEM_ACTOR.to_string(),
                allow_overdraw: false,
                entries: vec![crate::ledger::PackageEntry {
                    fund_id: general,
                    concept: "pre-existing package".to_string(),
                    amount_in: Money::new(1_500_000).unwrap(),
                    amount_out: Money::ZERO,
                    church_id: Some(church_id),
                    provider_id: None,
                    link_group: None,
                }],
            })
            .await
            .unwrap();
        let balance_before_retry = engine.ledger.balance(general).await.unwrap();

        let approved = engine.approve(&national_treasurer, report.id).await.unwrap();
        assert_eq!(approved.status, crate::domain::ReportStatus::Approved);

        // approve() must have skipped building and posting a second
        // package, so the balance is unchanged from the pre-existing one.
        assert_eq!(engine.ledger.balance(general).await.unwrap(), balance_before_retry);
    }

    #[tokio::test]
    async fn treasurer_cannot_approve_own_report() {
        let (engine, treasurer, church_id) = setup().await;
        let report = engine.create(&treasurer, input(church_id)).await.unwrap();
        let report = engine.submit(&treasurer, report.id).await.unwrap();
        let err = engine.approve(&treasurer, report.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Forbidden));
    }
}
