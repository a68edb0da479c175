//! End-to-end scenarios against the in-memory fakes . These
//! exercise the same service structs production wires over Postgres,
//! just swapping `InMemory*` stores in for `Pg*` ones, so they run
//! without a live database.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use treasury_core::assignments::{AssignmentStore, InMemoryAssignmentStore};
use treasury_core::audit::InMemoryAuditSink;
use treasury_core::churches::{ChurchStore, InMemoryChurchStore};
use treasury_core::domain::fund::codes;
use treasury_core::domain::{
    CreateAssignmentInput, CreateChurchInput, CreateEventInput, CreateFundInput, DonorInput,
    EventStatus, FundType, LineItemCategory, LineItemInput, Principal, ReportDeposit,
    ReportDesignated, ReportExpenses, ReportIncome, ReportInput, ReportStatus, Role,
};
use treasury_core::error::CoreError;
use treasury_core::events::{EventBudgetEngine, InMemoryEventStore};
use treasury_core::ledger::{FundLedger, InMemoryFundLedger, TransferInput};
use treasury_core::money::Money;
use treasury_core::reports::{InMemoryReportStore, ReportEngine};
use treasury_core::seeds;

fn principal(role: Role, church_scope: Option<Uuid>) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        email: "user@example.org".to_string(),
        full_name: "Test User".to_string(),
        role,
        church_scope,
        active: true,
    }
}

async fn fund_id(ledger: &Arc<dyn FundLedger>, code: &str) -> Uuid {
    ledger.find_fund_by_code(code).await.unwrap().unwrap().id
}

async fn build_report_engine() -> (ReportEngine, Arc<dyn FundLedger>, Uuid) {
    let churches: Arc<dyn ChurchStore> = Arc::new(InMemoryChurchStore::new());
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

    let ledger: Arc<dyn FundLedger> = Arc::new(InMemoryFundLedger::new());
    seeds::seed_funds(&ledger).await.unwrap();

    let reports = Arc::new(InMemoryReportStore::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let assignments = Arc::new(InMemoryAssignmentStore::new());
    let engine = ReportEngine::new(reports, ledger.clone(), churches, audit, assignments, Default::default());
    (engine, ledger, church.id)
}

fn report_input_scenario_1(church_id: Uuid) -> ReportInput {
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
            number: Some("1".to_string()),
            date: Some(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()),
            amount: Money::new(100_000).unwrap(),
        },
        attendance: Default::default(),
        observations: None,
        donors: vec![DonorInput {
            first_name: "Ana".to_string(),
            last_name: "Perez".to_string(),
            document: Some("1234".to_string()),
            amount: Money::new(1_000_000).unwrap(),
        }],
    }
}

/// Create and approve a report. `fondo_nacional`
/// is 10% of diezmos, `total_entradas` is the sum of income and
/// designated, and the posted package moves the expected deltas
/// between Fondo General and Fondo Nacional.
#[tokio::test]
async fn scenario_1_create_and_approve_report() {
    let (engine, ledger, church_id) = build_report_engine().await;
    let treasurer = principal(Role::Treasurer, Some(church_id));
    let admin = principal(Role::Admin, None);

    let report = engine
        .create(&treasurer, report_input_scenario_1(church_id))
        .await
        .unwrap();
    assert_eq!(report.derived.fondo_nacional.as_i64(), 100_000);
    assert_eq!(report.derived.total_entradas.as_i64(), 1_500_000);

    let report = engine.submit(&treasurer, report.id).await.unwrap();
    assert_eq!(report.status, ReportStatus::Submitted);

    let general = fund_id(&ledger, codes::FONDO_GENERAL).await;
    let nacional = fund_id(&ledger, codes::FONDO_NACIONAL).await;
    let general_before = ledger.balance(general).await.unwrap();
    let nacional_before = ledger.balance(nacional).await.unwrap();

    let approved = engine.approve(&admin, report.id).await.unwrap();
    assert_eq!(approved.status, ReportStatus::Approved);
    assert!(approved.processing.transactions_posted);

    let general_after = ledger.balance(general).await.unwrap();
    let nacional_after = ledger.balance(nacional).await.unwrap();

    // +1_500_000 in, -100_000 tithe out => net +1_400_000.
    assert_eq!(general_after.as_i64() - general_before.as_i64(), 1_400_000);
    assert_eq!(nacional_after.as_i64() - nacional_before.as_i64(), 100_000);
}

/// Donor mismatch is rejected and the report stays
/// editable (it never leaves `draft`).
#[tokio::test]
async fn scenario_2_donor_mismatch_rejected() {
    let (engine, _ledger, church_id) = build_report_engine().await;
    let treasurer = principal(Role::Treasurer, Some(church_id));

    let mut input = report_input_scenario_1(church_id);
    input.donors[0].amount = Money::new(900_000).unwrap();
    let report = engine.create(&treasurer, input).await.unwrap();

    let err = engine.submit(&treasurer, report.id).await.unwrap_err();
    assert!(matches!(err, CoreError::DonorMismatch { .. }));

    let still_editable = engine
        .edit(&treasurer, report.id, report_input_scenario_1(church_id))
        .await;
    assert!(still_editable.is_ok());
}

/// A transfer that would overdraw the source fund
/// is blocked and both funds are left unchanged.
#[tokio::test]
async fn scenario_3_overdrawn_transfer_blocked() {
    let ledger = Arc::new(InMemoryFundLedger::new());
    let caballeros = ledger
        .create_fund(CreateFundInput {
            name: "Caballeros".to_string(),
            code: codes::CABALLEROS.to_string(),
            fund_type: FundType::Designated,
        })
        .await
        .unwrap();
    let general = ledger
        .create_fund(CreateFundInput {
            name: "Fondo General".to_string(),
            code: codes::FONDO_GENERAL.to_string(),
            fund_type: FundType::General,
        })
        .await
        .unwrap();
    ledger.seed_balance(caballeros.id, Money::new(50_000).unwrap());

    let err = ledger
        .post_transfer(TransferInput {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            source_fund_id: caballeros.id,
            dest_fund_id: general.id,
            amount: Money::new(80_000).unwrap(),
            concept: "Transfer".to_string(),
            created_by: "treasurer".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InsufficientFunds { .. }));

    assert_eq!(ledger.balance(caballeros.id).await.unwrap().as_i64(), 50_000);
    assert_eq!(ledger.balance(general.id).await.unwrap().as_i64(), 0);
}

/// Two submitters racing on the same
/// `(church, month, year)` — the second gets `AlreadyExists` carrying
/// the first report's id.
#[tokio::test]
async fn scenario_4_concurrent_duplicate_report() {
    let (engine, _ledger, church_id) = build_report_engine().await;
    let treasurer = principal(Role::Treasurer, Some(church_id));

    let mut input = report_input_scenario_1(church_id);
    input.month = 8;
    input.year = 2025;

    let first = engine.create(&treasurer, input.clone()).await.unwrap();
    let err = engine.create(&treasurer, input).await.unwrap_err();
    match err {
        CoreError::AlreadyExists { id, .. } => assert_eq!(id, first.id.to_string()),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

/// Approving an event with income/expense line
/// items posts two ledger rows against the event's fund.
#[tokio::test]
async fn scenario_5_event_approval_posts_actuals() {
    let ledger: Arc<dyn FundLedger> = Arc::new(InMemoryFundLedger::new());
    let misiones = ledger
        .create_fund(CreateFundInput {
            name: "Misiones".to_string(),
            code: codes::MISIONES.to_string(),
            fund_type: FundType::Designated,
        })
        .await
        .unwrap();

    let events = Arc::new(InMemoryEventStore::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let assignments: Arc<dyn AssignmentStore> = Arc::new(InMemoryAssignmentStore::new());

    let director = principal(Role::FundDirector, None);
    assignments
        .create(CreateAssignmentInput {
            principal_id: director.id,
            fund_id: Some(misiones.id),
            church_scope: None,
        })
        .await
        .unwrap();

    let engine = EventBudgetEngine::new(events, ledger.clone(), audit, assignments);
    let event = engine
        .create(
            &director,
            CreateEventInput {
                fund_id: misiones.id,
                church_id: None,
                name: "Campaña de Misiones".to_string(),
                event_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            },
        )
        .await
        .unwrap();

    engine
        .add_line_item(
            &director,
            event.id,
            LineItemInput {
                category: LineItemCategory::Income,
                description: "Ofrendas".to_string(),
                budget_amount: Money::new(200_000).unwrap(),
                notes: None,
            },
        )
        .await
        .unwrap();
    engine
        .add_line_item(
            &director,
            event.id,
            LineItemInput {
                category: LineItemCategory::Expense,
                description: "Viajes".to_string(),
                budget_amount: Money::new(150_000).unwrap(),
                notes: None,
            },
        )
        .await
        .unwrap();

    engine.submit(&director, event.id).await.unwrap();
    let treasurer = principal(Role::Treasurer, Some(Uuid::new_v4()));
    let approved = engine.approve(&treasurer, event.id).await.unwrap();
    assert_eq!(approved.status, EventStatus::Approved);

    let balance = ledger.balance(misiones.id).await.unwrap();
    assert_eq!(balance.as_i64(), 50_000);
}

/// Rolling an approved report back to
/// `pending_revision` deletes every system-created row carrying its
/// id and restores pre-approval balances.
#[tokio::test]
async fn scenario_6_reversal_on_rollback() {
    let (engine, ledger, church_id) = build_report_engine().await;
    let treasurer = principal(Role::Treasurer, Some(church_id));
    let admin = principal(Role::Admin, None);

    let report = engine
        .create(&treasurer, report_input_scenario_1(church_id))
        .await
        .unwrap();
    let report = engine.submit(&treasurer, report.id).await.unwrap();

    let general = fund_id(&ledger, codes::FONDO_GENERAL).await;
    let nacional = fund_id(&ledger, codes::FONDO_NACIONAL).await;
    let general_before = ledger.balance(general).await.unwrap();
    let nacional_before = ledger.balance(nacional).await.unwrap();

    let approved = engine.approve(&admin, report.id).await.unwrap();
    assert!(approved.processing.transactions_posted);

    let rolled_back = engine
        .rollback_to_pending_revision(&admin, report.id)
        .await
        .unwrap();
    assert_eq!(rolled_back.status, ReportStatus::PendingRevision);
    assert!(!rolled_back.processing.transactions_posted);

    assert_eq!(ledger.balance(general).await.unwrap(), general_before);
    assert_eq!(ledger.balance(nacional).await.unwrap(), nacional_before);

    let rows = ledger
        .ledger_slice(treasury_core::ledger::LedgerSliceQuery {
            fund_id: None,
            church_id: None,
            from: None,
            to: None,
            limit: 1000,
            offset: 0,
        })
        .await
        .unwrap();
    assert!(rows.iter().all(|tx| tx.report_id != Some(report.id)));
}
