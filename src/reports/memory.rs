//! In-memory `ReportStore` fake used by contract tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Report, ReportDonor, ReportInput, ReportProcessing, ReportStatus, ReportSubmission,
    SubmissionSource, SubmissionType,
};
use crate::error::{CoreError, Result};

use super::{compute_derived, ReportStore};

#[derive(Default)]
struct State {
    reports: HashMap<Uuid, Report>,
    donors: HashMap<Uuid, Vec<ReportDonor>>,
}

#[derive(Default)]
pub struct InMemoryReportStore {
    state: Mutex<State>,
}

impl InMemoryReportStore {
    pub fn new() -> InMemoryReportStore {
        InMemoryReportStore::default()
    }

    fn get(state: &State, id: Uuid) -> Result<Report> {
        state.reports.get(&id).cloned().ok_or_else(|| CoreError::NotFound {
            kind: "Report".to_string(),
            id: id.to_string(),
        })
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn create(&self, input: ReportInput) -> Result<Report> {
        let mut state = self.state.lock().expect("report store mutex poisoned");
        if state
            .reports
            .values()
            .any(|r| r.natural_key() == (input.church_id, input.month, input.year))
        {
            let existing = state
                .reports
                .values()
                .find(|r| r.natural_key() == (input.church_id, input.month, input.year))
                .expect("just checked membership");
            return Err(CoreError::AlreadyExists {
                kind: "Report".to_string(),
                id: existing.id.to_string(),
            });
        }

        let derived = compute_derived(&input);
        let id = Uuid::new_v4();
        let report = Report {
            id,
            church_id: input.church_id,
            month: input.month,
            year: input.year,
            status: ReportStatus::Draft,
            income: input.income,
            designated: input.designated,
            expenses: input.expenses,
            deposit: input.deposit,
            attendance: input.attendance,
            derived,
            observations: input.observations,
            submission: None,
            processing: ReportProcessing::default(),
            attachments: Default::default(),
        };
        let donors = input
            .donors
            .into_iter()
            .map(|d| ReportDonor {
                id: Uuid::new_v4(),
                report_id: id,
                first_name: d.first_name,
                last_name: d.last_name,
                document: d.document,
                amount: d.amount,
            })
            .collect();
        state.reports.insert(id, report.clone());
        state.donors.insert(id, donors);
        Ok(report)
    }

    async fn replace_inputs(&self, id: Uuid, input: ReportInput) -> Result<Report> {
        let mut state = self.state.lock().expect("report store mutex poisoned");
        let mut report = Self::get(&state, id)?;
        let derived = compute_derived(&input);
        report.income = input.income;
        report.designated = input.designated;
        report.expenses = input.expenses;
        report.deposit = input.deposit;
        report.attendance = input.attendance;
        report.observations = input.observations;
        report.derived = derived;
        let donors = input
            .donors
            .into_iter()
            .map(|d| ReportDonor {
                id: Uuid::new_v4(),
                report_id: id,
                first_name: d.first_name,
                last_name: d.last_name,
                document: d.document,
                amount: d.amount,
            })
            .collect();
        state.donors.insert(id, donors);
        state.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Report>> {
        let state = self.state.lock().expect("report store mutex poisoned");
        Ok(state.reports.get(&id).cloned())
    }

    async fn find_by_natural_key(&self, church_id: Uuid, month: u32, year: i32) -> Result<Option<Report>> {
        let state = self.state.lock().expect("report store mutex poisoned");
        Ok(state
            .reports
            .values()
            .find(|r| r.natural_key() == (church_id, month, year))
            .cloned())
    }

    async fn list_donors(&self, report_id: Uuid) -> Result<Vec<ReportDonor>> {
        let state = self.state.lock().expect("report store mutex poisoned");
        Ok(state.donors.get(&report_id).cloned().unwrap_or_default())
    }

    async fn list_for_church(&self, church_id: Uuid) -> Result<Vec<Report>> {
        let state = self.state.lock().expect("report store mutex poisoned");
        Ok(state.reports.values().filter(|r| r.church_id == church_id).cloned().collect())
    }

    async fn set_status(&self, id: Uuid, status: ReportStatus) -> Result<Report> {
        let mut state = self.state.lock().expect("report store mutex poisoned");
        let mut report = Self::get(&state, id)?;
        report.status = status;
        state.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn mark_submitted(&self, id: Uuid, submitted_by: Uuid) -> Result<Report> {
        let mut state = self.state.lock().expect("report store mutex poisoned");
        let mut report = Self::get(&state, id)?;
        report.status = ReportStatus::Submitted;
        report.submission = Some(ReportSubmission {
            submission_type: SubmissionType::Online,
            source: SubmissionSource::ChurchPortal,
            submitted_by,
            submitted_at: Utc::now(),
        });
        state.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn mark_processed(&self, id: Uuid, processed_by: Uuid) -> Result<Report> {
        let mut state = self.state.lock().expect("report store mutex poisoned");
        let mut report = Self::get(&state, id)?;
        report.status = ReportStatus::Approved;
        report.processing = ReportProcessing {
            processed_by: Some(processed_by),
            processed_at: Some(Utc::now()),
            transactions_posted: true,
        };
        state.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn clear_processing(&self, id: Uuid) -> Result<Report> {
        let mut state = self.state.lock().expect("report store mutex poisoned");
        let mut report = Self::get(&state, id)?;
        report.status = ReportStatus::PendingRevision;
        report.processing = ReportProcessing::default();
        state.reports.insert(id, report.clone());
        Ok(report)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().expect("report store mutex poisoned");
        state.reports.remove(&id);
        state.donors.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReportAttendance, ReportDeposit, ReportDesignated, ReportExpenses, ReportIncome};

    fn input(church_id: Uuid) -> ReportInput {
        ReportInput {
            church_id,
            month: 3,
            year: 2025,
            income: ReportIncome::default(),
            designated: ReportDesignated::default(),
            expenses: ReportExpenses::default(),
            deposit: ReportDeposit::default(),
            attendance: ReportAttendance::default(),
            observations: None,
            donors: vec![],
        }
    }

    #[tokio::test]
    async fn duplicate_natural_key_returns_already_exists_with_first_id() {
        let store = InMemoryReportStore::new();
        let church = Uuid::new_v4();
        let first = store.create(input(church)).await.unwrap();
        let err = store.create(input(church)).await.unwrap_err();
        match err {
            CoreError::AlreadyExists { id, .. } => assert_eq!(id, first.id.to_string()),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }
}
