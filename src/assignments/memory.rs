//! In-memory `AssignmentStore` fake used by contract tests.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CreateAssignmentInput, FundDirectorAssignment};
use crate::error::{CoreError, Result};

use super::AssignmentStore;

#[derive(Default)]
pub struct InMemoryAssignmentStore {
    rows: Mutex<Vec<FundDirectorAssignment>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> InMemoryAssignmentStore {
        InMemoryAssignmentStore::default()
    }
}

fn same_triple(a: &FundDirectorAssignment, principal_id: Uuid, fund_id: Option<Uuid>, church_scope: Option<Uuid>) -> bool {
    a.principal_id == principal_id && a.fund_id == fund_id && a.church_scope == church_scope
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn create(&self, input: CreateAssignmentInput) -> Result<FundDirectorAssignment> {
        let mut rows = self.rows.lock().expect("assignment store mutex poisoned");
        if rows
            .iter()
            .any(|a| same_triple(a, input.principal_id, input.fund_id, input.church_scope))
        {
            return Err(CoreError::UniqueViolation(format!(
                "assignment already exists for principal {} (fund {:?}, church {:?})",
                input.principal_id, input.fund_id, input.church_scope
            )));
        }
        let assignment = FundDirectorAssignment {
            principal_id: input.principal_id,
            fund_id: input.fund_id,
            church_scope: input.church_scope,
        };
        rows.push(assignment.clone());
        Ok(assignment)
    }

    async fn list_for_principal(&self, principal_id: Uuid) -> Result<Vec<FundDirectorAssignment>> {
        Ok(self
            .rows
            .lock()
            .expect("assignment store mutex poisoned")
            .iter()
            .filter(|a| a.principal_id == principal_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, principal_id: Uuid, fund_id: Option<Uuid>, church_scope: Option<Uuid>) -> Result<()> {
        let mut rows = self.rows.lock().expect("assignment store mutex poisoned");
        rows.retain(|a| !same_triple(a, principal_id, fund_id, church_scope));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_triple_rejected() {
        let store = InMemoryAssignmentStore::new();
        let principal_id = Uuid::new_v4();
        let input = CreateAssignmentInput {
            principal_id,
            fund_id: None,
            church_scope: None,
        };
        store.create(input.clone()).await.unwrap();
        assert!(store.create(input).await.is_err());
    }

    #[tokio::test]
    async fn list_for_principal_filters_other_principals() {
        let store = InMemoryAssignmentStore::new();
        let director = Uuid::new_v4();
        let other = Uuid::new_v4();
        store
            .create(CreateAssignmentInput {
                principal_id: director,
                fund_id: Some(Uuid::new_v4()),
                church_scope: None,
            })
            .await
            .unwrap();
        store
            .create(CreateAssignmentInput {
                principal_id: other,
                fund_id: None,
                church_scope: None,
            })
            .await
            .unwrap();
        let assignments = store.list_for_principal(director).await.unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].principal_id, director);
    }
}
