//! In-memory `ChurchStore` fake used by contract tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Church, CreateChurchInput};
use crate::error::{CoreError, Result};

use super::ChurchStore;

#[derive(Default)]
pub struct InMemoryChurchStore {
    rows: Mutex<HashMap<Uuid, Church>>,
}

impl InMemoryChurchStore {
    pub fn new() -> InMemoryChurchStore {
        InMemoryChurchStore::default()
    }
}

#[async_trait]
impl ChurchStore for InMemoryChurchStore {
    async fn create(&self, input: CreateChurchInput) -> Result<Church> {
        let mut rows = self.rows.lock().expect("church store mutex poisoned");
        if rows.values().any(|c| c.name == input.name) {
            return Err(CoreError::UniqueViolation(format!(
                "church name already exists: {}",
                input.name
            )));
        }
        let church = Church {
            id: Uuid::new_v4(),
            name: input.name,
            city: input.city,
            primary_pastor_name: input.primary_pastor_name,
            contact_phone: input.contact_phone,
            contact_email: input.contact_email,
            tax_id: input.tax_id,
            active: true,
        };
        rows.insert(church.id, church.clone());
        Ok(church)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Church>> {
        Ok(self.rows.lock().expect("church store mutex poisoned").get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Church>> {
        Ok(self
            .rows
            .lock()
            .expect("church store mutex poisoned")
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Church>> {
        Ok(self.rows.lock().expect("church store mutex poisoned").values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str) -> CreateChurchInput {
        CreateChurchInput {
            name: name.to_string(),
            city: "Asuncion".to_string(),
            primary_pastor_name: "Pastor".to_string(),
            contact_phone: "000".to_string(),
            contact_email: "pastor@example.org".to_string(),
            tax_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let store = InMemoryChurchStore::new();
        store.create(input("Iglesia Central")).await.unwrap();
        assert!(store.create(input("Iglesia Central")).await.is_err());
    }
}
