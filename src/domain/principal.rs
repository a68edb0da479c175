//! Principals (users), roles, and fund-director assignments.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seven-role hierarchy with monotonic levels 7..1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Secretary = 1,
    ChurchManager = 2,
    Treasurer = 3,
    Pastor = 4,
    FundDirector = 5,
    NationalTreasurer = 6,
    Admin = 7,
}

impl Role {
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Roles that must carry a `church_scope` and are confined to it.
    pub fn is_church_scoped(self) -> bool {
        matches!(
            self,
            Role::Pastor | Role::Treasurer | Role::ChurchManager | Role::Secretary
        )
    }

    /// Roles that are forbidden from carrying a `church_scope`.
    pub fn forbids_church_scope(self) -> bool {
        matches!(self, Role::Admin | Role::NationalTreasurer | Role::FundDirector)
    }

    pub fn at_least(self, min: Role) -> bool {
        self.level() >= min.level()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub church_scope: Option<Uuid>,
    pub active: bool,
}

impl Principal {
    /// Validates the church-scope presence/absence invariant.
    pub fn validate_scope(&self) -> Result<(), String> {
        if self.role.is_church_scoped() && self.church_scope.is_none() {
            return Err(format!("role {:?} requires a church_scope", self.role));
        }
        if self.role.forbids_church_scope() && self.church_scope.is_some() {
            return Err(format!("role {:?} must not carry a church_scope", self.role));
        }
        Ok(())
    }
}

/// Grants a `fund_director` principal authority over a fund/church pair.
/// `fund_id = None` means all funds; `church_scope = None` means all
/// churches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundDirectorAssignment {
    pub principal_id: Uuid,
    pub fund_id: Option<Uuid>,
    pub church_scope: Option<Uuid>,
}

/// Creation input for a [`FundDirectorAssignment`]; the triple is
/// compared with ordinary equality (nulls included), not wildcard
/// matching, when enforcing uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssignmentInput {
    pub principal_id: Uuid,
    pub fund_id: Option<Uuid>,
    pub church_scope: Option<Uuid>,
}

impl FundDirectorAssignment {
    pub fn covers_fund(&self, fund_id: Uuid) -> bool {
        self.fund_id.map_or(true, |f| f == fund_id)
    }

    pub fn covers_church(&self, church_id: Option<Uuid>) -> bool {
        match (self.church_scope, church_id) {
            (None, _) => true,
            (Some(scope), Some(target)) => scope == target,
            (Some(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_levels_are_monotonic() {
        assert!(Role::Admin.level() > Role::NationalTreasurer.level());
        assert!(Role::NationalTreasurer.level() > Role::FundDirector.level());
        assert!(Role::FundDirector.level() > Role::Pastor.level());
        assert!(Role::Pastor.level() > Role::Treasurer.level());
        assert!(Role::Treasurer.level() > Role::ChurchManager.level());
        assert!(Role::ChurchManager.level() > Role::Secretary.level());
    }

    #[test]
    fn church_scope_invariant_enforced() {
        let mut p = Principal {
            id: Uuid::new_v4(),
            email: "a@b.org".into(),
            full_name: "A".into(),
            role: Role::Treasurer,
            church_scope: None,
            active: true,
        };
        assert!(p.validate_scope().is_err());
        p.church_scope = Some(Uuid::new_v4());
        assert!(p.validate_scope().is_ok());

        p.role = Role::Admin;
        assert!(p.validate_scope().is_err());
        p.church_scope = None;
        assert!(p.validate_scope().is_ok());
    }

    #[test]
    fn assignment_null_fund_means_all_funds() {
        let assignment = FundDirectorAssignment {
            principal_id: Uuid::new_v4(),
            fund_id: None,
            church_scope: None,
        };
        assert!(assignment.covers_fund(Uuid::new_v4()));
        assert!(assignment.covers_church(Some(Uuid::new_v4())));
    }
}
