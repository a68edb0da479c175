//! Authorization Kernel (C1).
//!
//! `authorize` is a pure function over a static action/role matrix, so
//! the decision procedure is testable without a database or transport
//! layer. It never panics — denials are returned as data.

use uuid::Uuid;

use crate::domain::{FundDirectorAssignment, Principal, Role};

/// Verb over a target kind, named `resource.verb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ReportCreate,
    ReportEdit,
    ReportSubmit,
    ReportApprove,
    ReportReject,
    ReportDelete,
    ReportView,
    EventCreate,
    EventEdit,
    EventSubmit,
    EventApprove,
    EventReject,
    EventView,
    FundTransfer,
    FundView,
    ProviderCreate,
    ProviderUpdate,
    ProviderDelete,
    ProviderView,
    UserManage,
}

impl Action {
    /// Minimum role level required before scope predicates apply, per
    /// the action matrix.
    fn min_role(self) -> Role {
        use Action::*;
        match self {
            ReportCreate | ReportEdit | ReportSubmit => Role::Treasurer,
            ReportApprove | ReportReject => Role::NationalTreasurer,
            ReportView => Role::Secretary,
            ReportDelete => Role::Admin,
            EventCreate | EventEdit | EventSubmit => Role::FundDirector,
            EventApprove | EventReject => Role::Treasurer,
            EventView => Role::Secretary,
            FundTransfer => Role::Treasurer,
            FundView => Role::Secretary,
            ProviderCreate => Role::Secretary,
            ProviderUpdate | ProviderDelete => Role::Treasurer,
            ProviderView => Role::Secretary,
            UserManage => Role::Admin,
        }
    }

    /// Whether this action requires the report/event to be in an
    /// editable status (`draft`/`pending_revision`) for church-scoped
    /// and fund-director actors.
    pub fn requires_editable_status(self) -> bool {
        matches!(
            self,
            Action::ReportEdit | Action::EventEdit
        )
    }
}

/// The entity an action is performed against, reduced to the fields
/// the authorization kernel needs to evaluate scope.
#[derive(Debug, Clone)]
pub struct Target {
    pub church_id: Option<Uuid>,
    pub fund_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub status_is_editable: bool,
}

impl Target {
    pub fn church(church_id: Uuid) -> Target {
        Target {
            church_id: Some(church_id),
            fund_id: None,
            created_by: None,
            status_is_editable: true,
        }
    }

    pub fn fund(fund_id: Uuid) -> Target {
        Target {
            church_id: None,
            fund_id: Some(fund_id),
            created_by: None,
            status_is_editable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzDenial {
    NotAuthenticated,
    Forbidden,
    OutOfScope,
}

pub type AuthzDecision = Result<(), AuthzDenial>;

/// Evaluates `(principal, action, target) -> allow/deny` in order:
/// active check, admin bypass, role-level precondition, scope
/// predicate.
pub fn authorize(
    principal: &Principal,
    action: Action,
    target: &Target,
    assignments: &[FundDirectorAssignment],
) -> AuthzDecision {
    if !principal.active {
        return Err(AuthzDenial::NotAuthenticated);
    }

    if principal.role == Role::Admin {
        return Ok(());
    }

    if principal.role.level() < action.min_role().level() {
        return Err(AuthzDenial::Forbidden);
    }

    evaluate_scope(principal, action, target, assignments)
}

fn evaluate_scope(
    principal: &Principal,
    action: Action,
    target: &Target,
    assignments: &[FundDirectorAssignment],
) -> AuthzDecision {
    match principal.role {
        Role::Pastor | Role::Treasurer | Role::ChurchManager | Role::Secretary => {
            let Some(target_church) = target.church_id else {
                return Err(AuthzDenial::OutOfScope);
            };
            if principal.church_scope != Some(target_church) {
                return Err(AuthzDenial::OutOfScope);
            }
            if action.requires_editable_status() && !target.status_is_editable {
                return Err(AuthzDenial::Forbidden);
            }
            Ok(())
        }
        Role::FundDirector => {
            let Some(target_fund) = target.fund_id else {
                return Err(AuthzDenial::OutOfScope);
            };
            let covered = assignments.iter().any(|a| {
                a.principal_id == principal.id
                    && a.covers_fund(target_fund)
                    && a.covers_church(target.church_id)
            });
            if !covered {
                return Err(AuthzDenial::OutOfScope);
            }
            if matches!(action, Action::EventEdit) && target.status_is_editable {
                if target.created_by != Some(principal.id) {
                    return Err(AuthzDenial::OutOfScope);
                }
            }
            Ok(())
        }
        Role::NationalTreasurer => {
            // Any church; confined to fund/event actions plus read-only
            // report access, per the action matrix.
            match action {
                Action::ReportApprove | Action::ReportReject | Action::ReportView => Ok(()),
                Action::EventApprove
                | Action::EventReject
                | Action::EventView
                | Action::FundTransfer
                | Action::FundView => Ok(()),
                _ => Err(AuthzDenial::Forbidden),
            }
        }
        Role::Admin => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, church_scope: Option<Uuid>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "user@example.org".into(),
            full_name: "Test User".into(),
            role,
            church_scope,
            active: true,
        }
    }

    #[test]
    fn inactive_principal_is_not_authenticated() {
        let mut p = principal(Role::Admin, None);
        p.active = false;
        let church = Uuid::new_v4();
        assert_eq!(
            authorize(&p, Action::ReportView, &Target::church(church), &[]),
            Err(AuthzDenial::NotAuthenticated)
        );
    }

    #[test]
    fn admin_bypasses_all_checks() {
        let admin = principal(Role::Admin, None);
        let church = Uuid::new_v4();
        assert_eq!(
            authorize(&admin, Action::ReportApprove, &Target::church(church), &[]),
            Ok(())
        );
    }

    #[test]
    fn treasurer_confined_to_own_church() {
        let church = Uuid::new_v4();
        let other_church = Uuid::new_v4();
        let treasurer = principal(Role::Treasurer, Some(church));

        assert_eq!(
            authorize(
                &treasurer,
                Action::ReportCreate,
                &Target::church(church),
                &[]
            ),
            Ok(())
        );
        assert_eq!(
            authorize(
                &treasurer,
                Action::ReportCreate,
                &Target::church(other_church),
                &[]
            ),
            Err(AuthzDenial::OutOfScope)
        );
    }

    #[test]
    fn treasurer_cannot_edit_non_editable_report() {
        let church = Uuid::new_v4();
        let treasurer = principal(Role::Treasurer, Some(church));
        let mut target = Target::church(church);
        target.status_is_editable = false;
        assert_eq!(
            authorize(&treasurer, Action::ReportEdit, &target, &[]),
            Err(AuthzDenial::Forbidden)
        );
    }

    #[test]
    fn fund_director_requires_matching_assignment() {
        let fund_a = Uuid::new_v4();
        let fund_b = Uuid::new_v4();
        let director = principal(Role::FundDirector, None);
        let assignments = vec![FundDirectorAssignment {
            principal_id: director.id,
            fund_id: Some(fund_a),
            church_scope: None,
        }];

        assert_eq!(
            authorize(
                &director,
                Action::EventCreate,
                &Target::fund(fund_a),
                &assignments
            ),
            Ok(())
        );
        assert_eq!(
            authorize(
                &director,
                Action::EventCreate,
                &Target::fund(fund_b),
                &assignments
            ),
            Err(AuthzDenial::OutOfScope)
        );
    }

    #[test]
    fn fund_director_edit_restricted_to_own_draft_events() {
        let fund = Uuid::new_v4();
        let director = principal(Role::FundDirector, None);
        let other = Uuid::new_v4();
        let assignments = vec![FundDirectorAssignment {
            principal_id: director.id,
            fund_id: None,
            church_scope: None,
        }];
        let mut target = Target::fund(fund);
        target.created_by = Some(other);
        target.status_is_editable = true;

        assert_eq!(
            authorize(&director, Action::EventEdit, &target, &assignments),
            Err(AuthzDenial::OutOfScope)
        );

        target.created_by = Some(director.id);
        assert_eq!(
            authorize(&director, Action::EventEdit, &target, &assignments),
            Ok(())
        );
    }

    #[test]
    fn national_treasurer_cannot_create_reports() {
        let nt = principal(Role::NationalTreasurer, None);
        let church = Uuid::new_v4();
        assert_eq!(
            authorize(&nt, Action::ReportCreate, &Target::church(church), &[]),
            Err(AuthzDenial::Forbidden)
        );
        assert_eq!(
            authorize(&nt, Action::ReportApprove, &Target::church(church), &[]),
            Ok(())
        );
    }

    #[test]
    fn role_below_min_level_is_forbidden() {
        let secretary = principal(Role::Secretary, Some(Uuid::new_v4()));
        let church = secretary.church_scope.unwrap();
        assert_eq!(
            authorize(
                &secretary,
                Action::ReportApprove,
                &Target::church(church),
                &[]
            ),
            Err(AuthzDenial::Forbidden)
        );
    }
}
