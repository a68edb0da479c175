//! Domain entities.
//!
//! Every entity in the data model gets an explicit Rust type here;
//! mutation inputs carry no derived fields, so a client attempting to
//! set one simply has no field to set.

pub mod audit;
pub mod church;
pub mod event;
pub mod fund;
pub mod principal;
pub mod provider;
pub mod report;
pub mod transaction;

pub use audit::{ActivityLog, NotificationKind, NotificationQueue};
pub use church::{Church, CreateChurchInput};
pub use event::{
    CreateEventInput, Event, EventLineItem, EventStatus, EventTotals, LineItemCategory,
    LineItemInput,
};
pub use fund::{CreateFundInput, Fund, FundType};
pub use principal::{CreateAssignmentInput, FundDirectorAssignment, Principal, Role};
pub use provider::{
    CreateProviderInput, Provider, ProviderCategory, ProviderContact, ProviderIdKind,
    UpdateProviderInput,
};
pub use report::{
    DonorInput, Report, ReportAttachments, ReportAttendance, ReportDeposit, ReportDerived,
    ReportDesignated, ReportDonor, ReportExpenses, ReportIncome, ReportInput, ReportProcessing,
    ReportStatus, ReportSubmission, SubmissionSource, SubmissionType,
};
pub use transaction::FundTransaction;
