//! Churches — the ~22 local congregations plus the national org.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Church {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub primary_pastor_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub tax_id: Option<String>,
    pub active: bool,
}

/// Input accepted from a caller creating a church. Admin-only — the
/// action matrix does not list `church.create` explicitly; it falls
/// under `user.manage`-adjacent admin authority, since churches are
/// created by an admin and immutable for history once referenced.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChurchInput {
    pub name: String,
    pub city: String,
    pub primary_pastor_name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub tax_id: Option<String>,
}
