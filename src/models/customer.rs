use serde::{Deserialize, Serialize};

/// Identity record, owned by an external auth layer. The engine only
/// checks existence and appointment ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}
