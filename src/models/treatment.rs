use serde::{Deserialize, Serialize};

/// Catalog entry, owned by an external catalog service. The engine only
/// reads `duration_minutes` and `active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    pub name: String,
    pub duration_minutes: i64,
    pub active: bool,
}
