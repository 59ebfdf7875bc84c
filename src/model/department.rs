use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    pub id: u64,
    pub name: String,
    /// Employee who approves leave for this department
    pub lead_id: Option<u64>,
}
