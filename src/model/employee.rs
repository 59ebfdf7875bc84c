use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "department_id": 10,
        "designation_id": 3,
        "location_id": 1,
        "gender": "male",
        "marital_status": "single",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = 3, nullable = true)]
    pub designation_id: Option<u64>,

    #[schema(example = 1, nullable = true)]
    pub location_id: Option<u64>,

    #[schema(example = "male", nullable = true)]
    pub gender: Option<String>,

    #[schema(example = "single", nullable = true)]
    pub marital_status: Option<String>,

    #[schema(example = "active")]
    pub status: String,
}

// Mirrors the SQL the MySQL store uses for names and activity
#[cfg(test)]
impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}
