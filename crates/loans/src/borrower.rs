use serde::{Deserialize, Serialize};

use shelfwise_catalog::text::title_case;
use shelfwise_core::{DomainError, DomainResult};

/// The student taking a copy home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerInfo {
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
}

impl BorrowerInfo {
    /// Validate and title-case the names ("  juan  PÉREZ" -> "Juan Pérez").
    pub fn normalized(self) -> DomainResult<Self> {
        let first_name = name_part("first name", &self.first_name)?;
        let last_name = name_part("last name", &self.last_name)?;
        let grade = self.grade.trim().to_string();
        if grade.is_empty() {
            return Err(DomainError::validation("borrower grade is required"));
        }
        Ok(Self {
            first_name,
            last_name,
            grade,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn name_part(field: &str, value: &str) -> DomainResult<String> {
    let value = title_case(value);
    if value.is_empty() {
        return Err(DomainError::validation(format!("borrower {field} is required")));
    }
    if !value.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(DomainError::validation(format!(
            "borrower {field} may only contain letters and spaces"
        )));
    }
    Ok(value)
}
