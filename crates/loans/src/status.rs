use serde::{Deserialize, Serialize};

use shelfwise_core::{DomainError, DomainResult};

/// Which loans a listing should include.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatusFilter {
    #[default]
    All,
    Active,
    Returned,
}

impl LoanStatusFilter {
    pub fn parse(input: &str) -> DomainResult<Self> {
        match input.trim().to_lowercase().as_str() {
            "" | "all" | "todos" => Ok(Self::All),
            "active" | "activos" => Ok(Self::Active),
            "returned" | "devueltos" => Ok(Self::Returned),
            other => Err(DomainError::validation(format!(
                "unknown loan status filter: {other}"
            ))),
        }
    }

    pub fn admits(self, closed: bool) -> bool {
        match self {
            Self::All => true,
            Self::Active => !closed,
            Self::Returned => closed,
        }
    }
}
