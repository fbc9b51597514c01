//! Request/response DTOs and small parsing helpers for the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfwise_auth::{Permission, Role};
use shelfwise_catalog::{CatalogFilter, CatalogItemPatch, DeleteMode, ItemStatus};
use shelfwise_core::{DomainError, DomainResult, UserId};
use shelfwise_loans::{BorrowerInfo, Loan, LoanSnapshot, LoanStatusFilter};

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /catalog/items`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub min_quantity: Option<i64>,
}

impl CatalogSearchQuery {
    pub fn into_filter(self) -> DomainResult<CatalogFilter> {
        Ok(CatalogFilter {
            title: non_blank(self.title),
            author: non_blank(self.author),
            subject: non_blank(self.subject),
            status: parse_status(self.status)?,
            min_quantity: self.min_quantity,
        })
    }
}

/// Query string of `GET /catalog/view`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogViewQuery {
    pub subject: Option<String>,
    pub status: Option<String>,
}

impl CatalogViewQuery {
    pub fn parts(self) -> DomainResult<(Option<String>, Option<ItemStatus>)> {
        Ok((non_blank(self.subject), parse_status(self.status)?))
    }
}

/// Body of `PUT /catalog/items/:id`: the fields to change plus the version
/// the client last read (omit to overwrite regardless).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub expected_version: Option<u64>,
    #[serde(flatten)]
    pub patch: CatalogItemPatch,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteItemQuery {
    pub mode: Option<String>,
}

impl DeleteItemQuery {
    /// Defaults to removing a single copy.
    pub fn mode(&self) -> DomainResult<DeleteMode> {
        match self.mode.as_deref().map(str::trim) {
            None | Some("") => Ok(DeleteMode::One),
            Some(mode) => DeleteMode::parse(mode),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub item_id: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
}

impl CheckoutRequest {
    pub fn borrower(&self) -> BorrowerInfo {
        BorrowerInfo {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            grade: self.grade.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoanListQuery {
    pub status: Option<String>,
}

impl LoanListQuery {
    pub fn filter(&self) -> DomainResult<LoanStatusFilter> {
        LoanStatusFilter::parse(self.status.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveLoansQuery {
    pub sort: Option<String>,
}

impl ActiveLoansQuery {
    pub fn sort_by_due(&self) -> bool {
        self.sort
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("due"))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub principal_id: UserId,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

/// A loan plus its overdue flag at response time.
#[derive(Debug, Serialize)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: LoanSnapshot,
    pub overdue: bool,
}

impl LoanDetail {
    pub fn new(loan: &Loan, now: DateTime<Utc>) -> Self {
        Self {
            loan: loan.snapshot(),
            overdue: loan.is_overdue(now),
        }
    }
}

/// The signed-in user's own view: identity plus the loans they registered.
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub principal_id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub roles: Vec<Role>,
    pub open_loan_titles: Vec<String>,
    pub has_overdue_loans: bool,
}

// -------------------------
// Helpers
// -------------------------

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_status(value: Option<String>) -> DomainResult<Option<ItemStatus>> {
    non_blank(value).map(|s| ItemStatus::parse(&s)).transpose()
}

pub fn parse_id<T>(value: &str) -> DomainResult<T>
where
    T: core::str::FromStr<Err = DomainError>,
{
    value.trim().parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwise_core::CatalogItemId;

    #[test]
    fn search_query_ignores_blank_fields() {
        let filter = CatalogSearchQuery {
            title: Some("  ".into()),
            status: Some("disponible".into()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.title, None);
        assert_eq!(filter.status, Some(ItemStatus::Available));
    }

    #[test]
    fn delete_mode_defaults_to_one() {
        assert_eq!(DeleteItemQuery::default().mode().unwrap(), DeleteMode::One);
        let all = DeleteItemQuery {
            mode: Some("all".into()),
        };
        assert_eq!(all.mode().unwrap(), DeleteMode::All);
        let bad = DeleteItemQuery {
            mode: Some("some".into()),
        };
        assert!(bad.mode().is_err());
    }

    #[test]
    fn update_request_flattens_the_patch() {
        let req: UpdateItemRequest =
            serde_json::from_str(r#"{"expected_version": 3, "quantity": 7, "title": "Mafalda"}"#)
                .unwrap();
        assert_eq!(req.expected_version, Some(3));
        assert_eq!(req.patch.quantity, Some(7));
        assert_eq!(req.patch.title.as_deref(), Some("Mafalda"));
    }

    #[test]
    fn ids_are_parsed_or_rejected() {
        let id = CatalogItemId::new();
        assert_eq!(parse_id::<CatalogItemId>(&id.to_string()).unwrap(), id);
        match parse_id::<CatalogItemId>("nope") {
            Err(DomainError::InvalidId(_)) => {}
            other => panic!("expected invalid id, got {other:?}"),
        }
    }

    #[test]
    fn only_due_sorts_by_due_date() {
        let q = ActiveLoansQuery {
            sort: Some("DUE".into()),
        };
        assert!(q.sort_by_due());
        assert!(!ActiveLoansQuery::default().sort_by_due());
    }
}
