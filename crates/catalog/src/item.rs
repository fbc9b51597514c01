use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfwise_core::{AggregateRoot, CatalogItemId, DomainError, DomainResult};

use crate::provenance::Provenance;
use crate::reconciler;
use crate::text::{blank_to_none, canonical_tag, normalize_text, sentence_case, strip_accents};

/// Upper bound for on-hand quantity of a single catalog record.
pub const MAX_QUANTITY: i64 = 9999;

/// Availability derived from on-hand quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Available,
    OnLoan,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::OnLoan => "on_loan",
        }
    }

    pub fn parse(input: &str) -> DomainResult<Self> {
        match strip_accents(input.trim()).to_lowercase().as_str() {
            "available" | "disponible" => Ok(ItemStatus::Available),
            "on_loan" | "onloan" | "prestado" => Ok(ItemStatus::OnLoan),
            other => Err(DomainError::validation(format!("unknown item status: {other}"))),
        }
    }
}

/// Input for a new catalog record, as submitted by a form or read from a spreadsheet row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemDraft {
    pub catalog_number: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    #[serde(default)]
    pub edition_year: Option<i32>,
    pub quantity: i64,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub sub_subject: Option<String>,
    #[serde(default)]
    pub support_type: Option<String>,
    #[serde(default)]
    pub support_subtype: Option<String>,
    pub provenance: String,
    pub location: String,
    #[serde(default)]
    pub grades: Vec<String>,
    #[serde(default)]
    pub rooms: Vec<String>,
    #[serde(default)]
    pub intake_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retirement_date: Option<DateTime<Utc>>,
}

impl CatalogItemDraft {
    /// Strip accents from every free-text field (spreadsheet input is canonicalized harder than forms).
    pub fn with_accents_stripped(mut self) -> Self {
        let strip = |s: &str| normalize_text(s);
        self.title = strip(&self.title);
        self.author = strip(&self.author);
        self.publisher = strip(&self.publisher);
        self.location = strip(&self.location);
        self.sub_subject = self.sub_subject.as_deref().map(strip);
        self.support_type = self.support_type.as_deref().map(strip);
        self.support_subtype = self.support_subtype.as_deref().map(strip);
        self
    }
}

/// Partial edit of an existing record; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItemPatch {
    pub catalog_number: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub edition_year: Option<Option<i32>>,
    pub quantity: Option<i64>,
    pub subjects: Option<Vec<String>>,
    pub sub_subject: Option<Option<String>>,
    pub support_type: Option<Option<String>>,
    pub support_subtype: Option<Option<String>>,
    pub provenance: Option<String>,
    pub location: Option<String>,
    pub grades: Option<Vec<String>>,
    pub rooms: Option<Vec<String>>,
    pub intake_date: Option<DateTime<Utc>>,
    pub retirement_date: Option<Option<DateTime<Utc>>>,
}

/// Plain-data view of a catalog record, used by stores and API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItemSnapshot {
    pub id: CatalogItemId,
    pub catalog_number: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub edition_year: Option<i32>,
    pub quantity: i64,
    pub subjects: BTreeSet<String>,
    pub sub_subject: Option<String>,
    pub support_type: Option<String>,
    pub support_subtype: Option<String>,
    pub provenance: Provenance,
    pub location: String,
    pub grades: BTreeSet<String>,
    pub rooms: BTreeSet<String>,
    pub status: ItemStatus,
    pub intake_date: DateTime<Utc>,
    pub retirement_date: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Aggregate root: a bibliographic record with an on-hand quantity.
///
/// `quantity` and `status` are private; only [`crate::reconciler`] writes them,
/// and `status == Available` iff `quantity > 0` holds after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    id: CatalogItemId,
    catalog_number: String,
    title: String,
    author: String,
    publisher: String,
    edition_year: Option<i32>,
    quantity: i64,
    subjects: BTreeSet<String>,
    sub_subject: Option<String>,
    support_type: Option<String>,
    support_subtype: Option<String>,
    provenance: Provenance,
    location: String,
    grades: BTreeSet<String>,
    rooms: BTreeSet<String>,
    status: ItemStatus,
    intake_date: DateTime<Utc>,
    retirement_date: Option<DateTime<Utc>>,
    version: u64,
}

/// Validated, normalized descriptive fields (everything except quantity/status).
struct Descriptive {
    catalog_number: String,
    title: String,
    author: String,
    publisher: String,
    edition_year: Option<i32>,
    subjects: BTreeSet<String>,
    sub_subject: Option<String>,
    support_type: Option<String>,
    support_subtype: Option<String>,
    provenance: Provenance,
    location: String,
    grades: BTreeSet<String>,
    rooms: BTreeSet<String>,
    intake_date: DateTime<Utc>,
    retirement_date: Option<DateTime<Utc>>,
}

impl CatalogItem {
    /// Validate and normalize a draft into a new record at version 1.
    pub fn create(id: CatalogItemId, draft: CatalogItemDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let quantity = draft.quantity;
        reconciler::ensure_quantity_in_range(quantity)?;
        let d = Descriptive::validate(draft, now)?;
        Ok(Self {
            id,
            catalog_number: d.catalog_number,
            title: d.title,
            author: d.author,
            publisher: d.publisher,
            edition_year: d.edition_year,
            quantity,
            subjects: d.subjects,
            sub_subject: d.sub_subject,
            support_type: d.support_type,
            support_subtype: d.support_subtype,
            provenance: d.provenance,
            location: d.location,
            grades: d.grades,
            rooms: d.rooms,
            status: reconciler::derive_status(quantity),
            intake_date: d.intake_date,
            retirement_date: d.retirement_date,
            version: 1,
        })
    }

    /// Rebuild from stored data. Status is re-derived, never trusted from storage.
    pub fn restore(snapshot: CatalogItemSnapshot) -> Self {
        let quantity = snapshot.quantity.max(0);
        Self {
            id: snapshot.id,
            catalog_number: snapshot.catalog_number,
            title: snapshot.title,
            author: snapshot.author,
            publisher: snapshot.publisher,
            edition_year: snapshot.edition_year,
            quantity,
            subjects: snapshot.subjects,
            sub_subject: snapshot.sub_subject,
            support_type: snapshot.support_type,
            support_subtype: snapshot.support_subtype,
            provenance: snapshot.provenance,
            location: snapshot.location,
            grades: snapshot.grades,
            rooms: snapshot.rooms,
            status: reconciler::derive_status(quantity),
            intake_date: snapshot.intake_date,
            retirement_date: snapshot.retirement_date,
            version: snapshot.version,
        }
    }

    pub fn snapshot(&self) -> CatalogItemSnapshot {
        CatalogItemSnapshot {
            id: self.id,
            catalog_number: self.catalog_number.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            publisher: self.publisher.clone(),
            edition_year: self.edition_year,
            quantity: self.quantity,
            subjects: self.subjects.clone(),
            sub_subject: self.sub_subject.clone(),
            support_type: self.support_type.clone(),
            support_subtype: self.support_subtype.clone(),
            provenance: self.provenance.clone(),
            location: self.location.clone(),
            grades: self.grades.clone(),
            rooms: self.rooms.clone(),
            status: self.status,
            intake_date: self.intake_date,
            retirement_date: self.retirement_date,
            version: self.version,
        }
    }

    /// Apply an edit. Descriptive fields are re-validated as a whole; a quantity
    /// change goes through the reconciler so status follows it.
    pub fn revise(&mut self, patch: CatalogItemPatch) -> DomainResult<()> {
        let quantity = patch.quantity;
        if let Some(q) = quantity {
            reconciler::ensure_quantity_in_range(q)?;
        }
        let intake_date = self.intake_date;
        let draft = self.merge(patch);
        let d = Descriptive::validate(draft, intake_date)?;

        self.catalog_number = d.catalog_number;
        self.title = d.title;
        self.author = d.author;
        self.publisher = d.publisher;
        self.edition_year = d.edition_year;
        self.subjects = d.subjects;
        self.sub_subject = d.sub_subject;
        self.support_type = d.support_type;
        self.support_subtype = d.support_subtype;
        self.provenance = d.provenance;
        self.location = d.location;
        self.grades = d.grades;
        self.rooms = d.rooms;
        self.intake_date = d.intake_date;
        self.retirement_date = d.retirement_date;

        match quantity {
            Some(q) => reconciler::restock(self, q)?,
            None => self.bump_version(),
        }
        Ok(())
    }

    fn merge(&self, patch: CatalogItemPatch) -> CatalogItemDraft {
        CatalogItemDraft {
            catalog_number: patch.catalog_number.unwrap_or_else(|| self.catalog_number.clone()),
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            author: patch.author.unwrap_or_else(|| self.author.clone()),
            publisher: patch.publisher.unwrap_or_else(|| self.publisher.clone()),
            edition_year: patch.edition_year.unwrap_or(self.edition_year),
            quantity: patch.quantity.unwrap_or(self.quantity),
            subjects: patch
                .subjects
                .unwrap_or_else(|| self.subjects.iter().cloned().collect()),
            sub_subject: patch.sub_subject.unwrap_or_else(|| self.sub_subject.clone()),
            support_type: patch.support_type.unwrap_or_else(|| self.support_type.clone()),
            support_subtype: patch
                .support_subtype
                .unwrap_or_else(|| self.support_subtype.clone()),
            provenance: patch
                .provenance
                .unwrap_or_else(|| self.provenance.label().to_string()),
            location: patch.location.unwrap_or_else(|| self.location.clone()),
            grades: patch
                .grades
                .unwrap_or_else(|| self.grades.iter().cloned().collect()),
            rooms: patch
                .rooms
                .unwrap_or_else(|| self.rooms.iter().cloned().collect()),
            intake_date: Some(patch.intake_date.unwrap_or(self.intake_date)),
            retirement_date: patch.retirement_date.unwrap_or(self.retirement_date),
        }
    }

    pub(crate) fn write_stock(&mut self, quantity: i64, status: ItemStatus) {
        self.quantity = quantity;
        self.status = status;
        self.bump_version();
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn id_typed(&self) -> CatalogItemId {
        self.id
    }

    pub fn catalog_number(&self) -> &str {
        &self.catalog_number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }

    pub fn subjects(&self) -> &BTreeSet<String> {
        &self.subjects
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn grades(&self) -> &BTreeSet<String> {
        &self.grades
    }

    pub fn rooms(&self) -> &BTreeSet<String> {
        &self.rooms
    }

    pub fn intake_date(&self) -> DateTime<Utc> {
        self.intake_date
    }

    pub fn retirement_date(&self) -> Option<DateTime<Utc>> {
        self.retirement_date
    }
}

impl AggregateRoot for CatalogItem {
    type Id = CatalogItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Descriptive {
    fn validate(draft: CatalogItemDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let catalog_number = required("catalog number", &draft.catalog_number)?;
        let title = sentence_case(&required("title", &draft.title)?);
        ensure_catalog_charset("title", &title)?;
        let author = sentence_case(&required("author", &draft.author)?);
        ensure_catalog_charset("author", &author)?;
        let publisher = sentence_case(&required("publisher", &draft.publisher)?);
        let location = sentence_case(&required("location", &draft.location)?);

        if let Some(year) = draft.edition_year {
            if year < 0 {
                return Err(DomainError::validation("edition year cannot be negative"));
            }
        }

        let subjects: BTreeSet<String> = draft
            .subjects
            .iter()
            .map(|s| canonical_tag(s))
            .filter(|s| !s.is_empty())
            .collect();
        if subjects.is_empty() {
            return Err(DomainError::validation("at least one subject is required"));
        }

        let grades = tag_set(&draft.grades);
        if grades.is_empty() {
            return Err(DomainError::validation("at least one grade is required"));
        }

        let rooms = tag_set(&draft.rooms);
        if strip_accents(&location).eq_ignore_ascii_case("aula") && rooms.is_empty() {
            return Err(DomainError::validation(
                "classroom location requires at least one room",
            ));
        }

        let intake_date = draft.intake_date.unwrap_or(now);
        if let Some(retired) = draft.retirement_date {
            if retired < intake_date {
                return Err(DomainError::validation(
                    "retirement date cannot precede intake date",
                ));
            }
        }

        Ok(Self {
            catalog_number,
            title,
            author,
            publisher,
            edition_year: draft.edition_year,
            subjects,
            sub_subject: blank_to_none(draft.sub_subject).map(|s| sentence_case(&s)),
            support_type: blank_to_none(draft.support_type).map(|s| sentence_case(&s)),
            support_subtype: blank_to_none(draft.support_subtype).map(|s| sentence_case(&s)),
            provenance: Provenance::parse(&draft.provenance)?,
            location,
            grades,
            rooms,
            intake_date,
            retirement_date: draft.retirement_date,
        })
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn ensure_catalog_charset(field: &str, value: &str) -> DomainResult<()> {
    const PUNCTUATION: &str = " .,:;¡!¿?\"'()-";
    if value
        .chars()
        .all(|c| c.is_alphanumeric() || PUNCTUATION.contains(c))
    {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "{field} may only contain letters, digits and basic punctuation"
        )))
    }
}

fn tag_set(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
