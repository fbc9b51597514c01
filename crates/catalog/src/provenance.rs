use serde::{Deserialize, Serialize};

use shelfwise_core::{DomainError, DomainResult};

use crate::text::{normalize_text, sentence_case};

/// How a catalog item entered the collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Provenance {
    Donation,
    Purchase,
    /// Any grant from the national ministry, whatever the spelling on the form.
    NationalMinistry,
    Other(String),
}

impl Provenance {
    pub const DONATION_LABEL: &'static str = "Donación";
    pub const PURCHASE_LABEL: &'static str = "Compra";
    pub const NATIONAL_MINISTRY_LABEL: &'static str = "Ministerio de la Nación";

    /// Parse free text from a form or spreadsheet cell.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let normalized = normalize_text(input).to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("provenance is required"));
        }
        if normalized.contains("ministerio") || normalized.contains("ministry") {
            return Ok(Self::NationalMinistry);
        }
        Ok(match normalized.as_str() {
            "donacion" | "donation" => Self::Donation,
            "compra" | "purchase" => Self::Purchase,
            _ => Self::Other(sentence_case(input)),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Donation => Self::DONATION_LABEL,
            Self::Purchase => Self::PURCHASE_LABEL,
            Self::NationalMinistry => Self::NATIONAL_MINISTRY_LABEL,
            Self::Other(label) => label,
        }
    }

    /// The categories offered on the catalog form.
    pub fn known() -> [Provenance; 3] {
        [Self::Donation, Self::Purchase, Self::NationalMinistry]
    }
}

impl core::fmt::Display for Provenance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Provenance> for String {
    fn from(value: Provenance) -> Self {
        value.label().to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
