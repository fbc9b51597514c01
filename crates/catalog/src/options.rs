//! Fixed option lists offered by the catalog and checkout forms.

use serde::Serialize;

use crate::provenance::Provenance;

pub const GRADE_LEVELS: &[&str] = &[
    "Nivel inicial",
    "1°",
    "2°",
    "3°",
    "4°",
    "5°",
    "6°",
    "7°",
    "Avanzado",
    "Nivel Primario",
    "1er ciclo",
    "2do ciclo",
    "1er y 2do ciclo",
    "2do ciclo y 7°",
];

pub const CLASSROOMS: &[&str] = &["Ardillitas", "San Martín", "Sarmiento", "Moreno", "Belgrano"];

pub const SUPPORT_TYPES: &[&str] = &["Libro", "Revista", "Mapa", "Audiovisual", "Juego didáctico"];

/// Typed view model for the catalog and checkout forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormOptions {
    pub grades: Vec<String>,
    pub classrooms: Vec<String>,
    pub provenances: Vec<String>,
    pub support_types: Vec<String>,
}

impl FormOptions {
    pub fn standard() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            grades: owned(GRADE_LEVELS),
            classrooms: owned(CLASSROOMS),
            provenances: Provenance::known().iter().map(|p| p.label().to_string()).collect(),
            support_types: owned(SUPPORT_TYPES),
        }
    }
}
