//! Database models

use serde::{Deserialize, Serialize};

/// Category of transit asset a ticketing code is associated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Bus,
    Train,
    Ropeway,
}

impl VehicleKind {
    /// Column value used in the `codes` table
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleKind::Bus => "bus",
            VehicleKind::Train => "train",
            VehicleKind::Ropeway => "ropeway",
        }
    }

    /// Parse a `codes.vehicle_kind` column value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bus" => Some(VehicleKind::Bus),
            "train" => Some(VehicleKind::Train),
            "ropeway" => Some(VehicleKind::Ropeway),
            _ => None,
        }
    }
}

impl std::fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the `codes` table: a crowdsourced ticketing code
///
/// Keyed by the normalized code string. `confirms` approximates community
/// trust; `persist` freezes the row against ordinary crowd edits.
/// Timestamps are unix milliseconds written by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub code: String,
    pub vehicle_kind: VehicleKind,
    pub vehicle_name: String,
    pub persist: bool,
    pub confirms: i64,
    pub submitted_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}
