//! Availability query shapes

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the user chose to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    ByDistrict,
    ByPincode,
}

/// Resolved key for one availability query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum QueryKey {
    District(u32),
    Pincode(String),
}

impl QueryKey {
    pub fn mode(&self) -> QueryMode {
        match self {
            QueryKey::District(_) => QueryMode::ByDistrict,
            QueryKey::Pincode(_) => QueryMode::ByPincode,
        }
    }

    /// Name of the upstream endpoint serving this key
    pub fn operation(&self) -> &'static str {
        match self {
            QueryKey::District(_) => "calendarByDistrict",
            QueryKey::Pincode(_) => "calendarByPin",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::District(id) => write!(f, "district_id={id}"),
            QueryKey::Pincode(code) => write!(f, "pincode={code}"),
        }
    }
}

/// Calendar response: every center with its sessions for the coming week
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub centers: Vec<Center>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Center {
    pub name: String,
    /// "Free" or "Paid"
    pub fee_type: String,
    #[serde(default)]
    pub sessions: Vec<AppointmentSession>,
}

impl Center {
    /// At least one session still has a dose to give
    pub fn has_availability(&self) -> bool {
        self.sessions.iter().any(AppointmentSession::is_available)
    }
}

/// One day's vaccination slot at a center
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSession {
    pub date: String,
    pub vaccine: String,
    #[serde(rename = "min_age_limit")]
    pub min_age: u32,
    #[serde(rename = "available_capacity_dose1")]
    pub dose1: u32,
    #[serde(rename = "available_capacity_dose2")]
    pub dose2: u32,
}

impl AppointmentSession {
    pub fn is_available(&self) -> bool {
        u64::from(self.dose1) + u64::from(self.dose2) > 0
    }
}
