pub mod intent;
pub mod onboard;
pub mod run;
pub mod schedule;

use chrono::{Local, NaiveDate};
use edupilot_core::{CaregiverSignal, CaregiverSignalKind};

/// Parse a `YYYY-MM-DD` argument; absent means today.
pub fn parse_date(date: Option<&str>) -> Result<NaiveDate, String> {
    match date {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{s}' (expected YYYY-MM-DD): {e}")),
    }
}

/// A caregiver signal from the `--caregiver-*` flags. A note without a kind
/// counts as `other`.
pub fn caregiver_signal(kind: Option<String>, note: Option<String>) -> Result<Option<CaregiverSignal>, String> {
    let kind = match (kind.as_deref(), &note) {
        (None, None) => return Ok(None),
        (None, Some(_)) => CaregiverSignalKind::Other,
        (Some(k), _) => k.parse()?,
    };
    Ok(Some(CaregiverSignal {
        kind,
        content: note.unwrap_or_default(),
    }))
}
