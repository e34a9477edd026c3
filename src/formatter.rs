//! Renders calendar results as chat messages

use crate::cowin::{AppointmentSession, Center, QueryResult};

pub const NO_AVAILABILITY: &str = "No available vaccines in the next 7 days";
pub const BOOKING_HINT: &str =
    "Try booking with the Cowin app :: https://selfregistration.cowin.gov.in";

/// Turn a calendar into ordered text segments.
///
/// Only centers with at least one session offering a dose are shown, in the
/// order received. Every session of such a center is listed, including the
/// ones without doses. The booking hint always closes the sequence.
pub fn render(result: &QueryResult) -> Vec<String> {
    let mut segments = Vec::new();
    let mut any_available = false;

    for center in result.centers.iter().filter(|c| c.has_availability()) {
        any_available = true;
        segments.push(center_header(center));
        segments.extend(
            center
                .sessions
                .iter()
                .map(|session| session_details(center, session)),
        );
    }

    if !any_available {
        segments.push(NO_AVAILABILITY.to_string());
    }
    segments.push(BOOKING_HINT.to_string());
    segments
}

fn center_header(center: &Center) -> String {
    format!("The vaccine calendar at {}", center.name)
}

fn session_details(center: &Center, session: &AppointmentSession) -> String {
    format!(
        "Date            :: {}\n\
         Free/Paid       :: {}\n\
         Vaccine         :: {}\n\
         Min age         :: {}\n\
         Dose 1          :: {}\n\
         Dose 2          :: {}",
        session.date, center.fee_type, session.vaccine, session.min_age, session.dose1, session.dose2
    )
}
