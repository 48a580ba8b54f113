//! Booking lifecycle policy as seen from the portal.
//!
//! The backend enforces the real rules; this module decides which actions the
//! portal offers to which viewer and rejects the rest before any RPC is made.

use serde::{Deserialize, Serialize};

use crate::models::{BookingStatus, Room};

pub const NANOS_PER_DAY: u64 = 86_400 * 1_000_000_000;

/// Who is looking at a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewer {
    Guest,
    Hotel,
    Admin,
}

impl Viewer {
    fn manages_bookings(self) -> bool {
        matches!(self, Viewer::Hotel | Viewer::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingAction {
    Cancel,
    Confirm,
    RecordStayCompletion,
    AttachPaymentProof,
}

impl std::fmt::Display for BookingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingAction::Cancel => write!(f, "cancel"),
            BookingAction::Confirm => write!(f, "confirm"),
            BookingAction::RecordStayCompletion => write!(f, "record stay completion for"),
            BookingAction::AttachPaymentProof => write!(f, "attach payment proof to"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("Cannot {action} a booking that is {status}")]
    NotAllowed {
        action: BookingAction,
        status: BookingStatus,
    },
    #[error("Check-out must be at least one night after check-in")]
    EmptyStay,
    #[error("A booking needs at least one guest")]
    NoGuests,
}

const ALL_ACTIONS: [BookingAction; 4] = [
    BookingAction::Cancel,
    BookingAction::Confirm,
    BookingAction::RecordStayCompletion,
    BookingAction::AttachPaymentProof,
];

fn permits(status: BookingStatus, viewer: Viewer, action: BookingAction) -> bool {
    use BookingStatus::*;
    match action {
        BookingAction::Cancel if viewer.manages_bookings() => {
            matches!(status, PendingTransfer | Booked)
        }
        BookingAction::Cancel => status == PendingTransfer,
        BookingAction::Confirm => viewer.manages_bookings() && status == PendingTransfer,
        BookingAction::RecordStayCompletion => {
            viewer.manages_bookings() && matches!(status, Booked | CheckedIn)
        }
        BookingAction::AttachPaymentProof => viewer == Viewer::Guest && status == PendingTransfer,
    }
}

/// Actions to show for a booking in the given view.
pub fn available_actions(status: BookingStatus, viewer: Viewer) -> Vec<BookingAction> {
    ALL_ACTIONS
        .into_iter()
        .filter(|action| permits(status, viewer, *action))
        .collect()
}

/// Check an action and return the status the booking ends up in.
pub fn authorize(
    status: BookingStatus,
    viewer: Viewer,
    action: BookingAction,
) -> Result<BookingStatus, PolicyError> {
    if !permits(status, viewer, action) {
        return Err(PolicyError::NotAllowed { action, status });
    }
    Ok(match action {
        BookingAction::Cancel => BookingStatus::Canceled,
        BookingAction::Confirm => BookingStatus::Booked,
        BookingAction::RecordStayCompletion => BookingStatus::CheckedIn,
        BookingAction::AttachPaymentProof => status,
    })
}

/// Whole nights between two nanosecond timestamps, partial days rounded up.
pub fn nights_between(check_in: u64, check_out: u64) -> Result<u64, PolicyError> {
    if check_out <= check_in {
        return Err(PolicyError::EmptyStay);
    }
    Ok((check_out - check_in).div_ceil(NANOS_PER_DAY))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub nights: u64,
    pub nightly_rate: u64,
    pub total_price: u64,
    pub currency: String,
}

/// Price a stay in `room` at its current nightly rate.
pub fn quote(
    room: &Room,
    check_in: u64,
    check_out: u64,
    guests: u32,
) -> Result<Quote, PolicyError> {
    if guests == 0 {
        return Err(PolicyError::NoGuests);
    }
    let nights = nights_between(check_in, check_out)?;
    let nightly_rate = room.nightly_rate();
    Ok(Quote {
        nights,
        nightly_rate,
        total_price: nights.saturating_mul(nightly_rate),
        currency: room.currency.clone(),
    })
}
