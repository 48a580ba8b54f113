//! Booking models and DTOs.

use serde::{Deserialize, Serialize};

use super::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookingStatus {
    PendingTransfer,
    PaymentFailed,
    Booked,
    CheckedIn,
    Canceled,
}

impl BookingStatus {
    /// Every transition the booking lifecycle allows, whoever performs it.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (PendingTransfer, Booked)
                | (PendingTransfer, PaymentFailed)
                | (PendingTransfer, Canceled)
                | (Booked, CheckedIn)
                | (Booked, Canceled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Canceled | BookingStatus::CheckedIn | BookingStatus::PaymentFailed
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingTransfer => write!(f, "pendingTransfer"),
            Self::PaymentFailed => write!(f, "paymentFailed"),
            Self::Booked => write!(f, "booked"),
            Self::CheckedIn => write!(f, "checkedIn"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub room_id: String,
    pub hotel_id: Principal,
    pub guest: Principal,
    /// Nanoseconds since the Unix epoch
    pub check_in: u64,
    pub check_out: u64,
    pub guests: u32,
    pub total_price: u64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof: Option<String>,
    pub status: BookingStatus,
    pub created_at: u64,
}

/// Booking as sent to the backend; the total is computed by the portal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub room_id: String,
    pub hotel_id: Principal,
    pub check_in: u64,
    pub check_out: u64,
    pub guests: u32,
    pub total_price: u64,
    pub currency: String,
}

/// Booking request as submitted by a guest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub hotel_id: Principal,
    pub room_id: String,
    pub check_in: u64,
    pub check_out: u64,
    pub guests: u32,
}

/// Filter understood by `getBookings`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_id: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn for_guest(guest: Principal) -> Self {
        Self {
            guest: Some(guest),
            ..Default::default()
        }
    }

    pub fn for_hotel(hotel_id: Principal) -> Self {
        Self {
            hotel_id: Some(hotel_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.hotel_id.as_ref().map_or(true, |h| *h == booking.hotel_id)
            && self.guest.as_ref().map_or(true, |g| *g == booking.guest)
            && self.status.map_or(true, |s| s == booking.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn test_lifecycle_transitions() {
        assert!(PendingTransfer.can_transition_to(Booked));
        assert!(PendingTransfer.can_transition_to(PaymentFailed));
        assert!(PendingTransfer.can_transition_to(Canceled));
        assert!(Booked.can_transition_to(CheckedIn));
        assert!(Booked.can_transition_to(Canceled));
        assert!(!PendingTransfer.can_transition_to(CheckedIn));
        assert!(!Booked.can_transition_to(PendingTransfer));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Canceled, CheckedIn, PaymentFailed] {
            assert!(from.is_terminal());
            for to in [PendingTransfer, PaymentFailed, Booked, CheckedIn, Canceled] {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&PendingTransfer).unwrap(),
            "\"pendingTransfer\""
        );
        let status: BookingStatus = serde_json::from_str("\"checkedIn\"").unwrap();
        assert_eq!(status, CheckedIn);
    }
}
