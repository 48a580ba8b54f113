//! Room models and DTOs.

use serde::{Deserialize, Serialize};

use super::Principal;
use crate::pricing;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub hotel_id: Principal,
    pub room_number: String,
    pub room_type: String,
    /// Whole currency units, see `pricing::format_money`
    pub price_per_night: u64,
    pub currency: String,
    #[serde(default)]
    pub pictures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u8>,
}

impl Room {
    /// Price charged per night, after the room's promotional discount if any.
    ///
    /// An out-of-range discount is ignored rather than trusted.
    pub fn nightly_rate(&self) -> u64 {
        match self.discount_percent {
            Some(percent) => pricing::compute_discounted_price(self.price_per_night, percent)
                .unwrap_or(self.price_per_night),
            None => self.price_per_night,
        }
    }
}

/// Create/update payload for a room, owned by the caller's hotel
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInput {
    pub room_number: String,
    pub room_type: String,
    pub price_per_night: u64,
    pub currency: String,
    #[serde(default)]
    pub pictures: Vec<String>,
    #[serde(default)]
    pub discount_percent: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(price: u64, discount: Option<u8>) -> Room {
        Room {
            id: "r1".to_string(),
            hotel_id: Principal::parse("aaaaa-aa").unwrap(),
            room_number: "101".to_string(),
            room_type: "Deluxe".to_string(),
            price_per_night: price,
            currency: "IDR".to_string(),
            pictures: vec![],
            discount_percent: discount,
        }
    }

    #[test]
    fn test_nightly_rate() {
        assert_eq!(room(500_000, None).nightly_rate(), 500_000);
        assert_eq!(room(500_000, Some(10)).nightly_rate(), 450_000);
        assert_eq!(room(500_000, Some(100)).nightly_rate(), 1);
        assert_eq!(room(500_000, Some(150)).nightly_rate(), 500_000);
    }
}
