//! Input validation for API requests.
//!
//! Each function checks one field and returns a message suitable for the
//! form it came from. Handlers collect them with `ValidationErrorBuilder`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::models::{HotelProfileUpdate, NewPaymentMethod, RoomInput, UserProfile};
use crate::pictures::is_valid_picture_url;
use crate::pricing;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();

    /// Digits with an optional leading `+`, spaces and dashes allowed between groups
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 -]{5,19}$").unwrap();

    static ref CURRENCY_REGEX: Regex = Regex::new(r"^[A-Z]{3}$").unwrap();
}

const MAX_NAME_LEN: usize = 100;
const MAX_TEXT_LEN: usize = 500;
const MAX_PICTURES: usize = 20;
pub const MAX_TOKEN_USES: u32 = 1000;

pub fn validate_name(name: &str, label: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{} is required", label));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("{} is too long (max {} characters)", label, MAX_NAME_LEN));
    }
    Ok(())
}

pub fn validate_email(email: &Option<String>) -> Result<(), String> {
    match email.as_deref().map(str::trim) {
        None | Some("") => Ok(()),
        Some(email) if EMAIL_REGEX.is_match(email) => Ok(()),
        Some(_) => Err("Invalid email format".to_string()),
    }
}

pub fn validate_phone(phone: &Option<String>) -> Result<(), String> {
    match phone.as_deref().map(str::trim) {
        None | Some("") => Ok(()),
        Some(phone) if PHONE_REGEX.is_match(phone) => Ok(()),
        Some(_) => Err("Invalid phone number".to_string()),
    }
}

pub fn validate_text(text: &str, label: &str) -> Result<(), String> {
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(format!("{} is too long (max {} characters)", label, MAX_TEXT_LEN));
    }
    Ok(())
}

/// Map links are optional; when present they must be http(s).
pub fn validate_map_link(link: &str) -> Result<(), String> {
    let link = link.trim();
    if link.is_empty() || link.starts_with("http://") || link.starts_with("https://") {
        Ok(())
    } else {
        Err("Map link must be an http(s) URL".to_string())
    }
}

pub fn validate_currency(code: &str) -> Result<(), String> {
    if !CURRENCY_REGEX.is_match(code) {
        return Err("Currency must be a three-letter code such as IDR".to_string());
    }
    if !pricing::known_currencies().any(|known| known == code) {
        return Err(format!(
            "Unsupported currency {}; use one of {}",
            code,
            pricing::known_currencies().collect::<Vec<_>>().join(", ")
        ));
    }
    Ok(())
}

pub fn validate_price(price: u64) -> Result<(), String> {
    if price == 0 {
        return Err("Price per night must be at least 1".to_string());
    }
    Ok(())
}

pub fn validate_discount(discount: Option<u8>) -> Result<(), String> {
    match discount {
        Some(percent) if percent > 100 => {
            Err("Discount must be between 0 and 100 percent".to_string())
        }
        _ => Ok(()),
    }
}

pub fn validate_pictures(pictures: &[String]) -> Result<(), String> {
    if pictures.len() > MAX_PICTURES {
        return Err(format!("At most {} pictures per room", MAX_PICTURES));
    }
    if let Some(position) = pictures.iter().position(|p| !is_valid_picture_url(p)) {
        return Err(format!("Picture {} is empty", position + 1));
    }
    Ok(())
}

pub fn validate_max_uses(max_uses: u32) -> Result<(), String> {
    if max_uses == 0 || max_uses > MAX_TOKEN_USES {
        return Err(format!("Max uses must be between 1 and {}", MAX_TOKEN_USES));
    }
    Ok(())
}

pub fn validate_profile(profile: &UserProfile) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_name(&profile.name, "Name"))
        .check("email", validate_email(&profile.email))
        .check("phone", validate_phone(&profile.phone));
    errors.finish()
}

pub fn validate_hotel_profile(update: &HotelProfileUpdate) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_name(&update.name, "Hotel name"))
        .check("location", validate_text(&update.location, "Location"))
        .check("address", validate_text(&update.address, "Address"))
        .check("mapLink", validate_map_link(&update.map_link))
        .check("contact.email", validate_email(&update.contact.email))
        .check("contact.phone", validate_phone(&update.contact.phone))
        .check("contact.whatsapp", validate_phone(&update.contact.whatsapp));
    errors.finish()
}

pub fn validate_room(room: &RoomInput) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("roomNumber", validate_name(&room.room_number, "Room number"))
        .check("roomType", validate_name(&room.room_type, "Room type"))
        .check("pricePerNight", validate_price(room.price_per_night))
        .check("currency", validate_currency(&room.currency))
        .check("discountPercent", validate_discount(room.discount_percent))
        .check("pictures", validate_pictures(&room.pictures));
    errors.finish()
}

pub fn validate_payment_method(method: &NewPaymentMethod) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_name(&method.name, "Payment method name"))
        .check("details", validate_name(&method.details, "Payment details"));
    errors.finish()
}
