//! Money formatting and discount arithmetic.
//!
//! Amounts are plain integers in whatever unit the backend stores for the
//! currency. No decimal scaling is applied for any currency.

/// Currency code -> display symbol. Unknown codes are shown as-is.
const CURRENCY_SYMBOLS: &[(&str, &str)] =
    &[("IDR", "Rp"), ("USD", "$"), ("SGD", "S$"), ("BRL", "R$")];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("Discount percent must be between 0 and 100, got {0}")]
    PercentOutOfRange(u8),
    #[error("Base price must be at least 1")]
    ZeroBase,
}

pub fn currency_symbol(code: &str) -> &str {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, symbol)| *symbol)
        .unwrap_or(code)
}

/// Currencies the room forms offer
pub fn known_currencies() -> impl Iterator<Item = &'static str> {
    CURRENCY_SYMBOLS.iter().map(|(code, _)| *code)
}

/// Insert `,` every three digits from the right.
pub fn group_thousands(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `format_money(1_000_000, "IDR") == "Rp 1,000,000"`
pub fn format_money(amount: u64, currency: &str) -> String {
    format!("{} {}", currency_symbol(currency), group_thousands(amount))
}

/// Integer-only discount: `base - base * percent / 100`, floored, never below 1.
pub fn compute_discounted_price(base: u64, percent: u8) -> Result<u64, PricingError> {
    if percent > 100 {
        return Err(PricingError::PercentOutOfRange(percent));
    }
    if base == 0 {
        return Err(PricingError::ZeroBase);
    }
    let reduction = (base as u128 * percent as u128 / 100) as u64;
    Ok(base.saturating_sub(reduction).max(1))
}
