//! Reminder text and destination formatting. Pure functions, no I/O.

use serde::Deserialize;

/// Wording pieces for the payment reminder, overridable from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReminderTemplate {
    /// Studio named in the body
    pub studio_name: String,
    /// Written directly before the amount
    pub currency_symbol: String,
    /// Last line of the message
    pub sign_off: String,
}

impl Default for ReminderTemplate {
    fn default() -> Self {
        Self {
            studio_name: "Beatbox Dance & Fitness Studio".to_string(),
            currency_symbol: "₹".to_string(),
            sign_off: "Beatbox Studio Team".to_string(),
        }
    }
}

/// Builds the reminder body, greeting the student by the first word of their name.
#[must_use]
pub fn compose_reminder(template: &ReminderTemplate, full_name: &str, amount_due: f64) -> String {
    let greeting_name = full_name.split_whitespace().next().unwrap_or("there");
    format!(
        "Hello {greeting_name},\n\n\
         This is a reminder from {studio} that your payment of {symbol}{amount} is pending.\n\n\
         Please clear your dues at the earliest.\n\n\
         Thank you,\n\
         {sign_off}",
        studio = template.studio_name,
        symbol = template.currency_symbol,
        amount = format_amount(amount_due),
        sign_off = template.sign_off,
    )
}

/// Plain decimal with at most two fraction digits and no trailing zeros
/// (`1500`, `1500.5`, `99.95`).
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let text = format!("{amount:.2}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Joins country code and national number into one dialable string.
///
/// Whitespace and hyphens are dropped and the result carries exactly one
/// leading `+`. A number that already starts with `+` is taken as complete,
/// which makes the function idempotent on its own output.
#[must_use]
pub fn normalize_destination(country_code: &str, national_number: &str) -> String {
    let number = strip_separators(national_number);
    if number.starts_with('+') {
        return number;
    }

    let code = strip_separators(country_code);
    format!("+{}{number}", code.trim_start_matches('+'))
}

fn strip_separators(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}
