//! Contact details submitted with a booking

use regex::Regex;
use serde::{Deserialize, Serialize};

const PHONE_PATTERN: &str = r"^[0-9+]{8,15}$";
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Phone number and email the booking service attaches to an appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    phone: String,
    email: String,
}

impl ContactInfo {
    /// Validates and builds contact details
    ///
    /// The phone must be 8 to 15 digits or `+`; the email needs a local part, a
    /// domain and a dot in the domain.
    pub fn new(phone: impl AsRef<str>, email: impl AsRef<str>) -> Result<Self, String> {
        let phone = phone.as_ref().trim().replace(' ', "");
        let email = email.as_ref().trim().to_string();

        let phone_re = Regex::new(PHONE_PATTERN).map_err(|e| e.to_string())?;
        if !phone_re.is_match(&phone) {
            return Err(format!(
                "Invalid phone number '{phone}': use 8 to 15 digits, optionally with +"
            ));
        }

        let email_re = Regex::new(EMAIL_PATTERN).map_err(|e| e.to_string())?;
        if !email_re.is_match(&email) {
            return Err(format!("Invalid email address '{email}'"));
        }

        Ok(Self { phone, email })
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
