//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers the booking service works with. Input is
//! trimmed and upper-cased before validation, so `" rssmra80a01h501u "` and
//! `"RSSMRA80A01H501U"` produce the same [`FiscalCode`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

fn is_upper_alnum(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

/// Italian fiscal code (codice fiscale), the patient key on the booking service
///
/// # Examples
///
/// ```
/// use recup_monitor::domain::ids::FiscalCode;
/// use std::str::FromStr;
///
/// let code = FiscalCode::from_str("rssmra80a01h501u").unwrap();
/// assert_eq!(code.as_str(), "RSSMRA80A01H501U");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalCode(String);

impl FiscalCode {
    /// Expected length of a fiscal code
    pub const LEN: usize = 16;

    /// Creates a new FiscalCode, normalizing case and whitespace
    ///
    /// # Returns
    ///
    /// Returns `Ok(FiscalCode)` for 16 characters in `[A-Z0-9]`, `Err` otherwise
    pub fn new(code: impl AsRef<str>) -> Result<Self, String> {
        let code = normalize_code(code.as_ref());
        if code.len() != Self::LEN || !is_upper_alnum(&code) {
            return Err(format!(
                "Invalid fiscal code '{code}': expected {} alphanumeric characters",
                Self::LEN
            ));
        }
        Ok(Self(code))
    }

    /// Returns the fiscal code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for FiscalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FiscalCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FiscalCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FiscalCode> for String {
    fn from(value: FiscalCode) -> Self {
        value.0
    }
}

impl AsRef<str> for FiscalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Electronic prescription number (NRE)
///
/// # Examples
///
/// ```
/// use recup_monitor::domain::ids::Nre;
///
/// let nre = Nre::new("1200A4012345678").unwrap();
/// assert_eq!(nre.to_string(), "1200A4012345678");
/// assert!(Nre::new("too-short").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nre(String);

impl Nre {
    /// Expected length of a prescription number
    pub const LEN: usize = 15;

    /// Creates a new Nre, normalizing case and whitespace
    pub fn new(code: impl AsRef<str>) -> Result<Self, String> {
        let code = normalize_code(code.as_ref());
        if code.len() != Self::LEN || !is_upper_alnum(&code) {
            return Err(format!(
                "Invalid NRE '{code}': expected {} alphanumeric characters",
                Self::LEN
            ));
        }
        Ok(Self(code))
    }

    /// Returns the NRE as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Nre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Nre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Nre {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Nre> for String {
    fn from(value: Nre) -> Self {
        value.0
    }
}

impl AsRef<str> for Nre {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Notification destination of a subscriber (a Telegram chat id in practice)
///
/// Opaque to the monitor; only emptiness is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Creates a new SubscriberId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Subscriber ID cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the subscriber ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriberId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SubscriberId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubscriberId> for String {
    fn from(value: SubscriberId) -> Self {
        value.0
    }
}

impl AsRef<str> for SubscriberId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
