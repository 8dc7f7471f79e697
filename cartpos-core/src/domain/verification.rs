//! Phone verification inputs and the ephemeral verification handle

use std::sync::LazyLock;

use regex::Regex;

use super::result::{Error, Result};

static LOCAL_PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").unwrap());
static OTP_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());
static COUNTRY_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[0-9]{1,3}$").unwrap());

/// Validate a phone number entered without its country code (exactly 10 digits)
pub fn validate_local_phone(phone_number: &str) -> Result<()> {
    if LOCAL_PHONE.is_match(phone_number) {
        Ok(())
    } else {
        Err(Error::validation(
            "Please enter a valid 10-digit phone number",
        ))
    }
}

/// Validate a one-time verification code (exactly 6 digits)
pub fn validate_otp_code(code: &str) -> Result<()> {
    if OTP_CODE.is_match(code) {
        Ok(())
    } else {
        Err(Error::validation("Please enter the 6-digit verification code"))
    }
}

/// Validate a country calling code such as `+91`
pub fn validate_country_code(country_code: &str) -> Result<()> {
    if COUNTRY_CODE.is_match(country_code) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Invalid country code '{}', expected e.g. +91",
            country_code
        )))
    }
}

/// Join a country code and a validated local number into E.164 form
pub fn to_e164(country_code: &str, local_phone: &str) -> String {
    format!("{}{}", country_code, local_phone)
}

/// Correlates an OTP request with its later confirmation.
///
/// Lives only in memory: it is consumed when the code is confirmed or when the
/// user goes back to change the number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationHandle {
    verification_id: String,
    phone_number: String,
}

impl VerificationHandle {
    pub fn new(verification_id: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            verification_id: verification_id.into(),
            phone_number: phone_number.into(),
        }
    }

    pub fn verification_id(&self) -> &str {
        &self.verification_id
    }

    /// E.164 phone number being verified
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }
}
