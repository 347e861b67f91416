//! Client-side validation
//!
//! Everything here runs before a network call. A failing check means the
//! request is never sent.

use numero_api::{RegisterRequest, ReportRequest};

/// Minimum password length accepted by the backend
pub const MIN_PASSWORD_LEN: usize = 8;

/// Validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field is empty
    #[error("{0} is required")]
    Required(&'static str),

    /// Email does not look like `local@domain.tld`
    #[error("enter a valid email address")]
    InvalidEmail,

    /// Password shorter than the minimum
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length
        min: usize,
    },

    /// Password and confirmation differ
    #[error("passwords do not match")]
    PasswordMismatch,

    /// OTP is not six digits
    #[error("enter the 6-digit code")]
    InvalidOtp,

    /// Phone number has the wrong number of digits
    #[error("enter a phone number with 10 to 15 digits")]
    InvalidPhone,

    /// Name has no letters or disallowed characters
    #[error("enter a name using letters only")]
    InvalidName,
}

pub(crate) fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed)
    }
}

/// Check an email address
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = required("email", email)?;
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };

    let domain_ok = domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'));

    if local.is_empty() || !domain_ok || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Check a new password against its confirmation
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required("password"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Check a one-time password
pub fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    let otp = otp.trim();
    if otp.len() == 6 && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOtp)
    }
}

/// Strip formatting from a phone number, returning `+digits` or `digits`
pub fn normalize_phone(phone: &str) -> Result<String, ValidationError> {
    let phone = required("phone number", phone)?;
    let plus = phone.starts_with('+');
    let mut digits = String::with_capacity(phone.len());

    for (i, c) in phone.chars().enumerate() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' | '.' => {}
            '+' if i == 0 => {}
            _ => return Err(ValidationError::InvalidPhone),
        }
    }

    if !(10..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(if plus { format!("+{digits}") } else { digits })
}

/// Check a full name for name numerology
pub fn validate_full_name(name: &str) -> Result<(), ValidationError> {
    let name = required("name", name)?;
    let allowed = |c: char| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.');
    if name.chars().all(allowed) && name.chars().any(char::is_alphabetic) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName)
    }
}

/// Validate and normalise a report request
pub fn validate_report_request(req: ReportRequest) -> Result<ReportRequest, ValidationError> {
    match req {
        ReportRequest::Name(mut name) => {
            validate_full_name(&name.full_name)?;
            name.full_name = name.full_name.trim().to_string();
            Ok(ReportRequest::Name(name))
        }
        ReportRequest::Phone(mut phone) => {
            phone.phone_number = normalize_phone(&phone.phone_number)?;
            Ok(ReportRequest::Phone(phone))
        }
    }
}

/// Sign-up form
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl RegistrationForm {
    /// Check all fields
    pub fn validate(&self) -> Result<(), ValidationError> {
        required("first name", &self.first_name)?;
        validate_email(&self.email)?;
        validate_new_password(&self.password, &self.confirm_password)
    }

    /// Validate and build the request body
    pub fn into_request(self) -> Result<RegisterRequest, ValidationError> {
        self.validate()?;
        Ok(RegisterRequest {
            email: self.email.trim().to_lowercase(),
            password: self.password,
            password_confirm: self.confirm_password,
            first_name: self.first_name.trim().to_string(),
            last_name: self
                .last_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }
}
