use regex::Regex;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("zone name is empty")]
    Empty,
    #[error("zone name too long (max 253 characters)")]
    TooLong,
    #[error("zone label {0:?} is empty or longer than 63 characters")]
    BadLabelLength(String),
    #[error("zone label {0:?} contains invalid characters (only a-z, 0-9, '_' and '-' allowed)")]
    InvalidCharacters(String),
    #[error("zone label {0:?} must not start or end with '-'")]
    LeadingOrTrailingHyphen(String),
}

lazy_static::lazy_static! {
    /// Letters, digits, '_' and '-'; case is left to the API
    static ref LABEL_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Strip the trailing dot of an FQDN. The core-networks API is not FQDN-aware.
pub fn un_fqdn(fqdn: &str) -> &str {
    fqdn.strip_suffix('.').unwrap_or(fqdn)
}

/// Turn a caller-supplied zone (`example.com.` or `example.com`) into the
/// form used in API paths, rejecting anything that could not be a zone.
pub fn normalize_zone(zone: &str) -> Result<&str, ValidationError> {
    let name = un_fqdn(zone.trim());
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }
    if name.len() > 253 {
        return Err(ValidationError::TooLong);
    }
    for label in name.split('.') {
        validate_label(label)?;
    }
    Ok(name)
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.is_empty() || label.len() > 63 {
        return Err(ValidationError::BadLabelLength(label.to_string()));
    }
    if !LABEL_RE.is_match(label) {
        return Err(ValidationError::InvalidCharacters(label.to_string()));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::LeadingOrTrailingHyphen(label.to_string()));
    }
    Ok(())
}
