//! Custom validation functions for configuration.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    // host:port where host is a name, dotted quad, or bracketed IPv6 literal.
    static ref ENDPOINT: Result<Regex, regex::Error> =
        Regex::new(r"^(\[[0-9A-Fa-f:.]+\]|[A-Za-z0-9.\-_]+):([0-9]{1,5})$");
}

/// Validate that an endpoint is `host:port` with a usable port.
pub fn validate_endpoint(endpoint: &str) -> Result<(), ValidationError> {
    let re = ENDPOINT
        .as_ref()
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    let port = re
        .captures(endpoint)
        .and_then(|caps| caps.get(2))
        .and_then(|port| port.as_str().parse::<u16>().ok())
        .ok_or_else(|| ValidationError::new("invalid_endpoint"))?;
    if port == 0 {
        return Err(ValidationError::new("invalid_endpoint_port"));
    }
    Ok(())
}

/// Validate tracing level names.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert!(validate_endpoint("127.0.0.1:47758").is_ok());
        assert!(validate_endpoint("broker.local:9999").is_ok());
        assert!(validate_endpoint("[::1]:47758").is_ok());
        assert!(validate_endpoint("127.0.0.1").is_err());
        assert!(validate_endpoint("127.0.0.1:0").is_err());
        assert!(validate_endpoint("127.0.0.1:70000").is_err());
        assert!(validate_endpoint("::1:47758").is_err());
    }

    #[test]
    fn log_levels() {
        assert!(validate_log_level("INFO").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }
}
