// src/readable/status.rs
// =============================================================================
// The status taxonomy shared by URL mode and given-content mode.
//
// Storage and search code match on the exact numeric codes, so these values
// are frozen. A new failure mode gets a new code; existing ones are never
// reused or renumbered.
//
//   1    html was handed to us and parsed
//   2xx  fetched over the network (200 in practice)
//   4xx+ remote answered with an error status, kept verbatim
//   901  could not reach the host at all (dns, refused, tls, timeout)
//   902  gave up following redirects
// =============================================================================

use serde::{Deserialize, Serialize};

/// Code for content supplied directly instead of fetched.
pub const PARSED_CODE: u16 = 1;
/// Code for any non-HTTP network failure.
pub const UNREACHABLE_CODE: u16 = 901;
/// Code for a redirect chain longer than the configured limit.
pub const TOO_MANY_REDIRECTS_CODE: u16 = 902;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ReadStatus {
    /// Given-content mode (code 1)
    Parsed,
    /// The remote server answered; holds its status code verbatim
    Http(u16),
    /// Network unreachable (code 901)
    Unreachable,
    /// Redirect limit exceeded (code 902)
    TooManyRedirects,
}

impl ReadStatus {
    pub fn code(self) -> u16 {
        match self {
            ReadStatus::Parsed => PARSED_CODE,
            ReadStatus::Http(code) => code,
            ReadStatus::Unreachable => UNREACHABLE_CODE,
            ReadStatus::TooManyRedirects => TOO_MANY_REDIRECTS_CODE,
        }
    }

    /// Inverse of `code()`; `None` for values outside the taxonomy.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            PARSED_CODE => Some(ReadStatus::Parsed),
            UNREACHABLE_CODE => Some(ReadStatus::Unreachable),
            TOO_MANY_REDIRECTS_CODE => Some(ReadStatus::TooManyRedirects),
            100..=599 => Some(ReadStatus::Http(code)),
            _ => None,
        }
    }

    /// Whether the document was obtained, i.e. content may be present.
    pub fn is_success(self) -> bool {
        match self {
            ReadStatus::Parsed => true,
            ReadStatus::Http(code) => (200..300).contains(&code),
            ReadStatus::Unreachable | ReadStatus::TooManyRedirects => false,
        }
    }

    /// Short default message stored next to the code.
    pub fn default_message(self) -> &'static str {
        match self {
            ReadStatus::Parsed => "Content is parsed html",
            ReadStatus::Http(code) => reqwest::StatusCode::from_u16(code)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or("Unknown HTTP status"),
            ReadStatus::Unreachable => "Url could not be reached",
            ReadStatus::TooManyRedirects => "Too many redirects",
        }
    }
}

impl From<ReadStatus> for u16 {
    fn from(status: ReadStatus) -> u16 {
        status.code()
    }
}

impl TryFrom<u16> for ReadStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        ReadStatus::from_code(code).ok_or_else(|| format!("unknown read status code {}", code))
    }
}

impl std::fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.default_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_codes_are_stable() {
        assert_eq!(ReadStatus::Parsed.code(), 1);
        assert_eq!(ReadStatus::Unreachable.code(), 901);
        assert_eq!(ReadStatus::TooManyRedirects.code(), 902);
        assert_eq!(ReadStatus::Http(404).code(), 404);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(ReadStatus::from_code(1), Some(ReadStatus::Parsed));
        assert_eq!(ReadStatus::from_code(200), Some(ReadStatus::Http(200)));
        assert_eq!(ReadStatus::from_code(901), Some(ReadStatus::Unreachable));
        assert_eq!(ReadStatus::from_code(0), None);
        assert_eq!(ReadStatus::from_code(700), None);
    }

    #[test]
    fn test_success_classification() {
        assert!(ReadStatus::Parsed.is_success());
        assert!(ReadStatus::Http(200).is_success());
        assert!(!ReadStatus::Http(404).is_success());
        assert!(!ReadStatus::Http(301).is_success());
        assert!(!ReadStatus::Unreachable.is_success());
    }

    #[test]
    fn test_serializes_as_bare_code() {
        let json = serde_json::to_string(&ReadStatus::Unreachable).unwrap();
        assert_eq!(json, "901");
        let back: ReadStatus = serde_json::from_str("404").unwrap();
        assert_eq!(back, ReadStatus::Http(404));
        assert!(serde_json::from_str::<ReadStatus>("42").is_err());
    }

    #[test]
    fn test_default_messages() {
        assert_eq!(ReadStatus::Http(404).default_message(), "Not Found");
        assert_eq!(ReadStatus::Parsed.default_message(), "Content is parsed html");
    }
}
