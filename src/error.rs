use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while talking to the Google APIs or processing their data.
#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{count} folders are named {name:?}")]
    AmbiguousFolder { name: String, count: usize },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("access denied: {0}")]
    Denied(String),

    #[error("column {0:?} does not exist")]
    MissingColumn(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Transient,
    Malformed,
    Auth,
    Denied,
    Local,
}

/// What the pipeline does with an error raised while fetching one patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    Skip,
    Abort,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::AmbiguousFolder { .. } => ErrorKind::NotFound,
            Error::Transient(_) => ErrorKind::Transient,
            Error::MalformedResponse(_) | Error::Csv(_) | Error::Json(_) => ErrorKind::Malformed,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Denied(_) => ErrorKind::Denied,
            Error::MissingColumn(_) | Error::Config(_) | Error::Io(_) => ErrorKind::Local,
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self.kind() {
            ErrorKind::Transient => Disposition::Retry,
            ErrorKind::NotFound | ErrorKind::Malformed | ErrorKind::Denied => Disposition::Skip,
            ErrorKind::Auth | ErrorKind::Local => Disposition::Abort,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Maps a non-success HTTP status and its body onto the taxonomy.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let msg = format!("GoogleAPIError {} {}", status, body.trim());

        match status {
            StatusCode::NOT_FOUND => Error::NotFound(msg),
            StatusCode::UNAUTHORIZED => Error::Auth(msg),
            StatusCode::FORBIDDEN => {
                let reasons = error_reasons(body);
                let any_of = |set: &[&str]| reasons.iter().any(|r| set.contains(&r.as_str()));

                if any_of(RATE_LIMITED) {
                    Error::Transient(msg)
                } else if any_of(RESOURCE_DENIED) {
                    Error::Denied(msg)
                } else {
                    Error::Auth(msg)
                }
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => Error::Transient(msg),
            s if s.is_server_error() => Error::Transient(msg),
            _ => Error::MalformedResponse(msg),
        }
    }
}

// 403 reasons that clear up when retried later.
const RATE_LIMITED: &[&str] = &[
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "sharingRateLimitExceeded",
];

// 403 reasons that concern one file or folder rather than the credential.
const RESOURCE_DENIED: &[&str] = &[
    "fileNotDownloadable",
    "insufficientFilePermissions",
    "cannotDownloadAbusiveFile",
    "appNotAuthorizedToFile",
    "domainPolicy",
];

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Deserialize)]
struct ErrorDetails {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    reason: Option<String>,
}

/// The `error.errors[].reason` values of a Google API error body.
fn error_reasons(body: &str) -> Vec<String> {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.errors.into_iter().filter_map(|e| e.reason).collect())
        .unwrap_or_default()
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Error::from_status(status, &e.to_string());
        }

        if e.is_decode() || e.is_body() {
            return Error::MalformedResponse(e.to_string());
        }

        Error::Transient(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        let kind = |s: u16| Error::from_status(StatusCode::from_u16(s).unwrap(), "").kind();

        assert_eq!(kind(404), ErrorKind::NotFound);
        assert_eq!(kind(401), ErrorKind::Auth);
        assert_eq!(kind(403), ErrorKind::Auth);
        assert_eq!(kind(429), ErrorKind::Transient);
        assert_eq!(kind(503), ErrorKind::Transient);
        assert_eq!(kind(400), ErrorKind::Malformed);
    }

    fn forbidden(reason: &str) -> Error {
        let body = format!(
            r#"{{"error": {{"code": 403, "message": "denied",
                "errors": [{{"domain": "usageLimits", "reason": "{reason}", "message": "denied"}}]}}}}"#
        );
        Error::from_status(StatusCode::FORBIDDEN, &body)
    }

    #[test]
    fn forbidden_is_split_by_reason() {
        assert_eq!(forbidden("userRateLimitExceeded").kind(), ErrorKind::Transient);
        assert_eq!(forbidden("rateLimitExceeded").kind(), ErrorKind::Transient);

        let denied = forbidden("fileNotDownloadable");
        assert_eq!(denied.kind(), ErrorKind::Denied);
        assert_eq!(denied.disposition(), Disposition::Skip);
        assert_eq!(forbidden("insufficientFilePermissions").kind(), ErrorKind::Denied);

        assert_eq!(forbidden("insufficientPermissions").kind(), ErrorKind::Auth);
        assert_eq!(
            Error::from_status(StatusCode::FORBIDDEN, "<html>Forbidden</html>").kind(),
            ErrorKind::Auth
        );
    }

    #[test]
    fn dispositions() {
        assert_eq!(
            Error::Transient("reset".into()).disposition(),
            Disposition::Retry
        );
        assert_eq!(
            Error::AmbiguousFolder {
                name: "P1".into(),
                count: 2
            }
            .disposition(),
            Disposition::Skip
        );
        assert_eq!(Error::Auth("revoked".into()).disposition(), Disposition::Abort);
        assert_eq!(
            Error::MissingColumn("Alexa Interaction".into()).disposition(),
            Disposition::Abort
        );
    }
}
