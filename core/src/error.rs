//! Error types for the TalentLMS client.
//!
//! # Design
//! Every call either returns the decoded body or fails with exactly one
//! `Error` variant. Local failures (configuration, missing parameters,
//! transport, undecodable bodies) get their own variants. Failures reported
//! by the service arrive as an error envelope in the body; they are mapped
//! onto semantic variants through static lookup tables and all carry the same
//! `ServiceError` payload. Envelopes that match no table entry become
//! `Error::Api` with the original code and message untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use thiserror::Error;

use crate::http::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

/// Code, message and HTTP status extracted from an error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// `error.code`, or `error.type` when the service sends no code.
    pub code: Option<String>,
    pub message: String,
    pub status: u16,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("{operation}: missing required parameter `{parameter}`")]
    MissingParameter {
        operation: &'static str,
        parameter: &'static str,
    },

    #[error("transport failure")]
    Transport(#[source] TransportError),

    #[error("malformed response body: {body:?}")]
    MalformedResponse {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(ServiceError),

    #[error("invalid arguments: {0}")]
    InvalidArguments(ServiceError),

    #[error("user already exists: {0}")]
    UserAlreadyExists(ServiceError),

    #[error("user already enrolled: {0}")]
    UserAlreadyEnrolled(ServiceError),

    #[error("user not enrolled: {0}")]
    UserNotEnrolled(ServiceError),

    #[error("user deleted: {0}")]
    UserDeleted(ServiceError),

    #[error("user not found: {0}")]
    UserNotFound(ServiceError),

    #[error("user inactive: {0}")]
    UserInactive(ServiceError),

    #[error("weak password: {0}")]
    WeakPassword(ServiceError),

    #[error("invalid login: {0}")]
    InvalidLogin(ServiceError),

    #[error("course already a member: {0}")]
    CourseAlreadyMember(ServiceError),

    #[error("course not found: {0}")]
    CourseNotFound(ServiceError),

    #[error("category not found: {0}")]
    CategoryNotFound(ServiceError),

    #[error("group not found: {0}")]
    GroupNotFound(ServiceError),

    #[error("branch not found: {0}")]
    BranchNotFound(ServiceError),

    #[error("unit not found: {0}")]
    UnitNotFound(ServiceError),

    #[error("access denied: {0}")]
    AccessDenied(ServiceError),

    #[error("limit exceeded: {0}")]
    LimitExceeded(ServiceError),

    #[error("api error: {0}")]
    Api(ServiceError),
}

impl Error {
    /// The service-side payload, for every variant mapped from an error
    /// envelope.
    pub fn service(&self) -> Option<&ServiceError> {
        match self {
            Error::Configuration(_)
            | Error::UnknownOperation(_)
            | Error::MissingParameter { .. }
            | Error::Transport(_)
            | Error::MalformedResponse { .. } => None,
            Error::InvalidRequest(e)
            | Error::InvalidArguments(e)
            | Error::UserAlreadyExists(e)
            | Error::UserAlreadyEnrolled(e)
            | Error::UserNotEnrolled(e)
            | Error::UserDeleted(e)
            | Error::UserNotFound(e)
            | Error::UserInactive(e)
            | Error::WeakPassword(e)
            | Error::InvalidLogin(e)
            | Error::CourseAlreadyMember(e)
            | Error::CourseNotFound(e)
            | Error::CategoryNotFound(e)
            | Error::GroupNotFound(e)
            | Error::BranchNotFound(e)
            | Error::UnitNotFound(e)
            | Error::AccessDenied(e)
            | Error::LimitExceeded(e)
            | Error::Api(e) => Some(e),
        }
    }
}

/// Semantic category of a service error, used as the value type of the
/// lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    InvalidRequest,
    InvalidArguments,
    UserAlreadyExists,
    UserAlreadyEnrolled,
    UserNotEnrolled,
    UserDeleted,
    UserNotFound,
    UserInactive,
    WeakPassword,
    InvalidLogin,
    CourseAlreadyMember,
    CourseNotFound,
    CategoryNotFound,
    GroupNotFound,
    BranchNotFound,
    UnitNotFound,
    AccessDenied,
    LimitExceeded,
}

impl ServiceErrorKind {
    fn into_error(self, e: ServiceError) -> Error {
        match self {
            ServiceErrorKind::InvalidRequest => Error::InvalidRequest(e),
            ServiceErrorKind::InvalidArguments => Error::InvalidArguments(e),
            ServiceErrorKind::UserAlreadyExists => Error::UserAlreadyExists(e),
            ServiceErrorKind::UserAlreadyEnrolled => Error::UserAlreadyEnrolled(e),
            ServiceErrorKind::UserNotEnrolled => Error::UserNotEnrolled(e),
            ServiceErrorKind::UserDeleted => Error::UserDeleted(e),
            ServiceErrorKind::UserNotFound => Error::UserNotFound(e),
            ServiceErrorKind::UserInactive => Error::UserInactive(e),
            ServiceErrorKind::WeakPassword => Error::WeakPassword(e),
            ServiceErrorKind::InvalidLogin => Error::InvalidLogin(e),
            ServiceErrorKind::CourseAlreadyMember => Error::CourseAlreadyMember(e),
            ServiceErrorKind::CourseNotFound => Error::CourseNotFound(e),
            ServiceErrorKind::CategoryNotFound => Error::CategoryNotFound(e),
            ServiceErrorKind::GroupNotFound => Error::GroupNotFound(e),
            ServiceErrorKind::BranchNotFound => Error::BranchNotFound(e),
            ServiceErrorKind::UnitNotFound => Error::UnitNotFound(e),
            ServiceErrorKind::AccessDenied => Error::AccessDenied(e),
            ServiceErrorKind::LimitExceeded => Error::LimitExceeded(e),
        }
    }
}

static CODE_TABLE: LazyLock<HashMap<&'static str, ServiceErrorKind>> =
    LazyLock::new(|| HashMap::from([("3", ServiceErrorKind::UserAlreadyExists)]));

// The service reports most failures with a generic `type` and a fixed
// English message, so the message is the finer-grained key.
static MESSAGE_TABLE: LazyLock<HashMap<&'static str, ServiceErrorKind>> = LazyLock::new(|| {
    use ServiceErrorKind::*;

    HashMap::from([
        ("The requested branch does not exist", BranchNotFound),
        ("The requested category does not exist", CategoryNotFound),
        ("The requested course does not exist", CourseNotFound),
        ("The requested course is already a member of this branch", CourseAlreadyMember),
        ("The requested course is already a member of this group", CourseAlreadyMember),
        ("There is no group with such key", GroupNotFound),
        ("The requested group does not exist", GroupNotFound),
        ("Invalid arguments provided", InvalidArguments),
        ("The requested API action does not exist", InvalidRequest),
        (
            "Your login or password is incorrect. Please try again, making sure that CAPS LOCK key is off",
            InvalidLogin,
        ),
        ("The requested unit does not exist", UnitNotFound),
        ("The requested user is already a member of this branch", UserAlreadyEnrolled),
        ("The requested user is already a member of this group", UserAlreadyEnrolled),
        ("The requested user is already enrolled in this course", UserAlreadyEnrolled),
        ("A user with the same email address already exists", UserAlreadyExists),
        ("A user with the same login already exists", UserAlreadyExists),
        ("The requested user is no longer available", UserDeleted),
        ("The requested user does not exist", UserNotFound),
        (
            "Your account is inactive. Please activate the account using the instructions sent to you via e-mail. If you did not receive the e-mail, check your spam folder.",
            UserInactive,
        ),
        ("The requested user is not a member of this branch", UserNotEnrolled),
        ("The requested user is not a member of this group", UserNotEnrolled),
        ("The requested user is not enrolled in this course", UserNotEnrolled),
        ("User does not have a progress registered for the survey", UserNotEnrolled),
        ("User does not have a progress registered for the test", UserNotEnrolled),
        (
            "Password is not strong enough (should have at least (1) upper case letter, at least (1) lower case letter, at least (1) number, at least (8) characters in length)",
            WeakPassword,
        ),
    ])
});

fn status_kind(status: u16) -> Option<ServiceErrorKind> {
    match status {
        401 | 403 => Some(ServiceErrorKind::AccessDenied),
        429 => Some(ServiceErrorKind::LimitExceeded),
        _ => None,
    }
}

/// Classify a service error: code table, then message table, then HTTP
/// status. Anything left over is `Error::Api`.
pub fn map_service_error(e: ServiceError) -> Error {
    let kind = e
        .code
        .as_deref()
        .and_then(|code| CODE_TABLE.get(code).copied())
        .or_else(|| MESSAGE_TABLE.get(e.message.as_str()).copied())
        .or_else(|| status_kind(e.status));

    match kind {
        Some(kind) => kind.into_error(e),
        None => Error::Api(e),
    }
}
