use std::fmt::{self, Display};

use potion::Error;

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::Database(e) => {
                log::error!("Database error: {e}");
                Self::new(format!("{e}"))
            }
            e => {
                log::error!("Query failed: {e}");
                Self::new(format!("{e}"))
            }
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

/// A foreign key violation means the referenced row is gone, which callers see as
/// `NotFound`. Any other failure is a query error.
pub fn missing_reference(e: sqlx::Error, info: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            ServiceError::NotFound(info.to_owned()).into()
        }
        _ => QueryError::from(e).into(),
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        Error {
            code: 500,
            info: Some(value.info),
            redirect: None,
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

/// Domain failures surfaced to API callers as 4xx responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed or out-of-range input on a specific field.
    Validation { field: &'static str, info: String },
    /// The relation the caller tried to add already exists.
    Conflict(String),
    NotFound(String),
    PermissionDenied(String),
    Unauthorized(String),
}

impl ServiceError {
    pub fn validation(field: &'static str, info: impl Into<String>) -> Self {
        Self::Validation {
            field,
            info: info.into(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ServiceError::Validation { .. } | ServiceError::Conflict(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::PermissionDenied(_) => 403,
            ServiceError::NotFound(_) => 404,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation { field, info } => write!(f, "{field}: {info}"),
            ServiceError::Conflict(info)
            | ServiceError::NotFound(info)
            | ServiceError::PermissionDenied(info)
            | ServiceError::Unauthorized(info) => write!(f, "{info}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<ServiceError> for Error {
    fn from(value: ServiceError) -> Self {
        let info = Some(value.to_string());
        match value {
            ServiceError::Validation { .. } | ServiceError::Conflict(_) => Error {
                code: 400,
                info,
                redirect: None,
            },
            ServiceError::Unauthorized(_) => Error {
                code: 401,
                info,
                redirect: None,
            },
            ServiceError::PermissionDenied(_) => Error {
                code: 403,
                info,
                redirect: None,
            },
            ServiceError::NotFound(_) => Error {
                code: 404,
                info,
                redirect: None,
            },
        }
    }
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl ConfigError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error: {}", self.info)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_query_failures_stay_server_errors() {
        let err = missing_reference(sqlx::Error::PoolTimedOut, "No recipe exists with specified id");
        assert_eq!(err.code as u16, 500);
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = ServiceError::validation("cooking_time", "must be at least 1");
        assert_eq!(err.to_string(), "cooking_time: must be at least 1");
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn service_errors_keep_their_status_through_potion() {
        let cases = [
            (ServiceError::Conflict("dup".into()), 400),
            (ServiceError::Unauthorized("who".into()), 401),
            (ServiceError::PermissionDenied("no".into()), 403),
            (ServiceError::NotFound("gone".into()), 404),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status);
            let converted: Error = err.clone().into();
            assert_eq!(converted.code as u16, status);
            assert_eq!(converted.info, Some(err.to_string()));
        }
    }
}
