//! Error taxonomy for repository operations
//!
//! Every fallible repository method returns [`RepositoryError`]: a single
//! error shape carrying the operation that failed, a coarse
//! [`RepositoryErrorKind`], and optional entity context. Adapters translate
//! backend-native failures into this taxonomy at the boundary so callers can
//! branch on kinds without knowing which database produced them.
//!
//! Translation is typed-first: SQLSTATE classes and driver error variants are
//! matched before anything else. A keyword scan over the error message exists
//! only as a last-resort shim for backends that surface stringly errors, and
//! is applied when no typed signal was available.

use std::fmt;

/// Result alias used by every repository trait method.
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// The repository operation that produced an error.
///
/// Carried on every [`RepositoryError`] so logs and messages can say what the
/// caller was doing, not just what the database said.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    Create,
    CreateBatch,
    FindById,
    FindAll,
    Search,
    Count,
    Exists,
    Update,
    UpdateBatch,
    Delete,
    DeleteBatch,
    SoftDelete,
    Increment,
    Upsert,
    Enroll,
    Unenroll,
    Statistics,
    Random,
    Configure,
}

impl RepositoryOperation {
    /// Stable snake_case name used in messages and structured logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::CreateBatch => "create_batch",
            Self::FindById => "find_by_id",
            Self::FindAll => "find_all",
            Self::Search => "search",
            Self::Count => "count",
            Self::Exists => "exists",
            Self::Update => "update",
            Self::UpdateBatch => "update_batch",
            Self::Delete => "delete",
            Self::DeleteBatch => "delete_batch",
            Self::SoftDelete => "soft_delete",
            Self::Increment => "increment",
            Self::Upsert => "upsert",
            Self::Enroll => "enroll",
            Self::Unenroll => "unenroll",
            Self::Statistics => "statistics",
            Self::Random => "random",
            Self::Configure => "configure",
        }
    }
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a repository failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// The requested entity does not exist.
    NotFound,
    /// The input was rejected before or by the backing store.
    Validation,
    /// A uniqueness constraint was violated.
    Duplicate,
    /// The backing store failed or misbehaved.
    Database,
    /// The configured credentials were not allowed to perform the operation.
    Permission,
}

impl RepositoryErrorKind {
    /// Stable machine-readable code, mirrored in client payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION_ERROR",
            Self::Duplicate => "DUPLICATE_ERROR",
            Self::Database => "DATABASE_ERROR",
            Self::Permission => "PERMISSION_ERROR",
        }
    }
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned by every repository operation.
///
/// # Example
///
/// ```
/// use learnlab_data::error::{RepositoryError, RepositoryOperation};
///
/// let err = RepositoryError::not_found(RepositoryOperation::FindById, "question does not exist")
///     .with_entity("question")
///     .with_entity_id("0d9f4a11-8c3b-4e9e-9a57-1f2d3c4b5a69");
///
/// assert!(err.is_not_found());
/// assert!(err.to_string().contains("NOT_FOUND during find_by_id"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryError {
    /// What the caller was doing when the failure occurred.
    pub operation: RepositoryOperation,
    /// Coarse classification, stable across backends.
    pub kind: RepositoryErrorKind,
    /// Human-readable description of the failure.
    pub message: String,
    /// Entity type involved, when known (`"question"`, `"user"`, ...).
    pub entity_type: Option<&'static str>,
    /// Identifier of the entity involved, when known.
    pub entity_id: Option<String>,
    /// Backend-specific detail preserved for debugging (constraint name,
    /// SQLSTATE, ...). Never required to interpret the error.
    pub details: Option<String>,
}

impl RepositoryError {
    /// Creates an error with the given kind, operation, and message.
    pub fn new(
        kind: RepositoryErrorKind,
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            details: None,
        }
    }

    /// Creates a [`RepositoryErrorKind::NotFound`] error.
    pub fn not_found(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(RepositoryErrorKind::NotFound, operation, message)
    }

    /// Creates a [`RepositoryErrorKind::Validation`] error.
    pub fn validation(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(RepositoryErrorKind::Validation, operation, message)
    }

    /// Creates a [`RepositoryErrorKind::Duplicate`] error.
    pub fn duplicate(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(RepositoryErrorKind::Duplicate, operation, message)
    }

    /// Creates a [`RepositoryErrorKind::Database`] error.
    pub fn database(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(RepositoryErrorKind::Database, operation, message)
    }

    /// Creates a [`RepositoryErrorKind::Permission`] error.
    pub fn permission(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(RepositoryErrorKind::Permission, operation, message)
    }

    /// Attaches the entity type involved in the failure.
    #[must_use]
    pub fn with_entity(mut self, entity_type: &'static str) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    /// Attaches the identifier of the entity involved in the failure.
    #[must_use]
    pub fn with_entity_id(mut self, id: impl fmt::Display) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Attaches backend-specific detail (constraint name, SQLSTATE, ...).
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns `true` when the entity did not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }

    /// Returns `true` when a uniqueness constraint was violated.
    pub fn is_duplicate(&self) -> bool {
        self.kind == RepositoryErrorKind::Duplicate
    }

    /// Returns `true` when the input was rejected as invalid.
    pub fn is_validation(&self) -> bool {
        self.kind == RepositoryErrorKind::Validation
    }

    /// Returns `true` for transient infrastructure failures worth retrying.
    ///
    /// Only [`RepositoryErrorKind::Database`] errors qualify, and only when
    /// the failure looks like a connection, pool, or timeout problem rather
    /// than a malformed query.
    pub fn is_retriable(&self) -> bool {
        if self.kind != RepositoryErrorKind::Database {
            return false;
        }
        let text = self.message.to_ascii_lowercase();
        text.contains("connection")
            || text.contains("timed out")
            || text.contains("timeout")
            || text.contains("pool")
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} during {}: {}", self.kind, self.operation, self.message)?;
        if let Some(entity_type) = self.entity_type {
            write!(f, " (entity: {entity_type}")?;
            if let Some(id) = &self.entity_id {
                write!(f, " {id}")?;
            }
            write!(f, ")")?;
        }
        if let Some(details) = &self.details {
            write!(f, " [details: {details}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

/// Translates a raw sqlx failure into the repository taxonomy.
///
/// Typed driver variants and SQLSTATE classes are matched first; anything
/// that reaches the bottom falls through to [`classify_message`].
pub(crate) fn classify_sqlx(operation: RepositoryOperation, err: sqlx::Error) -> RepositoryError {
    use sqlx::Error as E;

    match err {
        E::RowNotFound => RepositoryError::not_found(operation, "no row matched the query"),
        E::Database(db) => classify_database(operation, db.as_ref()),
        E::PoolTimedOut => RepositoryError::database(
            operation,
            "connection pool timed out waiting for a connection",
        ),
        E::PoolClosed => RepositoryError::database(operation, "connection pool is closed"),
        E::Io(io) => RepositoryError::database(operation, format!("connection I/O error: {io}")),
        E::Tls(tls) => RepositoryError::database(operation, format!("TLS error: {tls}")),
        E::Protocol(msg) => {
            RepositoryError::database(operation, format!("protocol violation: {msg}"))
        }
        E::Configuration(cfg) => {
            RepositoryError::database(operation, format!("connection configuration error: {cfg}"))
        }
        E::ColumnNotFound(column) => {
            RepositoryError::database(operation, format!("column not found: {column}"))
        }
        E::ColumnDecode { index, source } => RepositoryError::database(
            operation,
            format!("failed to decode column {index}: {source}"),
        ),
        E::Decode(source) => {
            RepositoryError::database(operation, format!("decode error: {source}"))
        }
        E::TypeNotFound { type_name } => {
            RepositoryError::database(operation, format!("type not found: {type_name}"))
        }
        E::WorkerCrashed => RepositoryError::database(operation, "database worker crashed"),
        other => classify_message(operation, &other.to_string()),
    }
}

/// Classifies an error reported by the database server itself.
fn classify_database(
    operation: RepositoryOperation,
    db: &dyn sqlx::error::DatabaseError,
) -> RepositoryError {
    use sqlx::error::ErrorKind;

    match db.kind() {
        ErrorKind::UniqueViolation => {
            let err = RepositoryError::duplicate(operation, db.message());
            match db.constraint() {
                Some(constraint) => err.with_details(format!("constraint {constraint}")),
                None => err,
            }
        }
        ErrorKind::ForeignKeyViolation => RepositoryError::database(operation, db.message())
            .with_details("foreign key violation"),
        ErrorKind::NotNullViolation => {
            RepositoryError::validation(operation, db.message()).with_details("not-null violation")
        }
        ErrorKind::CheckViolation => {
            RepositoryError::validation(operation, db.message()).with_details("check violation")
        }
        _ => match db.code().as_deref() {
            // insufficient_privilege / invalid_authorization_specification
            Some("42501") | Some("28000") | Some("28P01") => {
                RepositoryError::permission(operation, db.message())
            }
            Some(code) => {
                classify_message(operation, db.message()).with_details(format!("sqlstate {code}"))
            }
            None => classify_message(operation, db.message()),
        },
    }
}

/// Last-resort keyword classification over a raw error message.
///
/// Some backends only expose failures as strings. Scanning for a handful of
/// stable keywords keeps their errors in the same taxonomy; any message that
/// matches nothing is reported as a plain database failure.
pub(crate) fn classify_message(
    operation: RepositoryOperation,
    message: &str,
) -> RepositoryError {
    let lower = message.to_ascii_lowercase();
    let kind = if lower.contains("duplicate") || lower.contains("unique") {
        RepositoryErrorKind::Duplicate
    } else if lower.contains("not found") || lower.contains("pgrst116") {
        // PGRST116 is the PostgREST zero-rows code; gateways pass it
        // through verbatim in the message text.
        RepositoryErrorKind::NotFound
    } else if lower.contains("permission") || lower.contains("forbidden") {
        RepositoryErrorKind::Permission
    } else {
        RepositoryErrorKind::Database
    };
    RepositoryError::new(kind, operation, message)
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[derive(Debug)]
    struct StubDbError {
        message: String,
        code: Option<String>,
        constraint: Option<String>,
        kind: sqlx::error::ErrorKind,
    }

    impl StubDbError {
        fn new(message: &str, kind: sqlx::error::ErrorKind) -> Self {
            Self {
                message: message.to_string(),
                code: None,
                constraint: None,
                kind,
            }
        }

        fn with_code(mut self, code: &str) -> Self {
            self.code = Some(code.to_string());
            self
        }

        fn with_constraint(mut self, constraint: &str) -> Self {
            self.constraint = Some(constraint.to_string());
            self
        }
    }

    impl fmt::Display for StubDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            &self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.as_deref().map(Cow::Borrowed)
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint.as_deref()
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            // sqlx's ErrorKind is neither Copy nor Clone, so reconstruct the
            // variant instead of moving it out of &self.
            use sqlx::error::ErrorKind;
            match self.kind {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::NotNullViolation => ErrorKind::NotNullViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(stub: StubDbError) -> sqlx::Error {
        sqlx::Error::Database(Box::new(stub))
    }

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(RepositoryErrorKind::NotFound.code(), "NOT_FOUND");
        assert_eq!(RepositoryErrorKind::Validation.code(), "VALIDATION_ERROR");
        assert_eq!(RepositoryErrorKind::Duplicate.code(), "DUPLICATE_ERROR");
        assert_eq!(RepositoryErrorKind::Database.code(), "DATABASE_ERROR");
        assert_eq!(RepositoryErrorKind::Permission.code(), "PERMISSION_ERROR");
    }

    #[test]
    fn display_includes_operation_kind_and_context() {
        let err = RepositoryError::not_found(RepositoryOperation::FindById, "question missing")
            .with_entity("question")
            .with_entity_id("abc-123")
            .with_details("sqlstate 02000");

        let rendered = err.to_string();
        assert!(rendered.contains("NOT_FOUND during find_by_id: question missing"));
        assert!(rendered.contains("(entity: question abc-123)"));
        assert!(rendered.contains("[details: sqlstate 02000]"));
    }

    #[test]
    fn display_without_context_is_compact() {
        let err = RepositoryError::database(RepositoryOperation::Count, "boom");
        assert_eq!(err.to_string(), "DATABASE_ERROR during count: boom");
    }

    #[test]
    fn constructors_set_the_expected_kind() {
        let op = RepositoryOperation::Create;
        assert!(RepositoryError::not_found(op, "x").is_not_found());
        assert!(RepositoryError::duplicate(op, "x").is_duplicate());
        assert!(RepositoryError::validation(op, "x").is_validation());
        assert_eq!(
            RepositoryError::permission(op, "x").kind,
            RepositoryErrorKind::Permission
        );
        assert_eq!(
            RepositoryError::database(op, "x").kind,
            RepositoryErrorKind::Database
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = classify_sqlx(RepositoryOperation::FindById, sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
        assert_eq!(err.operation, RepositoryOperation::FindById);
    }

    #[test]
    fn pool_failures_map_to_retriable_database_errors() {
        let timed_out = classify_sqlx(RepositoryOperation::FindAll, sqlx::Error::PoolTimedOut);
        assert_eq!(timed_out.kind, RepositoryErrorKind::Database);
        assert!(timed_out.is_retriable());

        let closed = classify_sqlx(RepositoryOperation::FindAll, sqlx::Error::PoolClosed);
        assert_eq!(closed.kind, RepositoryErrorKind::Database);
        assert!(closed.is_retriable());
    }

    #[test]
    fn unique_violation_maps_to_duplicate_with_constraint() {
        let stub = StubDbError::new(
            "duplicate key value violates unique constraint \"users_email_key\"",
            sqlx::error::ErrorKind::UniqueViolation,
        )
        .with_code("23505")
        .with_constraint("users_email_key");

        let err = classify_sqlx(RepositoryOperation::Create, db_error(stub));
        assert!(err.is_duplicate());
        assert_eq!(err.details.as_deref(), Some("constraint users_email_key"));
    }

    #[test]
    fn check_violation_maps_to_validation() {
        let stub = StubDbError::new(
            "new row for relation \"plan_enrollments\" violates check constraint",
            sqlx::error::ErrorKind::CheckViolation,
        )
        .with_code("23514");

        let err = classify_sqlx(RepositoryOperation::Update, db_error(stub));
        assert!(err.is_validation());
    }

    #[test]
    fn insufficient_privilege_maps_to_permission() {
        let stub = StubDbError::new(
            "permission denied for table users",
            sqlx::error::ErrorKind::Other,
        )
        .with_code("42501");

        let err = classify_sqlx(RepositoryOperation::Delete, db_error(stub));
        assert_eq!(err.kind, RepositoryErrorKind::Permission);
    }

    #[test]
    fn unknown_sqlstate_falls_back_to_keyword_scan() {
        let stub = StubDbError::new(
            "relation \"questions\" not found",
            sqlx::error::ErrorKind::Other,
        )
        .with_code("42P01");

        let err = classify_sqlx(RepositoryOperation::FindAll, db_error(stub));
        assert!(err.is_not_found());
        assert_eq!(err.details.as_deref(), Some("sqlstate 42P01"));
    }

    #[test]
    fn keyword_scan_classifies_the_documented_vocabulary() {
        let op = RepositoryOperation::Create;
        assert!(classify_message(op, "duplicate key value").is_duplicate());
        assert!(classify_message(op, "UNIQUE constraint failed").is_duplicate());
        assert!(classify_message(op, "row not found").is_not_found());
        assert!(classify_message(op, "PGRST116: zero rows returned").is_not_found());
        assert_eq!(
            classify_message(op, "permission denied").kind,
            RepositoryErrorKind::Permission
        );
        assert_eq!(
            classify_message(op, "forbidden by policy").kind,
            RepositoryErrorKind::Permission
        );
        assert_eq!(
            classify_message(op, "something exploded").kind,
            RepositoryErrorKind::Database
        );
    }

    #[test]
    fn retriable_is_limited_to_database_kind() {
        let op = RepositoryOperation::FindAll;
        assert!(RepositoryError::database(op, "connection refused").is_retriable());
        assert!(RepositoryError::database(op, "statement timeout").is_retriable());
        assert!(!RepositoryError::database(op, "syntax error at or near").is_retriable());
        assert!(!RepositoryError::not_found(op, "connection missing").is_retriable());
    }
}
