/// Stable names for the error taxonomy.
///
/// Every [`MetaError`] maps to exactly one kind; the kind name is part of the
/// stable diagnostic surface and never changes even when the variant payload
/// grows fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Operation issued on an undefined/null value that requires a payload.
    Undefined,
    /// Write attempted on a readonly value or a setter-less property.
    ReadOnly,
    /// A payload could not be interpreted as the expected type.
    TypeMismatch,
    /// A name lookup (method, property, event, type, constructor) failed.
    NotFound,
    /// Strict duplicate registration.
    AlreadyRegistered,
    /// An overload rejected the current argument list.
    ArgumentMismatch,
    /// The conversion engine found no route.
    NoPath,
    /// A conversion edge ran but rejected the runtime value.
    CastFailure,
    /// Capability absent on the concrete type.
    Unsupported,
    /// No registered constructor accepted the arguments.
    ConstructorFailure,
    /// Invariant violation inside the library.
    Internal,
}

impl ErrorKind {
    /// The stable taxonomy name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Undefined => "Undefined",
            ErrorKind::ReadOnly => "ReadOnly",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyRegistered => "AlreadyRegistered",
            ErrorKind::ArgumentMismatch => "ArgumentMismatch",
            ErrorKind::NoPath => "NoPath",
            ErrorKind::CastFailure => "CastFailure",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConstructorFailure => "ConstructorFailure",
            ErrorKind::Internal => "Internal",
        }
    }
}

/// Errors shared by every component of the value system.
///
/// Variants carry the type display name(s) involved and the operation site so
/// a message is actionable without a backtrace.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum MetaError {
    /// Operation requires a payload but the value is undefined/null.
    Undefined {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Write attempted on a readonly value or a setter-less property.
    ReadOnly {
        /// Display name of the value's type.
        type_name: String,
        /// The operation that was refused.
        operation: &'static str,
    },

    /// A payload could not be interpreted as the expected type.
    TypeMismatch {
        /// Display name of the expected type.
        expected: String,
        /// Display name of the actual type.
        actual: String,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A name lookup failed.
    NotFound {
        /// What was looked up: `"type"`, `"method"`, `"property"`, `"event"`,
        /// `"constructor"`.
        what: &'static str,
        /// The name that was not found.
        name: String,
        /// Display name of the type the lookup ran against, when there is one.
        type_name: String,
    },

    /// A name was registered twice under the strict duplicate policy.
    AlreadyRegistered {
        /// The offending registration name.
        name: String,
    },

    /// An overload rejected the current argument list. Internal signal used
    /// by overload resolution; promoted to [`MetaError::NotFound`] when no
    /// overload matches.
    ArgumentMismatch {
        /// Why the argument list was rejected.
        detail: String,
    },

    /// The conversion engine found no route.
    NoPath {
        /// Display name of the source type.
        from: String,
        /// Display name of the target type.
        to: String,
    },

    /// A conversion edge ran but rejected the runtime value.
    CastFailure {
        /// Display name of the source type.
        from: String,
        /// Display name of the target type.
        to: String,
        /// What went wrong at the failing edge.
        detail: String,
    },

    /// Capability absent on the concrete type.
    Unsupported {
        /// The skill that was requested.
        skill: &'static str,
        /// Display name of the concrete type.
        type_name: String,
    },

    /// No registered constructor accepted the arguments.
    ConstructorFailure {
        /// Display name of the type under construction.
        type_name: String,
    },

    /// Invariant violation inside the library.
    Internal {
        /// Diagnostic detail.
        detail: String,
    },
}

impl MetaError {
    /// The stable taxonomy kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            MetaError::Undefined { .. } => ErrorKind::Undefined,
            MetaError::ReadOnly { .. } => ErrorKind::ReadOnly,
            MetaError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            MetaError::NotFound { .. } => ErrorKind::NotFound,
            MetaError::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            MetaError::ArgumentMismatch { .. } => ErrorKind::ArgumentMismatch,
            MetaError::NoPath { .. } => ErrorKind::NoPath,
            MetaError::CastFailure { .. } => ErrorKind::CastFailure,
            MetaError::Unsupported { .. } => ErrorKind::Unsupported,
            MetaError::ConstructorFailure { .. } => ErrorKind::ConstructorFailure,
            MetaError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True when this error is the overload-rejection signal.
    pub const fn is_argument_mismatch(&self) -> bool {
        matches!(self, MetaError::ArgumentMismatch { .. })
    }
}

impl core::fmt::Display for MetaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MetaError::Undefined { operation } => {
                write!(f, "{operation}: value is undefined")
            }
            MetaError::ReadOnly {
                type_name,
                operation,
            } => {
                write!(f, "{operation}: value of type {type_name} is readonly")
            }
            MetaError::TypeMismatch {
                expected,
                actual,
                operation,
            } => {
                write!(f, "{operation}: expected {expected}, found {actual}")
            }
            MetaError::NotFound {
                what,
                name,
                type_name,
            } => {
                if type_name.is_empty() {
                    write!(f, "{what} not found: {name}")
                } else {
                    write!(f, "{what} not found: {name} on type {type_name}")
                }
            }
            MetaError::AlreadyRegistered { name } => {
                write!(f, "already registered: {name}")
            }
            MetaError::ArgumentMismatch { detail } => {
                write!(f, "argument mismatch: {detail}")
            }
            MetaError::NoPath { from, to } => {
                write!(f, "no conversion path from {from} to {to}")
            }
            MetaError::CastFailure { from, to, detail } => {
                write!(f, "conversion from {from} to {to} failed: {detail}")
            }
            MetaError::Unsupported { skill, type_name } => {
                write!(f, "type {type_name} does not support the {skill} skill")
            }
            MetaError::ConstructorFailure { type_name } => {
                write!(f, "no constructor of {type_name} accepted the arguments")
            }
            MetaError::Internal { detail } => write!(f, "internal invariant violated: {detail}"),
        }
    }
}

impl core::error::Error for MetaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        let err = MetaError::NoPath {
            from: "i32".into(),
            to: "String".into(),
        };
        assert_eq!(err.kind(), ErrorKind::NoPath);
        assert_eq!(err.kind().as_str(), "NoPath");
    }

    #[test]
    fn messages_name_the_types_involved() {
        let err = MetaError::TypeMismatch {
            expected: "String".into(),
            actual: "i32".into(),
            operation: "try_cast",
        };
        let text = err.to_string();
        assert!(text.contains("String"));
        assert!(text.contains("i32"));
        assert!(text.contains("try_cast"));
    }
}
