//! Error types for manifest extraction, composition, and resolution.

use thiserror::Error;

/// Error codes for manifest validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// E001: Invalid manifest name format
    InvalidName,
    /// E002: Entry in `inputs` is not file-classified
    InputNotFileBased,
    /// E003: Key present in both `config` and `inputs`
    DuplicateKey,
    /// E004: File-classified entry placed under `config`
    FileBasedConfig,
    /// E005: Enum values of mixed types
    MixedEnumValues,
    /// E006: Minimum bound above maximum bound
    InvalidBounds,
    /// E007: Missing interface identity in the extension block
    MissingInterface,
    /// E008: Entries out of contractual order
    OrderingViolation,
    /// E009: Entry carries neither a type nor a file classification
    UntypedEntry,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidName => "E001",
            ErrorCode::InputNotFileBased => "E002",
            ErrorCode::DuplicateKey => "E003",
            ErrorCode::FileBasedConfig => "E004",
            ErrorCode::MixedEnumValues => "E005",
            ErrorCode::InvalidBounds => "E006",
            ErrorCode::MissingInterface => "E007",
            ErrorCode::OrderingViolation => "E008",
            ErrorCode::UntypedEntry => "E009",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Warning codes for manifest validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// W001: Missing label
    MissingLabel,
    /// W002: Missing description
    MissingDescription,
    /// W003: Mandatory entry carrying a default
    MandatoryWithDefault,
}

impl WarningCode {
    /// Returns the warning code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::MissingLabel => "W001",
            WarningCode::MissingDescription => "W002",
            WarningCode::MandatoryWithDefault => "W003",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with code, message, and optional manifest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Path to the problematic field (e.g., "inputs.moving_image").
    pub path: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new validation error with a field path.
    pub fn with_path(code: ErrorCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validation warning with code, message, and optional manifest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The warning code.
    pub code: WarningCode,
    /// Human-readable warning message.
    pub message: String,
    /// Path to the problematic field.
    pub path: Option<String>,
}

impl ValidationWarning {
    /// Creates a new validation warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new validation warning with a field path.
    pub fn with_path(
        code: WarningCode,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Result of manifest validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether validation passed (no errors).
    pub ok: bool,
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of validation warnings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
        self.ok = false;
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Converts to a Result, returning Err if there are errors.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        if self.ok {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::success()
    }
}

/// Structural merge failure when folding spec-tree control entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The new value is a sequence but the inherited value is not.
    #[error("cannot extend {found} with a sequence")]
    SequenceOntoScalar {
        /// Shape name of the inherited value.
        found: &'static str,
    },

    /// The new value is a mapping but the inherited value is not.
    #[error("cannot meld {found} with a mapping")]
    MappingOntoScalar {
        /// Shape name of the inherited value.
        found: &'static str,
    },
}

/// Failure to map one parameter descriptor into a canonical schema entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// List and tuple parameters have no packaging-format representation.
    #[error("list/tuple parameter '{param}' is not supported by the packaging target")]
    UnsupportedSequence {
        /// Name of the offending parameter.
        param: String,
    },

    /// Compound/union parameters have no packaging-format representation.
    #[error("compound parameter '{param}' is not supported by the packaging target")]
    UnsupportedCompound {
        /// Name of the offending parameter.
        param: String,
    },

    /// A multi-valued path parameter whose inner type is neither file- nor
    /// text-like.
    #[error("multi-path parameter '{param}' has unsupported inner type '{inner}'")]
    UnsupportedMultiPath {
        /// Name of the offending parameter.
        param: String,
        /// Shape name of the inner type.
        inner: String,
    },
}

/// Non-fatal finding recorded while mapping parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapWarning {
    /// Name of the parameter the finding refers to.
    pub param: String,
    /// Human-readable message.
    pub message: String,
}

impl std::fmt::Display for MapWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.param, self.message)
    }
}

/// Structural authoring defects in the spec tree. These are the only
/// composition failures that abort a whole traversal; everything else
/// degrades to a node-scoped skip.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A node declares a root anchor below an already-anchored path.
    #[error("conflicting root anchor at '{path}'")]
    ConflictingRoot {
        /// Tree path of the offending node.
        path: String,
    },

    /// Control entries of incompatible shapes along one inheritance chain.
    #[error("cannot merge control entries at '{path}': {source}")]
    Merge {
        /// Tree path of the offending node.
        path: String,
        /// Underlying merge failure.
        #[source]
        source: MergeError,
    },
}

/// Failure reported by an artifact sink for one node.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The manifest failed structural validation; it was not published.
    #[error("manifest failed validation with {count} error(s): {first}")]
    Validation {
        /// Number of validation errors.
        count: usize,
        /// First error, for the one-line summary.
        first: String,
    },

    /// Filesystem failure while writing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to resolve call arguments for one execution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// More than one file bound to a single declared input.
    #[error("input '{param}' matched {count} files; at most one is supported")]
    AmbiguousInput {
        /// Name of the declared input.
        param: String,
        /// Number of files found.
        count: usize,
    },

    /// The manifest's interface identity is not known to the registry.
    #[error("interface '{identity}' not found in registry")]
    UnknownInterface {
        /// The fully-qualified identity from the manifest.
        identity: String,
    },

    /// Filesystem failure while scanning input directories.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for gearsmith operations.
#[derive(Debug, Error)]
pub enum SpecError {
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Spec tree authoring defect.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Argument resolution failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
