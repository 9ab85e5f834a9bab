use thiserror::Error;

use crate::fixture::FixtureScope;

/// Failures raised while producing the value behind a lazy value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LazyError {
    #[error("cannot derive an id for a lazy value with an anonymous getter, give it an explicit id")]
    MissingId,

    #[error(
        "lazy value `{getter}` was declared to return {expected} values but returned {actual}"
    )]
    Arity {
        getter: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "lazy value `{getter}` was declared to return a tuple of {expected} values but returned `{value}`"
    )]
    NotATuple {
        getter: String,
        expected: usize,
        value: String,
    },

    #[error("index {index} is out of range for lazy tuple `{getter}` of size {size}")]
    IndexOutOfRange {
        getter: String,
        index: usize,
        size: usize,
    },

    #[error("getter `{getter}` failed: {message}")]
    Failed { getter: String, message: String },
}

impl LazyError {
    pub fn failed(getter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            getter: getter.into(),
            message: message.into(),
        }
    }
}

/// Registration and evaluation failures of fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureError {
    #[error("Invalid fixture scope: {0}")]
    InvalidScope(String),

    #[error("a fixture named `{name}` already exists in this namespace")]
    NameCollision { name: String },

    #[error("union fixture `{name}` has no alternatives")]
    EmptyUnion { name: String },

    #[error("union fixture `{union_name}` lists alternative `{alternative}` more than once")]
    DuplicateAlternative {
        union_name: String,
        alternative: String,
    },

    #[error("fixture `{name}` is not registered")]
    Unknown { name: String },

    #[error("fixture `{fixture}` failed: {message}")]
    Failed { fixture: String, message: String },
}

impl FixtureError {
    pub fn failed(fixture: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            fixture: fixture.into(),
            message: message.into(),
        }
    }
}

/// Configuration and consistency errors raised while declaring or expanding parametrizations.
///
/// These abort collection of the affected test only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParametrizeError {
    #[error("`{target}`: parametrize needs at least one argument name")]
    EmptyArgnames { target: String },

    #[error("`{target}`: parametrize over `{argnames}` got an empty list of values")]
    EmptyArgvalues { target: String, argnames: String },

    #[error(
        "`{target}`: `{argnames}` names {expected} arguments but value #{index} `{value}` has {actual}"
    )]
    ArgCountMismatch {
        target: String,
        argnames: String,
        index: usize,
        value: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "`{target}`: `{argnames}` names {expected} arguments but value #{index} `{value}` is not a tuple"
    )]
    NotATuple {
        target: String,
        argnames: String,
        index: usize,
        value: String,
        expected: usize,
    },

    #[error(
        "`{target}`: argvalues for `{argnames}` is the fixture reference `{fixture}` itself, wrap it in a list to use it as one value"
    )]
    BareFixtureRef {
        target: String,
        argnames: String,
        fixture: String,
    },

    #[error("`{target}`: argvalues for `{argnames}` must be a list of values, got `{value}`")]
    NotAList {
        target: String,
        argnames: String,
        value: String,
    },

    #[error("`{target}`: {actual} explicit ids were given for {expected} values")]
    IdCountMismatch {
        target: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "id template `{template}` uses `{{{field}}}` but the available fields are: {available}"
    )]
    TemplateField {
        template: String,
        field: String,
        available: String,
    },

    #[error("`{test}`: argument `{argname}` has no value and no fixture provides it")]
    MissingArgument { test: String, argname: String },

    #[error("`{test}`: parametrization of `{names}` does not match any argument or fixture")]
    UnknownArgument { test: String, names: String },

    #[error("`{test}`: no union order was recorded for union fixture `{union_name}`")]
    MissingUnionOrder { test: String, union_name: String },

    #[error("`{test}`: calls were already generated, no more parametrizations can be added")]
    Frozen { test: String },

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Lazy(#[from] LazyError),
}

/// Errors raised while collecting cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseError {
    #[error(
        "case method `{class}.{method}` must take `self` or be declared static to be collected"
    )]
    MissingSelf { class: String, method: String },

    #[error("invalid case glob `{glob}`: {message}")]
    InvalidGlob { glob: String, message: String },

    #[error("invalid case tag filter: {0}")]
    InvalidTagFilter(#[from] casework_metadata::TagFilterError),

    #[error("`{filter}` was given more than once, use a single `{filter}` filter")]
    DuplicateFilter { filter: &'static str },
}

/// Errors raised while executing one call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("fixture `{name}` is not registered")]
    UnknownFixture { name: String },

    #[error("no alternative of union fixture `{union_name}` was selected for this call")]
    MissingSelection { union_name: String },

    #[error("argument `{argname}` has no value in this call")]
    MissingValue { argname: String },

    #[error("{scope} fixture `{fixture}` cannot depend on {dependency_scope} fixture `{dependency}`")]
    ScopeMismatch {
        fixture: String,
        scope: FixtureScope,
        dependency: String,
        dependency_scope: FixtureScope,
    },

    #[error("cannot take element {index} of fixture `{fixture}`: value `{value}` is not a tuple of that size")]
    Unpack {
        fixture: String,
        index: usize,
        value: String,
    },

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Lazy(#[from] LazyError),
}
