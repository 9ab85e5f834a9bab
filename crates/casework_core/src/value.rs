use std::fmt;

use itertools::Itertools;

use crate::error::LazyError;
use crate::lazy::{InvocationId, LazyTupleItem, LazyValue};

/// A reference to a fixture by name, usable wherever a parameter value is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixtureRef {
    name: String,
}

impl FixtureRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FixtureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Shorthand for [`FixtureRef::new`].
pub fn fixture_ref(name: impl Into<String>) -> FixtureRef {
    FixtureRef::new(name)
}

/// The values parameters, fixtures and cases produce.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<ParamValue>),
    FixtureRef(FixtureRef),
    Lazy(LazyValue),
    LazyItem(LazyTupleItem),
}

impl ParamValue {
    pub fn tuple<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Self>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    pub const fn as_fixture_ref(&self) -> Option<&FixtureRef> {
        match self {
            Self::FixtureRef(fixture) => Some(fixture),
            _ => None,
        }
    }

    pub const fn is_fixture_ref(&self) -> bool {
        matches!(self, Self::FixtureRef(_))
    }

    pub fn as_tuple(&self) -> Option<&[Self]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Evaluates every lazy value inside `self` for the given invocation.
    ///
    /// Lazy values already evaluated for `invocation` are not evaluated again.
    pub fn resolve_for(&self, invocation: InvocationId) -> Result<Self, LazyError> {
        match self {
            Self::Lazy(lazy) => lazy.get_for(invocation),
            Self::LazyItem(item) => item.force_for(invocation),
            Self::Tuple(items) => items
                .iter()
                .map(|item| item.resolve_for(invocation))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Tuple),
            other => Ok(other.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Str(value) => write!(f, "'{value}'"),
            Self::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Self::Tuple(items) => write!(f, "({})", items.iter().join(", ")),
            Self::FixtureRef(fixture) => write!(f, "fixture_ref({fixture})"),
            Self::Lazy(lazy) => write!(f, "lazy({})", lazy.getter_name()),
            Self::LazyItem(item) => {
                write!(f, "lazy({})[{}]", item.tuple().value().getter_name(), item.index())
            }
        }
    }
}

macro_rules! impl_from_scalar {
    ($($source:ty => |$value:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$source> for ParamValue {
                fn from($value: $source) -> Self {
                    $body
                }
            }

            impl From<$source> for Param {
                fn from(value: $source) -> Self {
                    Param::new(ParamValue::from(value))
                }
            }
        )*
    };
}

impl_from_scalar! {
    () => |_value| ParamValue::None,
    bool => |value| ParamValue::Bool(value),
    i32 => |value| ParamValue::Int(i64::from(value)),
    i64 => |value| ParamValue::Int(value),
    u32 => |value| ParamValue::Int(i64::from(value)),
    f64 => |value| ParamValue::Float(value),
    &str => |value| ParamValue::Str(value.to_string()),
    String => |value| ParamValue::Str(value),
    FixtureRef => |value| ParamValue::FixtureRef(value),
    LazyValue => |value| ParamValue::Lazy(value),
    LazyTupleItem => |value| ParamValue::LazyItem(value),
    Vec<ParamValue> => |value| ParamValue::Tuple(value),
}

macro_rules! impl_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<ParamValue>),+> From<($($name,)+)> for ParamValue {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                ParamValue::Tuple(vec![$($name.into()),+])
            }
        }

        impl<$($name: Into<ParamValue>),+> From<($($name,)+)> for Param {
            fn from(value: ($($name,)+)) -> Self {
                Param::new(ParamValue::from(value))
            }
        }
    };
}

impl_from_tuple!(A);
impl_from_tuple!(A, B);
impl_from_tuple!(A, B, C);
impl_from_tuple!(A, B, C, D);

/// A host-runner annotation attached to a case, a fixture or a parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mark {
    name: String,
    args: Vec<String>,
    kwargs: Vec<(String, String)>,
}

impl Mark {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        Self::new("skip").with_kwarg("reason", reason)
    }

    pub fn xfail(reason: impl Into<String>) -> Self {
        Self::new("xfail").with_kwarg("reason", reason)
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn kwargs(&self) -> &[(String, String)] {
        &self.kwargs
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments = self
            .args
            .iter()
            .map(|arg| format!("'{arg}'"))
            .chain(self.kwargs.iter().map(|(key, value)| format!("{key}='{value}'")))
            .join(", ");
        write!(f, "{}({arguments})", self.name)
    }
}

/// A parameter value, optionally with an explicit id and marks.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    value: ParamValue,
    id: Option<String>,
    marks: Vec<Mark>,
}

impl Param {
    pub fn new(value: impl Into<ParamValue>) -> Self {
        Self {
            value: value.into(),
            id: None,
            marks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.push(mark);
        self
    }

    #[must_use]
    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Self {
        self.marks.extend(marks);
        self
    }

    pub const fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn into_parts(self) -> (Option<String>, Vec<Mark>, ParamValue) {
        (self.id, self.marks, self.value)
    }
}

impl From<ParamValue> for Param {
    fn from(value: ParamValue) -> Self {
        Self::new(value)
    }
}
