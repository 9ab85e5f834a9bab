use std::fmt;

use itertools::Itertools;

use crate::error::ParametrizeError;
use crate::lazy::LazyTuple;
use crate::value::{FixtureRef, Mark, Param, ParamValue};

/// The argument names of one parametrization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ArgNames(Vec<String>);

impl ArgNames {
    /// Parses `"a"`, `"a,b"` or `"a, b"`.
    pub fn parse(names: &str) -> Self {
        Self(
            names.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for ArgNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<&str> for ArgNames {
    fn from(names: &str) -> Self {
        Self::parse(names)
    }
}

impl From<&[&str]> for ArgNames {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|name| (*name).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ArgNames {
    fn from(names: [&str; N]) -> Self {
        Self::from(names.as_slice())
    }
}

impl From<Vec<String>> for ArgNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

/// The raw `argvalues` of a parametrization.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValues {
    List(Vec<Param>),
    /// A single value given where a list was expected.
    Single(ParamValue),
}

impl<T: Into<Param>> From<Vec<T>> for ArgValues {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<FixtureRef> for ArgValues {
    fn from(fixture: FixtureRef) -> Self {
        Self::Single(ParamValue::FixtureRef(fixture))
    }
}

impl From<ParamValue> for ArgValues {
    fn from(value: ParamValue) -> Self {
        Self::Single(value)
    }
}

/// One normalized parameter value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub value: ParamValue,
    pub id: Option<String>,
    pub marks: Vec<Mark>,
}

/// Where a fixture reference was found in the normalized values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRefAt {
    pub index: usize,
    /// Positions inside the tuple at `index`, or `None` when the whole value is a reference.
    pub positions: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedArgs {
    pub argnames: Vec<String>,
    pub entries: Vec<ParamEntry>,
    pub fixture_refs: Vec<FixtureRefAt>,
}

impl NormalizedArgs {
    pub fn ids(&self) -> Vec<Option<&str>> {
        self.entries.iter().map(|entry| entry.id.as_deref()).collect()
    }

    pub fn marks(&self) -> Vec<&[Mark]> {
        self.entries.iter().map(|entry| entry.marks.as_slice()).collect()
    }

    pub fn values(&self) -> Vec<&ParamValue> {
        self.entries.iter().map(|entry| &entry.value).collect()
    }

    pub fn has_fixture_refs(&self) -> bool {
        !self.fixture_refs.is_empty()
    }

    pub fn fixture_ref_at(&self, index: usize) -> Option<&FixtureRefAt> {
        self.fixture_refs.iter().find(|found| found.index == index)
    }

    pub fn argnames_label(&self) -> String {
        self.argnames.join(",")
    }
}

/// Unwraps marked values, checks their shape against `argnames` and records fixture references.
pub fn normalize(
    target: &str,
    argnames: impl Into<ArgNames>,
    argvalues: impl Into<ArgValues>,
) -> Result<NormalizedArgs, ParametrizeError> {
    let argnames = argnames.into();
    if argnames.is_empty() {
        return Err(ParametrizeError::EmptyArgnames {
            target: target.to_string(),
        });
    }
    let label = argnames.to_string();

    let params = match argvalues.into() {
        ArgValues::List(params) => params,
        ArgValues::Single(ParamValue::FixtureRef(fixture)) => {
            return Err(ParametrizeError::BareFixtureRef {
                target: target.to_string(),
                argnames: label,
                fixture: fixture.name().to_string(),
            });
        }
        ArgValues::Single(value) => {
            return Err(ParametrizeError::NotAList {
                target: target.to_string(),
                argnames: label,
                value: value.to_string(),
            });
        }
    };

    if params.is_empty() {
        return Err(ParametrizeError::EmptyArgvalues {
            target: target.to_string(),
            argnames: label,
        });
    }

    let expected = argnames.len();
    let mut entries = Vec::with_capacity(params.len());
    let mut fixture_refs = Vec::new();

    for (index, param) in params.into_iter().enumerate() {
        let (mut id, mut marks, value) = param.into_parts();

        let value = match value {
            ParamValue::FixtureRef(fixture) => {
                fixture_refs.push(FixtureRefAt {
                    index,
                    positions: None,
                });
                ParamValue::FixtureRef(fixture)
            }
            ParamValue::Lazy(lazy) => {
                if id.is_none() {
                    id = lazy.get_id().ok();
                }
                marks.extend(lazy.marks().iter().cloned());
                if expected == 1 {
                    ParamValue::Lazy(lazy)
                } else {
                    ParamValue::Tuple(
                        LazyTuple::new(lazy, expected)
                            .items()
                            .into_iter()
                            .map(ParamValue::LazyItem)
                            .collect(),
                    )
                }
            }
            value if expected == 1 => value,
            ParamValue::Tuple(items) => {
                let positions = items
                    .iter()
                    .positions(ParamValue::is_fixture_ref)
                    .collect::<Vec<_>>();
                if positions.is_empty() {
                    let actual = items.len();
                    if actual != expected {
                        return Err(ParametrizeError::ArgCountMismatch {
                            target: target.to_string(),
                            argnames: label,
                            index,
                            value: ParamValue::Tuple(items).to_string(),
                            expected,
                            actual,
                        });
                    }
                } else {
                    fixture_refs.push(FixtureRefAt {
                        index,
                        positions: Some(positions),
                    });
                }
                ParamValue::Tuple(items)
            }
            other => {
                return Err(ParametrizeError::NotATuple {
                    target: target.to_string(),
                    argnames: label,
                    index,
                    value: other.to_string(),
                    expected,
                });
            }
        };

        entries.push(ParamEntry { value, id, marks });
    }

    tracing::trace!(
        "Normalized {} values for `{target}` over `{label}`, {} with fixture references",
        entries.len(),
        fixture_refs.len()
    );

    Ok(NormalizedArgs {
        argnames: argnames.into_vec(),
        entries,
        fixture_refs,
    })
}
