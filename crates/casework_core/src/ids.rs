//! Rendering of call ids.
//!
//! Every parametrization contributes one fragment per value, every union one fragment per
//! alternative. Fragments of a call are joined with `-`, and ids that collide in the final list
//! are disambiguated with a numeric suffix.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock};

use casework_metadata::IdStyleName;
use itertools::Itertools;
use regex::Regex;

use crate::alternatives::{Alternative, AlternativeKind};
use crate::argset::ParamEntry;
use crate::error::ParametrizeError;
use crate::value::{Mark, ParamValue};

pub type IdCallable = Arc<dyn Fn(&[(String, ParamValue)]) -> String + Send + Sync>;

static TEMPLATE_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// A user supplied id generator.
#[derive(Clone)]
pub enum IdGen {
    /// Receives the named values of one parameter set.
    Callable(IdCallable),
    /// A string with `{name}` fields, filled with the rendered values.
    Template(String),
}

/// How a parameter set or an alternative is rendered into an id fragment.
#[derive(Clone, Default)]
pub enum IdStyle {
    /// `a=1-b=2` for values, `union/alternative` for unions.
    Explicit,
    /// `1-2` for values, `/alternative` for unions.
    Compact,
    /// `1-2` for values, `alternative` for unions.
    #[default]
    None,
    Custom(IdGen),
}

impl IdStyle {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&[(String, ParamValue)]) -> String + Send + Sync + 'static,
    {
        Self::Custom(IdGen::Callable(Arc::new(f)))
    }

    pub fn template(template: impl Into<String>) -> Self {
        Self::Custom(IdGen::Template(template.into()))
    }
}

impl From<IdStyleName> for IdStyle {
    fn from(name: IdStyleName) -> Self {
        match name {
            IdStyleName::Explicit => Self::Explicit,
            IdStyleName::Compact => Self::Compact,
            IdStyleName::None => Self::None,
        }
    }
}

impl fmt::Debug for IdStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => f.write_str("Explicit"),
            Self::Compact => f.write_str("Compact"),
            Self::None => f.write_str("None"),
            Self::Custom(IdGen::Callable(_)) => f.write_str("Custom(<callable>)"),
            Self::Custom(IdGen::Template(template)) => write!(f, "Custom({template:?})"),
        }
    }
}

/// One fragment of a call id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPart {
    pub text: String,
    /// Hidden fragments are kept for bookkeeping but never rendered.
    pub hidden: bool,
}

impl IdPart {
    pub fn shown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hidden: false,
        }
    }

    pub fn hidden(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hidden: true,
        }
    }
}

/// A parameter value together with its final id fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedParam {
    pub value: ParamValue,
    pub id: String,
    pub marks: Vec<Mark>,
}

/// The id fragment of a single value when no explicit id is given.
pub fn value_id(argname: &str, value: &ParamValue, index: usize) -> String {
    match value {
        ParamValue::None => "None".to_string(),
        ParamValue::Bool(true) => "True".to_string(),
        ParamValue::Bool(false) => "False".to_string(),
        ParamValue::Int(value) => value.to_string(),
        ParamValue::Float(value) => format!("{value:?}"),
        ParamValue::Str(value) => value.clone(),
        ParamValue::FixtureRef(fixture) => fixture.name().to_string(),
        ParamValue::Lazy(lazy) => lazy
            .get_id()
            .unwrap_or_else(|_| format!("{argname}{index}")),
        ParamValue::LazyItem(item) => item
            .get_id()
            .unwrap_or_else(|_| format!("{argname}{index}")),
        ParamValue::Tuple(_) => format!("{argname}{index}"),
    }
}

/// Pairs each argument name with its part of `value`.
pub fn named_values(argnames: &[String], value: &ParamValue) -> Vec<(String, ParamValue)> {
    match (argnames, value) {
        ([argname], value) => vec![(argname.clone(), value.clone())],
        (argnames, ParamValue::Tuple(items)) => argnames
            .iter()
            .cloned()
            .zip(items.iter().cloned())
            .collect(),
        (argnames, value) => argnames
            .iter()
            .map(|argname| (argname.clone(), value.clone()))
            .collect(),
    }
}

/// Renders the id fragment of the parameter set at `index`.
pub fn param_id(
    argnames: &[String],
    value: &ParamValue,
    index: usize,
    style: &IdStyle,
) -> Result<String, ParametrizeError> {
    let named = named_values(argnames, value);
    match style {
        IdStyle::Explicit => Ok(named
            .iter()
            .map(|(argname, value)| format!("{argname}={}", value_id(argname, value, index)))
            .join("-")),
        IdStyle::Compact | IdStyle::None => Ok(named
            .iter()
            .map(|(argname, value)| value_id(argname, value, index))
            .join("-")),
        IdStyle::Custom(IdGen::Callable(callable)) => Ok(callable(&named)),
        IdStyle::Custom(IdGen::Template(template)) => render_template(template, &named, index),
    }
}

fn render_template(
    template: &str,
    named: &[(String, ParamValue)],
    index: usize,
) -> Result<String, ParametrizeError> {
    if let Some(missing) = TEMPLATE_FIELD
        .captures_iter(template)
        .map(|captures| captures[1].to_string())
        .find(|field| named.iter().all(|(argname, _)| argname != field))
    {
        return Err(ParametrizeError::TemplateField {
            template: template.to_string(),
            field: missing,
            available: named.iter().map(|(argname, _)| argname).join(", "),
        });
    }

    Ok(TEMPLATE_FIELD
        .replace_all(template, |captures: &regex::Captures<'_>| {
            named
                .iter()
                .find(|(argname, _)| *argname == captures[1])
                .map(|(argname, value)| value_id(argname, value, index))
                .unwrap_or_default()
        })
        .into_owned())
}

/// Renders the ids of a whole parameter list.
///
/// Explicit ids win over ids carried by the values, which win over `style`. Duplicates are made
/// unique.
pub fn render_params(
    target: &str,
    argnames: &[String],
    entries: Vec<ParamEntry>,
    explicit_ids: Option<&[String]>,
    style: &IdStyle,
) -> Result<Vec<RenderedParam>, ParametrizeError> {
    if let Some(ids) = explicit_ids
        && ids.len() != entries.len()
    {
        return Err(ParametrizeError::IdCountMismatch {
            target: target.to_string(),
            expected: entries.len(),
            actual: ids.len(),
        });
    }

    let ids = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            match explicit_ids
                .and_then(|ids| ids.get(index))
                .or(entry.id.as_ref())
            {
                Some(id) => Ok(id.clone()),
                None => param_id(argnames, &entry.value, index, style),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries
        .into_iter()
        .zip(make_unique(ids))
        .map(|(entry, id)| RenderedParam {
            value: entry.value,
            id,
            marks: entry.marks,
        })
        .collect())
}

/// The id fragment a union contributes for `alternative`.
pub fn alternative_part(
    alternative: &Alternative,
    style: &IdStyle,
) -> Result<IdPart, ParametrizeError> {
    let union_name = alternative.union_name();
    let id = alternative.id();
    let text = match style {
        IdStyle::Explicit => format!("{union_name}/{id}"),
        IdStyle::Compact => format!("/{id}"),
        IdStyle::None => id.to_string(),
        IdStyle::Custom(IdGen::Callable(callable)) => {
            callable(&[(union_name.to_string(), ParamValue::Str(id.to_string()))])
        }
        IdStyle::Custom(IdGen::Template(template)) => render_template(
            template,
            &[(union_name.to_string(), ParamValue::Str(id.to_string()))],
            0,
        )?,
    };

    Ok(if matches!(alternative.kind(), AlternativeKind::MultiParam { .. }) {
        IdPart::hidden(text)
    } else {
        IdPart::shown(text)
    })
}

/// Joins the visible fragments of a call.
pub fn join_parts(parts: &[IdPart]) -> String {
    parts
        .iter()
        .filter(|part| !part.hidden)
        .map(|part| part.text.as_str())
        .join("-")
}

/// Suffixes every id that occurs more than once with its occurrence number.
///
/// The suffix is separated by `_` when the id already ends with a digit.
pub fn make_unique(ids: Vec<String>) -> Vec<String> {
    let counts = ids.iter().cloned().counts();
    if counts.values().all(|count| *count == 1) {
        return ids;
    }

    let mut taken: HashSet<String> = counts
        .iter()
        .filter(|(_, count)| **count == 1)
        .map(|(id, _)| id.clone())
        .collect();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();

    ids.into_iter()
        .map(|id| {
            if counts.get(&id).copied() == Some(1) {
                return id;
            }
            let separator = if id.ends_with(|c: char| c.is_ascii_digit()) {
                "_"
            } else {
                ""
            };
            let suffix = next_suffix.entry(id.clone()).or_insert(0);
            loop {
                let candidate = format!("{id}{separator}{suffix}");
                *suffix += 1;
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}
