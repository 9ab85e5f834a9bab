use crate::alternatives::Alternative;
use crate::ids::{IdPart, RenderedParam, named_values};
use crate::value::{Mark, ParamValue};

/// What a parameter receives in one call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallValue {
    Value(ParamValue),
    /// The alternative a union fixture resolves to.
    Alternative(Alternative),
    /// The parameter belongs to a branch this call does not take.
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallParam {
    pub value: CallValue,
    /// Whether the value is handed to the fixture of the same name rather than to the test.
    pub indirect: bool,
}

/// One concrete invocation of a test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallSpec {
    params: Vec<(String, CallParam)>,
    id_parts: Vec<IdPart>,
    marks: Vec<Mark>,
    id: String,
}

impl CallSpec {
    /// Parameters in the order they were assigned.
    pub fn params(&self) -> &[(String, CallParam)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&CallParam> {
        self.params
            .iter()
            .find(|(param_name, _)| param_name == name)
            .map(|(_, param)| param)
    }

    pub fn value(&self, name: &str) -> Option<&CallValue> {
        self.param(name).map(|param| &param.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.param(name).is_some()
    }

    pub fn is_not_applicable(&self, name: &str) -> bool {
        matches!(self.value(name), Some(CallValue::NotApplicable))
    }

    /// The alternative selected for `union_name` in this call.
    pub fn selected_alternative(&self, union_name: &str) -> Option<&Alternative> {
        match self.value(union_name) {
            Some(CallValue::Alternative(alternative)) => Some(alternative),
            _ => None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn id_parts(&self) -> &[IdPart] {
        &self.id_parts
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub(crate) fn push_param(&mut self, name: impl Into<String>, value: CallValue, indirect: bool) {
        self.params
            .push((name.into(), CallParam { value, indirect }));
    }

    /// Assigns one parameter set of a parametrization over `argnames`.
    pub(crate) fn apply(&mut self, argnames: &[String], param: &RenderedParam, indirect: bool) {
        for (argname, value) in named_values(argnames, &param.value) {
            self.push_param(argname, CallValue::Value(value), indirect);
        }
        self.id_parts.push(IdPart::shown(param.id.clone()));
        self.marks.extend(param.marks.iter().cloned());
    }

    pub(crate) fn push_id_part(&mut self, part: IdPart) {
        self.id_parts.push(part);
    }

    pub(crate) fn extend_marks(&mut self, marks: &[Mark]) {
        self.marks.extend(marks.iter().cloned());
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
