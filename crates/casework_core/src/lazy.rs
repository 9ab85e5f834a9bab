//! Deferred values.
//!
//! A [`LazyValue`] wraps a zero-argument getter that is only invoked when a call actually runs.
//! A [`LazyTuple`] is a view over a lazy value that is known to produce a fixed-size tuple, so
//! its positions can be spread over several argument names before anything is evaluated.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use itertools::Itertools;

use crate::error::LazyError;
use crate::value::{Mark, ParamValue};

pub type Getter = Arc<dyn Fn() -> Result<ParamValue, LazyError> + Send + Sync>;

/// Identifies one execution of a test call.
///
/// Lazy values are evaluated at most once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(u64);

impl InvocationId {
    /// The invocation used when a value is forced outside of any call.
    pub const DETACHED: Self = Self(0);

    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How the getter of a lazy value is named, which is what its default id is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetterName {
    Named(String),
    /// A getter with some arguments already bound, rendered as `name(arg, ...)`.
    Partial {
        name: String,
        args: Vec<String>,
    },
    Anonymous,
}

impl fmt::Display for GetterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Partial { name, args } => write!(f, "{name}({})", args.iter().join(", ")),
            Self::Anonymous => f.write_str("<anonymous>"),
        }
    }
}

type Slot<T> = Arc<Mutex<Option<(InvocationId, T)>>>;

#[derive(Clone)]
pub struct LazyValue {
    getter: Getter,
    name: GetterName,
    id: Option<String>,
    marks: Vec<Mark>,
    cache: Slot<ParamValue>,
}

impl LazyValue {
    fn from_getter(name: GetterName, getter: Getter) -> Self {
        Self {
            getter,
            name,
            id: None,
            marks: Vec::new(),
            cache: Arc::default(),
        }
    }

    pub fn new<F>(name: impl Into<String>, getter: F) -> Self
    where
        F: Fn() -> Result<ParamValue, LazyError> + Send + Sync + 'static,
    {
        Self::from_getter(GetterName::Named(name.into()), Arc::new(getter))
    }

    pub fn partial<F>(name: impl Into<String>, args: Vec<String>, getter: F) -> Self
    where
        F: Fn() -> Result<ParamValue, LazyError> + Send + Sync + 'static,
    {
        Self::from_getter(
            GetterName::Partial {
                name: name.into(),
                args,
            },
            Arc::new(getter),
        )
    }

    pub fn anonymous<F>(getter: F) -> Self
    where
        F: Fn() -> Result<ParamValue, LazyError> + Send + Sync + 'static,
    {
        Self::from_getter(GetterName::Anonymous, Arc::new(getter))
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_marks(mut self, marks: impl IntoIterator<Item = Mark>) -> Self {
        self.marks.extend(marks);
        self
    }

    pub const fn getter_name(&self) -> &GetterName {
        &self.name
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn explicit_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get_id(&self) -> Result<String, LazyError> {
        if let Some(id) = &self.id {
            return Ok(id.clone());
        }
        match &self.name {
            GetterName::Anonymous => Err(LazyError::MissingId),
            name => Ok(name.to_string()),
        }
    }

    /// Invokes the getter. Nothing is cached.
    pub fn get(&self) -> Result<ParamValue, LazyError> {
        tracing::trace!("Evaluating lazy value `{}`", self.name);
        (self.getter)()
    }

    /// Invokes the getter unless it already ran for `invocation`.
    pub fn get_for(&self, invocation: InvocationId) -> Result<ParamValue, LazyError> {
        if let Some((cached_for, value)) = &*lock(&self.cache)
            && *cached_for == invocation
        {
            return Ok(value.clone());
        }

        let value = self.get()?;
        *lock(&self.cache) = Some((invocation, value.clone()));
        Ok(value)
    }
}

fn lock<T>(slot: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("marks", &self.marks)
            .finish_non_exhaustive()
    }
}

/// Two lazy values are equal when they share the same evaluation slot.
impl PartialEq for LazyValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }
}

/// A lazy value known to produce a tuple of `size` elements.
#[derive(Clone)]
pub struct LazyTuple {
    value: LazyValue,
    size: usize,
    cache: Slot<Arc<[ParamValue]>>,
}

impl LazyTuple {
    pub fn new(value: LazyValue, size: usize) -> Self {
        Self {
            value,
            size,
            cache: Arc::default(),
        }
    }

    pub const fn value(&self) -> &LazyValue {
        &self.value
    }

    pub const fn len(&self) -> usize {
        self.size
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns a reference to position `index`. Nothing is evaluated.
    pub fn item(&self, index: usize) -> Result<LazyTupleItem, LazyError> {
        if index >= self.size {
            return Err(LazyError::IndexOutOfRange {
                getter: self.value.getter_name().to_string(),
                index,
                size: self.size,
            });
        }
        Ok(LazyTupleItem {
            tuple: self.clone(),
            index,
        })
    }

    pub fn items(&self) -> Vec<LazyTupleItem> {
        (0..self.size)
            .map(|index| LazyTupleItem {
                tuple: self.clone(),
                index,
            })
            .collect()
    }

    /// Evaluates the tuple if needed and returns the element at `index`.
    ///
    /// The result is kept on this tuple, so forcing the other positions does not call the
    /// getter again.
    pub fn force_getitem(&self, index: usize) -> Result<ParamValue, LazyError> {
        self.force_getitem_for(index, InvocationId::DETACHED)
    }

    pub fn force_getitem_for(
        &self,
        index: usize,
        invocation: InvocationId,
    ) -> Result<ParamValue, LazyError> {
        let values = self.force_for(invocation)?;
        values
            .get(index)
            .cloned()
            .ok_or_else(|| LazyError::IndexOutOfRange {
                getter: self.value.getter_name().to_string(),
                index,
                size: self.size,
            })
    }

    fn force_for(&self, invocation: InvocationId) -> Result<Arc<[ParamValue]>, LazyError> {
        if let Some((cached_for, values)) = &*lock(&self.cache)
            && *cached_for == invocation
        {
            return Ok(Arc::clone(values));
        }

        let getter = self.value.getter_name().to_string();
        let values: Arc<[ParamValue]> = match self.value.get_for(invocation)? {
            ParamValue::Tuple(items) if items.len() == self.size => items.into(),
            ParamValue::Tuple(items) => {
                return Err(LazyError::Arity {
                    getter,
                    expected: self.size,
                    actual: items.len(),
                });
            }
            other => {
                return Err(LazyError::NotATuple {
                    getter,
                    expected: self.size,
                    value: other.to_string(),
                });
            }
        };

        *lock(&self.cache) = Some((invocation, Arc::clone(&values)));
        Ok(values)
    }
}

impl fmt::Debug for LazyTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyTuple")
            .field("value", &self.value)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl PartialEq for LazyTuple {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }
}

/// One position of a [`LazyTuple`].
#[derive(Debug, Clone, PartialEq)]
pub struct LazyTupleItem {
    tuple: LazyTuple,
    index: usize,
}

impl LazyTupleItem {
    pub const fn tuple(&self) -> &LazyTuple {
        &self.tuple
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    /// `<tuple id>[<index>]`.
    pub fn get_id(&self) -> Result<String, LazyError> {
        Ok(format!("{}[{}]", self.tuple.value.get_id()?, self.index))
    }

    pub fn force(&self) -> Result<ParamValue, LazyError> {
        self.tuple.force_getitem(self.index)
    }

    pub fn force_for(&self, invocation: InvocationId) -> Result<ParamValue, LazyError> {
        self.tuple.force_getitem_for(self.index, invocation)
    }
}
