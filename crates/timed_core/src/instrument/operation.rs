use crate::instrument::{CallError, Instance};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Callable body of an operation after it has been registered.
pub type OperationFn<S> = Rc<dyn Fn(&mut Instance<S>, &[Value]) -> Result<Value, CallError>>;

/// Name and arity of an operation. Wrapping never changes either.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationMeta {
    name: String,
    arity: usize,
}

impl OperationMeta {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// An invocable member of a type definition.
pub struct Operation<S> {
    meta: OperationMeta,
    timed: bool,
    func: OperationFn<S>,
}

impl<S: 'static> Operation<S> {
    /// Register `f` as an operation taking exactly `arity` arguments.
    ///
    /// Failures returned by `f` reach the caller as [`CallError::Operation`]
    /// without modification. A [`CallError`] propagated from a nested
    /// [`Instance::call`] is passed through as is rather than wrapped again.
    pub fn new<F>(name: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&mut Instance<S>, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        let func: OperationFn<S> = Rc::new(move |instance: &mut Instance<S>, args: &[Value]| {
            f(instance, args)
                .map_err(|err| err.downcast::<CallError>().unwrap_or_else(CallError::Operation))
        });
        Self {
            meta: OperationMeta::new(name, arity),
            timed: false,
            func,
        }
    }
}

impl<S> Operation<S> {
    pub fn meta(&self) -> &OperationMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn arity(&self) -> usize {
        self.meta.arity()
    }

    /// Whether calls are already recorded on the instance timer.
    pub fn is_timed(&self) -> bool {
        self.timed
    }

    pub(crate) fn func(&self) -> OperationFn<S> {
        Rc::clone(&self.func)
    }

    /// Same metadata, new body, marked as timed.
    pub(crate) fn with_timed_body(&self, func: OperationFn<S>) -> Self {
        Self {
            meta: self.meta.clone(),
            timed: true,
            func,
        }
    }
}

impl<S> Clone for Operation<S> {
    fn clone(&self) -> Self {
        Self {
            meta: self.meta.clone(),
            timed: self.timed,
            func: Rc::clone(&self.func),
        }
    }
}

impl<S> fmt::Debug for Operation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.meta.name)
            .field("arity", &self.meta.arity)
            .field("timed", &self.timed)
            .finish()
    }
}

/// A named entry of a type definition.
pub enum Member<S> {
    Operation(Operation<S>),
    /// Plain data shared by every instance of the type.
    Attribute(Value),
}

impl<S> Member<S> {
    /// Human-readable kind: `operation` or the attribute's JSON kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Member::Operation(_) => "operation",
            Member::Attribute(value) => value_kind(value),
        }
    }

    pub fn as_operation(&self) -> Option<&Operation<S>> {
        match self {
            Member::Operation(operation) => Some(operation),
            Member::Attribute(_) => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Value> {
        match self {
            Member::Attribute(value) => Some(value),
            Member::Operation(_) => None,
        }
    }
}

impl<S> Clone for Member<S> {
    fn clone(&self) -> Self {
        match self {
            Member::Operation(operation) => Member::Operation(operation.clone()),
            Member::Attribute(value) => Member::Attribute(value.clone()),
        }
    }
}

impl<S> fmt::Debug for Member<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Operation(operation) => fmt::Debug::fmt(operation, f),
            Member::Attribute(value) => f.debug_tuple("Attribute").field(value).finish(),
        }
    }
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deserialize positional argument `index`.
pub fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> anyhow::Result<T> {
    let value = args
        .get(index)
        .with_context(|| format!("missing argument #{index}"))?;
    serde_json::from_value(value.clone()).with_context(|| format!("invalid argument #{index}"))
}
