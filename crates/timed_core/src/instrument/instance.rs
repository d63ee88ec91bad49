use crate::instrument::{CallError, DefinitionId, Operation, TypeDefinition};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use timed_metrics::Timer;

/// Name reported in arity errors raised by [`InstrumentedType::instantiate`].
pub const INIT_NAME: &str = "init";

/// A type definition after instrumentation. Cheap to clone.
pub struct InstrumentedType<S> {
    definition: Rc<TypeDefinition<S>>,
}

impl<S> InstrumentedType<S> {
    pub(crate) fn new(definition: TypeDefinition<S>) -> Self {
        Self {
            definition: Rc::new(definition),
        }
    }

    pub fn definition(&self) -> &TypeDefinition<S> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn id(&self) -> DefinitionId {
        self.definition.id()
    }

    pub fn operation(&self, name: &str) -> Option<&Operation<S>> {
        self.definition.get_operation(name)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation<S>> {
        self.definition.operations()
    }

    /// Construct an instance.
    ///
    /// The instance timer is created first and handed to the initializer, so
    /// it is usable during initialization and exists before any operation
    /// can run.
    pub fn instantiate(&self, args: &[Value]) -> Result<Instance<S>, CallError> {
        let init = &self.definition.init;
        if args.len() != init.arity {
            return Err(CallError::ArityMismatch {
                name: INIT_NAME.to_string(),
                expected: init.arity,
                actual: args.len(),
            });
        }

        let timer = Rc::new(Timer::with_boxed_clock((self.definition.clock)()));
        let state = (init.func)(&*timer, args).map_err(CallError::Operation)?;
        tracing::trace!(type_name = self.name(), "instance created");

        Ok(Instance {
            ty: self.clone(),
            timer,
            state,
        })
    }
}

impl<S> Clone for InstrumentedType<S> {
    fn clone(&self) -> Self {
        Self {
            definition: Rc::clone(&self.definition),
        }
    }
}

impl<S> fmt::Debug for InstrumentedType<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InstrumentedType")
            .field(&*self.definition)
            .finish()
    }
}

/// An object of an instrumented type: user state plus its private timer.
pub struct Instance<S> {
    ty: InstrumentedType<S>,
    timer: Rc<Timer>,
    state: S,
}

impl<S> Instance<S> {
    /// Invoke an operation by name.
    ///
    /// Unknown names and wrong argument counts are rejected before the
    /// operation (and its timing) starts.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, CallError> {
        let operation =
            self.ty
                .operation(name)
                .ok_or_else(|| CallError::UnknownOperation {
                    type_name: self.ty.name().to_string(),
                    name: name.to_string(),
                })?;
        if args.len() != operation.arity() {
            return Err(CallError::ArityMismatch {
                name: name.to_string(),
                expected: operation.arity(),
                actual: args.len(),
            });
        }
        let func = operation.func();
        func(self, args)
    }

    /// The timer every timed operation of this instance records into.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub(crate) fn timer_handle(&self) -> Rc<Timer> {
        Rc::clone(&self.timer)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn instrumented_type(&self) -> &InstrumentedType<S> {
        &self.ty
    }

    /// Type-level data attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.ty.definition().get_attribute(name)
    }
}

impl<S: fmt::Debug> fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.name())
            .field("timer", &*self.timer)
            .field("state", &self.state)
            .finish()
    }
}
