use crate::instrument::{Instance, InstrumentedType, Member, Operation};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use timed_metrics::{Clock, MonotonicClock, Timer};

/// Builds the clock of each new instance's timer.
pub type ClockFactory = Rc<dyn Fn() -> Box<dyn Clock>>;

/// Builds instance state. Receives the instance timer, which already exists.
pub type InitFn<S> = Rc<dyn Fn(&Timer, &[Value]) -> anyhow::Result<S>>;

/// Identity of one type definition, unique within the process.
///
/// Two definitions sharing a name still get distinct ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DefinitionId(pub u64);

impl DefinitionId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) struct Initializer<S> {
    pub arity: usize,
    pub func: InitFn<S>,
}

impl<S> Clone for Initializer<S> {
    fn clone(&self) -> Self {
        Self {
            arity: self.arity,
            func: Rc::clone(&self.func),
        }
    }
}

/// Description of a type before instrumentation: an initializer plus named
/// operations and attributes.
///
/// ```ignore
/// let def = TypeDefinition::new("Counter", 1, |_timer, args| Ok(arg::<u64>(args, 0)?))
///     .operation("bump", 0, |this, _| {
///         *this.state_mut() += 1;
///         Ok(json!(*this.state()))
///     })
///     .attribute("unit", "ticks");
/// let counter = instrument(def)?;
/// ```
pub struct TypeDefinition<S> {
    pub(crate) id: DefinitionId,
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) init: Initializer<S>,
    pub(crate) members: Vec<(String, Member<S>)>,
    pub(crate) name_lookup: HashMap<String, usize>,
    pub(crate) clock: ClockFactory,
}

impl<S: 'static> TypeDefinition<S> {
    /// New definition whose initializer takes `arity` arguments.
    pub fn new<F>(name: impl Into<String>, arity: usize, init: F) -> Self
    where
        F: Fn(&Timer, &[Value]) -> anyhow::Result<S> + 'static,
    {
        Self {
            id: DefinitionId::next(),
            name: name.into(),
            parent: None,
            init: Initializer {
                arity,
                func: Rc::new(init),
            },
            members: Vec::new(),
            name_lookup: HashMap::new(),
            clock: Rc::new(|| Box::new(MonotonicClock::new()) as Box<dyn Clock>),
        }
    }

    /// Definition for a subtype of an instrumented type.
    ///
    /// The subtype starts with the parent's initializer, clock, attributes and
    /// operations. Inherited operations keep their timed wrapper, so
    /// instrumenting the subtype does not time them a second time.
    pub fn extend(name: impl Into<String>, parent: &InstrumentedType<S>) -> Self {
        let base = parent.definition();
        Self {
            id: DefinitionId::next(),
            name: name.into(),
            parent: Some(base.name.clone()),
            init: base.init.clone(),
            members: base.members.clone(),
            name_lookup: base.name_lookup.clone(),
            clock: Rc::clone(&base.clock),
        }
    }

    /// Replace the initializer.
    pub fn initializer<F>(mut self, arity: usize, init: F) -> Self
    where
        F: Fn(&Timer, &[Value]) -> anyhow::Result<S> + 'static,
    {
        self.init = Initializer {
            arity,
            func: Rc::new(init),
        };
        self
    }

    /// Add an operation. An existing member with the same name is replaced
    /// in place.
    pub fn operation<F>(self, name: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&mut Instance<S>, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        let name = name.into();
        let operation = Operation::new(name.clone(), arity, f);
        self.member(name, Member::Operation(operation))
    }

    /// Add a data attribute shared by every instance.
    pub fn attribute(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.member(name.into(), Member::Attribute(value.into()))
    }

    /// Clock used by the timer of every new instance.
    pub fn clock<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Clock> + 'static,
    {
        self.clock = Rc::new(factory);
        self
    }

    fn member(mut self, name: String, member: Member<S>) -> Self {
        match self.name_lookup.get(&name) {
            Some(&index) => self.members[index].1 = member,
            None => {
                self.name_lookup.insert(name.clone(), self.members.len());
                self.members.push((name, member));
            }
        }
        self
    }
}

impl<S: Default + 'static> TypeDefinition<S> {
    /// Definition with a zero-argument initializer producing `S::default()`.
    pub fn with_default(name: impl Into<String>) -> Self {
        Self::new(name, 0, |_, _| Ok(S::default()))
    }
}

impl<S> TypeDefinition<S> {
    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the type this one was extended from.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn init_arity(&self) -> usize {
        self.init.arity
    }

    pub fn get(&self, name: &str) -> Option<&Member<S>> {
        self.name_lookup
            .get(name)
            .map(|&index| &self.members[index].1)
    }

    pub fn get_operation(&self, name: &str) -> Option<&Operation<S>> {
        self.get(name).and_then(Member::as_operation)
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Member::as_attribute)
    }

    /// Members in declaration order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member<S>)> {
        self.members
            .iter()
            .map(|(name, member)| (name.as_str(), member))
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation<S>> {
        self.members
            .iter()
            .filter_map(|(_, member)| member.as_operation())
    }
}

impl<S> fmt::Debug for TypeDefinition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("init_arity", &self.init.arity)
            .field("members", &self.members)
            .finish()
    }
}
