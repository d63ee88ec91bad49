use crate::instrument::{
    registry, value_kind, CallError, Instance, InstrumentError, InstrumentedType, Member, Operation,
    OperationFn, TypeDefinition,
};
use crate::settings::InstrumentSettings;
use serde_json::Value;
use std::rc::Rc;

/// Reserved member name: instances expose their timer through
/// [`Instance::timer`] instead.
pub const TIMER_ACCESSOR: &str = "timer";

/// Turns a [`TypeDefinition`] into an [`InstrumentedType`] whose exposed
/// operations record every call on the instance timer, under a slot named
/// after the operation.
///
/// An operation is exposed when its name does not start with the private
/// prefix (`_` by default). Private operations can be opted in by name with
/// [`Instrumenter::also_time`].
#[derive(Debug, Clone, Default)]
pub struct Instrumenter {
    settings: InstrumentSettings,
    explicit: Vec<String>,
}

impl Instrumenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: InstrumentSettings) -> Self {
        Self {
            settings,
            explicit: Vec::new(),
        }
    }

    /// Also time the named member, even if it is private.
    pub fn also_time(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.explicit.contains(&name) {
            self.explicit.push(name);
        }
        self
    }

    /// Members explicitly requested with [`Instrumenter::also_time`].
    pub fn explicit(&self) -> &[String] {
        &self.explicit
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        let prefix = &self.settings.private_prefix;
        prefix.is_empty() || !name.starts_with(prefix.as_str())
    }

    fn selects(&self, name: &str) -> bool {
        self.is_exposed(name) || self.explicit.iter().any(|explicit| explicit == name)
    }

    /// Instrument a definition.
    ///
    /// Operations that are already timed (inherited from an instrumented
    /// parent, or from an earlier pass) keep their single wrapper.
    pub fn instrument<S: 'static>(
        &self,
        mut definition: TypeDefinition<S>,
    ) -> Result<InstrumentedType<S>, InstrumentError> {
        if definition.get(TIMER_ACCESSOR).is_some() {
            return Err(InstrumentError::ReservedMember {
                name: TIMER_ACCESSOR.to_string(),
            });
        }

        for name in &self.explicit {
            match definition.get(name) {
                None => {
                    return Err(InstrumentError::UnknownMember {
                        type_name: definition.name().to_string(),
                        name: name.clone(),
                    })
                }
                Some(Member::Attribute(value)) => {
                    return Err(InstrumentError::InvalidOperationKind {
                        attribute: name.clone(),
                        actual_kind: value_kind(value).to_string(),
                    })
                }
                Some(Member::Operation(_)) => {}
            }
        }

        let mut wrapped = Vec::new();
        for (name, member) in definition.members.iter_mut() {
            let Member::Operation(operation) = member else {
                continue;
            };
            if operation.is_timed() {
                tracing::debug!(
                    type_name = %definition.name,
                    operation = %name,
                    "operation already timed"
                );
                continue;
            }
            if !self.selects(name) {
                continue;
            }
            *operation = timed(operation);
            wrapped.push(name.clone());
        }

        registry::record(definition.id, &wrapped);
        tracing::debug!(
            type_name = %definition.name,
            parent = ?definition.parent,
            wrapped = ?wrapped,
            "type instrumented"
        );

        Ok(InstrumentedType::new(definition))
    }
}

/// Instrument a definition with default settings.
pub fn instrument<S: 'static>(
    definition: TypeDefinition<S>,
) -> Result<InstrumentedType<S>, InstrumentError> {
    Instrumenter::new().instrument(definition)
}

/// Wrap `operation` so each call runs with its slot started. The slot is
/// stopped on every exit path; the operation's own outcome is returned as is.
fn timed<S: 'static>(operation: &Operation<S>) -> Operation<S> {
    let original = operation.func();
    let slot = operation.name().to_string();
    let func: OperationFn<S> = Rc::new(
        move |instance: &mut Instance<S>, args: &[Value]| -> Result<Value, CallError> {
            let timer = instance.timer_handle();
            let guard = timer.guard(&slot)?;
            match original(instance, args) {
                Ok(value) => {
                    guard.finish()?;
                    Ok(value)
                }
                Err(err) => {
                    drop(guard);
                    Err(err)
                }
            }
        },
    );
    operation.with_timed_body(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{is_instrumented, wrapped_operations};
    use serde_json::json;
    use std::cell::RefCell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::time::Duration;
    use thiserror::Error;
    use timed_metrics::{Clock, ManualClock, TimerError};

    #[derive(Debug, Error, PartialEq)]
    #[error("domain failure: {0}")]
    struct DomainFailure(&'static str);

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn with_manual_clock<S: 'static>(
        definition: TypeDefinition<S>,
        clock: &ManualClock,
    ) -> TypeDefinition<S> {
        let clock = clock.clone();
        definition.clock(move || Box::new(clock.clone()) as Box<dyn Clock>)
    }

    /// Accumulator with a slow `add`, a failing `compute` and a private helper.
    fn accumulator(name: &str, clock: &ManualClock) -> TypeDefinition<f64> {
        let add_clock = clock.clone();
        let helper_clock = clock.clone();
        let def = TypeDefinition::new(name, 1, |_, args| crate::instrument::arg::<f64>(args, 0))
            .operation("add", 1, move |this, args| {
                add_clock.advance(secs(2));
                *this.state_mut() += crate::instrument::arg::<f64>(args, 0)?;
                Ok(json!(*this.state()))
            })
            .operation("compute", 0, |_, _| Err(DomainFailure("no data").into()))
            .operation("_helper", 0, move |_, _| {
                helper_clock.advance(secs(1));
                Ok(Value::Null)
            })
            .attribute("unit", "kg");
        with_manual_clock(def, clock)
    }

    #[test]
    fn times_each_call_under_operation_name() {
        let clock = ManualClock::new();
        let ty = instrument(accumulator("Acc::times", &clock)).unwrap();
        let mut acc = ty.instantiate(&[json!(1.0)]).unwrap();

        assert_eq!(acc.call("add", &[json!(2.5)]).unwrap(), json!(3.5));
        assert_eq!(acc.call("add", &[json!(0.5)]).unwrap(), json!(4.0));

        assert_eq!(acc.timer().slot_elapsed("add"), Some(secs(4)));
        assert_eq!(acc.timer().runs("add"), 2);
        assert_eq!(acc.timer().elapsed(), secs(4));
    }

    #[test]
    fn failing_operation_still_stops_its_slot() {
        let clock = ManualClock::new();
        let ty = instrument(accumulator("Acc::fails", &clock)).unwrap();
        let mut acc = ty.instantiate(&[json!(0.0)]).unwrap();

        let err = acc.call("compute", &[]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DomainFailure>(),
            Some(&DomainFailure("no data"))
        );
        assert_eq!(err.to_string(), "domain failure: no data");
        assert!(!acc.timer().is_running("compute"));
        assert_eq!(acc.timer().runs("compute"), 1);
        assert_eq!(acc.timer().slot_elapsed("compute"), Some(Duration::ZERO));
    }

    #[test]
    fn panicking_operation_still_stops_its_slot() {
        let clock = ManualClock::new();
        let def = with_manual_clock(
            TypeDefinition::<()>::with_default("Acc::panics")
                .operation("explode", 0, |_, _| panic!("boom")),
            &clock,
        );
        let ty = instrument(def).unwrap();
        let mut instance = ty.instantiate(&[]).unwrap();

        let outcome = catch_unwind(AssertUnwindSafe(|| instance.call("explode", &[])));
        assert!(outcome.is_err());
        assert!(!instance.timer().is_running("explode"));
        assert_eq!(instance.timer().runs("explode"), 1);
    }

    #[test]
    fn private_operations_and_attributes_are_not_timed() {
        let clock = ManualClock::new();
        let ty = instrument(accumulator("Acc::private", &clock)).unwrap();
        let mut acc = ty.instantiate(&[json!(0.0)]).unwrap();

        acc.call("_helper", &[]).unwrap();
        assert_eq!(acc.timer().slot_elapsed("_helper"), None);
        assert!(!ty.operation("_helper").unwrap().is_timed());
        assert_eq!(acc.attribute("unit"), Some(&json!("kg")));
        assert_eq!(
            wrapped_operations(ty.id()),
            Some(vec!["add".to_string(), "compute".to_string()])
        );
    }

    #[test]
    fn also_time_opts_private_operations_in() {
        let clock = ManualClock::new();
        let ty = Instrumenter::new()
            .also_time("_helper")
            .instrument(accumulator("Acc::explicit", &clock))
            .unwrap();
        let mut acc = ty.instantiate(&[json!(0.0)]).unwrap();

        acc.call("_helper", &[]).unwrap();
        assert_eq!(acc.timer().slot_elapsed("_helper"), Some(secs(1)));
    }

    #[test]
    fn also_time_rejects_attributes() {
        let clock = ManualClock::new();
        let err = Instrumenter::new()
            .also_time("unit")
            .instrument(accumulator("Acc::attr", &clock))
            .unwrap_err();
        assert_eq!(
            err,
            InstrumentError::InvalidOperationKind {
                attribute: "unit".into(),
                actual_kind: "string".into(),
            }
        );
    }

    #[test]
    fn also_time_rejects_unknown_members() {
        let clock = ManualClock::new();
        let err = Instrumenter::new()
            .also_time("missing")
            .instrument(accumulator("Acc::unknown", &clock))
            .unwrap_err();
        assert!(matches!(err, InstrumentError::UnknownMember { ref name, .. } if name == "missing"));
    }

    #[test]
    fn timer_member_name_is_reserved() {
        let def = TypeDefinition::<()>::with_default("Acc::reserved").attribute("timer", 1);
        assert_eq!(
            instrument(def).unwrap_err(),
            InstrumentError::ReservedMember {
                name: "timer".into()
            }
        );
    }

    #[test]
    fn wrapping_preserves_operation_metadata() {
        let clock = ManualClock::new();
        let def = accumulator("Acc::meta", &clock);
        let before: Vec<_> = def.operations().map(|op| op.meta().clone()).collect();
        let ty = instrument(def).unwrap();
        let after: Vec<_> = ty.operations().map(|op| op.meta().clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn call_errors_are_reported_before_timing() {
        let clock = ManualClock::new();
        let ty = instrument(accumulator("Acc::dispatch", &clock)).unwrap();
        let mut acc = ty.instantiate(&[json!(0.0)]).unwrap();

        assert!(matches!(
            acc.call("nope", &[]),
            Err(CallError::UnknownOperation { .. })
        ));
        assert!(matches!(
            acc.call("add", &[]),
            Err(CallError::ArityMismatch { expected: 1, actual: 0, .. })
        ));
        assert!(acc.timer().is_empty());

        assert!(matches!(
            ty.instantiate(&[]),
            Err(CallError::ArityMismatch { ref name, .. }) if name == "init"
        ));
    }

    #[test]
    fn timer_exists_before_initializer_runs() {
        let clock = ManualClock::new();
        let init_clock = clock.clone();
        let def = with_manual_clock(
            TypeDefinition::new("Acc::init", 0, move |timer, _| {
                timer.start("setup")?;
                init_clock.advance(secs(3));
                timer.stop("setup")?;
                Ok(timer.len())
            }),
            &clock,
        );
        let instance = instrument(def).unwrap().instantiate(&[]).unwrap();
        assert_eq!(*instance.state(), 1);
        assert_eq!(instance.timer().slot_elapsed("setup"), Some(secs(3)));
    }

    #[test]
    fn instances_get_their_own_timer() {
        let clock = ManualClock::new();
        let ty = instrument(accumulator("Acc::separate", &clock)).unwrap();
        let mut first = ty.instantiate(&[json!(0.0)]).unwrap();
        let second = ty.instantiate(&[json!(0.0)]).unwrap();

        first.call("add", &[json!(1.0)]).unwrap();
        assert_eq!(first.timer().runs("add"), 1);
        assert!(second.timer().is_empty());
    }

    #[test]
    fn nested_calls_time_each_operation() {
        let clock = ManualClock::new();
        let inner_clock = clock.clone();
        let def = with_manual_clock(
            TypeDefinition::<()>::with_default("Acc::nested")
                .operation("inner", 0, move |_, _| {
                    inner_clock.advance(secs(2));
                    Ok(Value::Null)
                })
                .operation("outer", 0, |this, _| {
                    this.call("inner", &[])?;
                    Ok(Value::Null)
                }),
            &clock,
        );
        let mut instance = instrument(def).unwrap().instantiate(&[]).unwrap();
        instance.call("outer", &[]).unwrap();

        let report = instance.timer().report();
        assert_eq!(report.entry("outer").map(|e| e.elapsed), Some(secs(2)));
        assert_eq!(report.entry("inner").map(|e| e.elapsed), Some(secs(2)));
    }

    #[test]
    fn nested_failure_reaches_outer_caller_unchanged() {
        let def = TypeDefinition::<()>::with_default("Acc::nested_failure")
            .operation("inner", 0, |_, _| Err(DomainFailure("inner").into()))
            .operation("outer", 0, |this, _| Ok(this.call("inner", &[])?));
        let mut instance = instrument(def).unwrap().instantiate(&[]).unwrap();

        let direct = instance.call("inner", &[]).unwrap_err();
        let nested = instance.call("outer", &[]).unwrap_err();
        assert_eq!(direct.downcast_ref::<DomainFailure>(), Some(&DomainFailure("inner")));
        assert_eq!(nested.downcast_ref::<DomainFailure>(), Some(&DomainFailure("inner")));
        assert_eq!(nested.to_string(), direct.to_string());

        assert!(!instance.timer().is_running("inner"));
        assert!(!instance.timer().is_running("outer"));
        assert_eq!(instance.timer().runs("inner"), 2);
        assert_eq!(instance.timer().runs("outer"), 1);
    }

    #[test]
    fn reentrant_call_of_same_operation_is_already_started() {
        let def = TypeDefinition::<u32>::with_default("Acc::recursive").operation(
            "recurse",
            0,
            |this, _| {
                if *this.state() == 0 {
                    *this.state_mut() += 1;
                    this.call("recurse", &[])?;
                }
                Ok(Value::Null)
            },
        );
        let mut instance = instrument(def).unwrap().instantiate(&[]).unwrap();
        let err = instance.call("recurse", &[]).unwrap_err();
        assert!(matches!(
            err,
            CallError::Timer(TimerError::AlreadyStarted { .. })
        ));
        assert!(!instance.timer().is_running("recurse"));
    }

    #[test]
    fn subtype_times_inherited_operations_once() {
        let clock = ManualClock::new();
        let base = instrument(accumulator("Acc::base", &clock)).unwrap();

        let sub_clock = clock.clone();
        let sub = instrument(
            TypeDefinition::extend("Acc::sub", &base).operation("scale", 1, move |this, args| {
                sub_clock.advance(secs(5));
                *this.state_mut() *= crate::instrument::arg::<f64>(args, 0)?;
                Ok(json!(*this.state()))
            }),
        )
        .unwrap();
        assert_eq!(sub.definition().parent(), Some("Acc::base"));

        let mut acc = sub.instantiate(&[json!(1.0)]).unwrap();
        acc.call("add", &[json!(1.0)]).unwrap();
        acc.call("scale", &[json!(3.0)]).unwrap();
        assert_eq!(*acc.state(), 6.0);

        // A double wrapper would fail with AlreadyStarted or count two runs.
        assert_eq!(acc.timer().runs("add"), 1);
        assert_eq!(acc.timer().slot_elapsed("add"), Some(secs(2)));
        assert_eq!(acc.timer().slot_elapsed("scale"), Some(secs(5)));
        assert_eq!(wrapped_operations(sub.id()), Some(vec!["scale".to_string()]));
    }

    #[test]
    fn same_named_types_keep_separate_records() {
        let clock = ManualClock::new();
        let first = instrument(accumulator("Acc::shared", &clock)).unwrap();
        let second = instrument(
            TypeDefinition::<f64>::with_default("Acc::shared").operation("reset", 0, |this, _| {
                *this.state_mut() = 0.0;
                Ok(Value::Null)
            }),
        )
        .unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(
            wrapped_operations(first.id()),
            Some(vec!["add".to_string(), "compute".to_string()])
        );
        assert_eq!(wrapped_operations(second.id()), Some(vec!["reset".to_string()]));
        assert!(is_instrumented(second.id()));
    }

    #[test]
    fn reinstrumenting_is_idempotent() {
        let clock = ManualClock::new();
        let once = instrument(accumulator("Acc::again", &clock)).unwrap();
        let twice = instrument(TypeDefinition::extend("Acc::again2", &once)).unwrap();
        let mut acc = twice.instantiate(&[json!(0.0)]).unwrap();

        acc.call("add", &[json!(1.0)]).unwrap();
        assert_eq!(acc.timer().runs("add"), 1);
        assert_eq!(wrapped_operations(twice.id()), Some(Vec::new()));
    }

    #[test]
    fn subtype_override_is_timed() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let base_calls = Rc::clone(&calls);
        let base = instrument(TypeDefinition::<()>::with_default("Acc::ovr_base").operation(
            "run",
            0,
            move |_, _| {
                base_calls.borrow_mut().push("base");
                Ok(Value::Null)
            },
        ))
        .unwrap();

        let sub_calls = Rc::clone(&calls);
        let sub = instrument(TypeDefinition::extend("Acc::ovr_sub", &base).operation(
            "run",
            0,
            move |_, _| {
                sub_calls.borrow_mut().push("sub");
                Ok(Value::Null)
            },
        ))
        .unwrap();

        let mut instance = sub.instantiate(&[]).unwrap();
        instance.call("run", &[]).unwrap();
        assert_eq!(*calls.borrow(), vec!["sub"]);
        assert_eq!(instance.timer().runs("run"), 1);
        assert!(sub.operation("run").unwrap().is_timed());
    }

    #[test]
    fn custom_private_prefix() {
        let settings = InstrumentSettings {
            private_prefix: "internal_".to_string(),
        };
        let def = TypeDefinition::<()>::with_default("Acc::prefix")
            .operation("_visible", 0, |_, _| Ok(Value::Null))
            .operation("internal_hidden", 0, |_, _| Ok(Value::Null));
        let ty = Instrumenter::with_settings(settings).instrument(def).unwrap();
        assert!(ty.operation("_visible").unwrap().is_timed());
        assert!(!ty.operation("internal_hidden").unwrap().is_timed());
    }
}
