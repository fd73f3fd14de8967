//! ## tagbus-client::registry
//! **Event name → handler table**
//!
//! Each name has at most one handler. Whether a second registration replaces
//! the first or is refused is a [`DuplicatePolicy`]. Inbound events with no
//! handler are ignored; peers broadcast more than any one client cares about.
//!
//! Handlers cannot borrow the registry that is calling them. To change the
//! table from inside a handler, go through a [`RegistryHandle`]: its changes
//! are queued and take effect once the running handler returns.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use tagbus_config::DuplicatePolicy;
use tagbus_core::{DispatchError, EventSignature, FromArgs, Value};
use tagbus_wire::Event;

use crate::error::RegistryError;

type Callback = Box<dyn FnMut(&str, Vec<Value>) -> Result<(), DispatchError> + Send>;

struct Handler {
    signature: EventSignature,
    callback: Callback,
}

impl Handler {
    fn raw<F>(signature: EventSignature, mut callback: F) -> Self
    where
        F: FnMut(Vec<Value>) + Send + 'static,
    {
        Self {
            signature,
            callback: Box::new(move |_, args| {
                callback(args);
                Ok(())
            }),
        }
    }

    fn typed<A, F>(signature: EventSignature, mut callback: F) -> Self
    where
        A: FromArgs + 'static,
        F: FnMut(A) + Send + 'static,
    {
        Self {
            signature,
            callback: Box::new(move |name, args| {
                callback(A::from_args(name, args)?);
                Ok(())
            }),
        }
    }
}

enum Change {
    Register(String, Handler),
    Unregister(String),
}

type Pending = Arc<Mutex<VecDeque<Change>>>;

/// Outcome of dispatching one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Delivered,
    Ignored,
}

pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
    policy: DuplicatePolicy,
    pending: Pending,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            policy,
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// A cloneable handle whose changes are applied by
    /// [`HandlerRegistry::apply_pending`].
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            pending: self.pending.clone(),
        }
    }

    /// Applies queued handle changes in the order they were made. A refused
    /// registration does not stop the ones after it.
    pub fn apply_pending(&mut self) -> Vec<RegistryError> {
        let mut errors = Vec::new();
        loop {
            let next = self.pending.lock().pop_front();
            match next {
                Some(Change::Register(event, handler)) => {
                    if let Err(e) = self.insert(&event, handler) {
                        errors.push(e);
                    }
                }
                Some(Change::Unregister(event)) => {
                    self.unregister(&event);
                }
                None => return errors,
            }
        }
    }

    fn insert(&mut self, event: &str, handler: Handler) -> Result<(), RegistryError> {
        if self.policy == DuplicatePolicy::Reject && self.handlers.contains_key(event) {
            return Err(RegistryError::Duplicate(event.to_string()));
        }
        if self.handlers.insert(event.to_string(), handler).is_some() {
            debug!(event, "Replaced existing handler");
        }
        Ok(())
    }

    /// Registers a handler that receives raw values once they satisfy
    /// `signature`. An untyped signature admits any argument list.
    pub fn register<F>(
        &mut self,
        event: &str,
        signature: EventSignature,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        F: FnMut(Vec<Value>) + Send + 'static,
    {
        self.insert(event, Handler::raw(signature, callback))
    }

    /// Registers a handler for the full argument list as sent.
    pub fn register_untyped<F>(&mut self, event: &str, callback: F) -> Result<(), RegistryError>
    where
        F: FnMut(Vec<Value>) + Send + 'static,
    {
        self.register(event, EventSignature::Untyped, callback)
    }

    /// Registers a handler whose signature is its argument tuple.
    ///
    /// ```
    /// use tagbus_client::HandlerRegistry;
    ///
    /// let mut registry = HandlerRegistry::new();
    /// registry
    ///     .register_typed("ping", |(seq,): (u64,)| println!("ping {seq}"))
    ///     .unwrap();
    /// ```
    pub fn register_typed<A, F>(&mut self, event: &str, callback: F) -> Result<(), RegistryError>
    where
        A: FromArgs + 'static,
        F: FnMut(A) + Send + 'static,
    {
        self.insert(event, Handler::typed::<A, F>(A::signature(), callback))
    }

    /// Like [`HandlerRegistry::register_typed`], with a signature that can
    /// also pin record arguments to a record type. Its tags must be the
    /// tuple's own.
    ///
    /// ```
    /// use tagbus_client::HandlerRegistry;
    /// use tagbus_core::{FromArgs, Record, RecordType};
    ///
    /// let conn_info = RecordType::create(["uid", "orig_h"]).unwrap();
    /// let signature = <(Record,)>::signature().with_record_type(0, conn_info);
    ///
    /// let mut registry = HandlerRegistry::new();
    /// registry
    ///     .register_typed_with("conn", signature, |(r,): (Record,)| println!("{r}"))
    ///     .unwrap();
    /// ```
    pub fn register_typed_with<A, F>(
        &mut self,
        event: &str,
        signature: EventSignature,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        A: FromArgs + 'static,
        F: FnMut(A) + Send + 'static,
    {
        let signature = conforming::<A>(event, signature)?;
        self.insert(event, Handler::typed::<A, F>(signature, callback))
    }

    pub fn unregister(&mut self, event: &str) -> bool {
        self.handlers.remove(event).is_some()
    }

    /// Signature of the handler registered for `event`, if any.
    pub fn lookup(&self, event: &str) -> Option<&EventSignature> {
        self.handlers.get(event).map(|h| &h.signature)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Routes one event. The callback only runs if every argument matches
    /// the handler's signature.
    pub fn dispatch(&mut self, event: Event) -> Result<Dispatch, DispatchError> {
        let Some(handler) = self.handlers.get_mut(&event.name) else {
            debug!(event = %event.name, "No handler registered; ignoring");
            return Ok(Dispatch::Ignored);
        };
        handler.signature.check(&event.name, &event.args)?;
        (handler.callback)(&event.name, event.args)?;
        Ok(Dispatch::Delivered)
    }
}

fn conforming<A: FromArgs>(
    event: &str,
    signature: EventSignature,
) -> Result<EventSignature, RegistryError> {
    if signature.tags() != A::signature().tags() {
        return Err(RegistryError::SignatureMismatch(event.to_string()));
    }
    Ok(signature)
}

/// Queues registry changes from anywhere, handlers included.
///
/// Changes apply in call order the next time the owning registry runs
/// [`HandlerRegistry::apply_pending`]. A [`Connection`](crate::Connection)
/// does that before each poll pass and after every dispatched event, so a
/// change made by a handler governs the very next inbound message.
#[derive(Clone)]
pub struct RegistryHandle {
    pending: Pending,
}

impl RegistryHandle {
    fn queue(&self, change: Change) {
        self.pending.lock().push_back(change);
    }

    pub fn register<F>(&self, event: &str, signature: EventSignature, callback: F)
    where
        F: FnMut(Vec<Value>) + Send + 'static,
    {
        self.queue(Change::Register(
            event.to_string(),
            Handler::raw(signature, callback),
        ));
    }

    pub fn register_untyped<F>(&self, event: &str, callback: F)
    where
        F: FnMut(Vec<Value>) + Send + 'static,
    {
        self.register(event, EventSignature::Untyped, callback);
    }

    pub fn register_typed<A, F>(&self, event: &str, callback: F)
    where
        A: FromArgs + 'static,
        F: FnMut(A) + Send + 'static,
    {
        self.queue(Change::Register(
            event.to_string(),
            Handler::typed::<A, F>(A::signature(), callback),
        ));
    }

    /// Checks the signature now; only the registration itself is deferred.
    pub fn register_typed_with<A, F>(
        &self,
        event: &str,
        signature: EventSignature,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        A: FromArgs + 'static,
        F: FnMut(A) + Send + 'static,
    {
        let signature = conforming::<A>(event, signature)?;
        self.queue(Change::Register(
            event.to_string(),
            Handler::typed::<A, F>(signature, callback),
        ));
        Ok(())
    }

    pub fn unregister(&self, event: &str) {
        self.queue(Change::Unregister(event.to_string()));
    }

    /// Changes queued and not yet applied.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tagbus_core::{Record, RecordType, Tag};

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let c = Arc::new(AtomicUsize::new(0));
        (c.clone(), c)
    }

    #[test]
    fn unregistered_events_are_ignored() {
        let mut registry = HandlerRegistry::new();
        let outcome = registry.dispatch(Event::new("nobody", vec![Value::Int(1)]));
        assert_eq!(outcome, Ok(Dispatch::Ignored));
    }

    #[test]
    fn typed_handler_receives_natives() {
        let mut registry = HandlerRegistry::new();
        let (seen, inner) = counter();
        registry
            .register_typed("ping", move |(n,): (u64,)| {
                inner.fetch_add(n as usize, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(
            registry.dispatch(Event::new("ping", vec![Value::Count(3)])),
            Ok(Dispatch::Delivered)
        );
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(registry.lookup("ping"), Some(&EventSignature::new(vec![Tag::Count])));
    }

    #[test]
    fn wrong_arity_never_calls_back() {
        let mut registry = HandlerRegistry::new();
        let (calls, inner) = counter();
        registry
            .register_typed("pair", move |_: (u64, bool)| {
                inner.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        for args in [
            vec![],
            vec![Value::Count(1)],
            vec![Value::Count(1), Value::Bool(true), Value::Bool(false)],
        ] {
            assert!(matches!(
                registry.dispatch(Event::new("pair", args)),
                Err(DispatchError::Arity { expected: 2, .. })
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn numeric_tags_do_not_substitute() {
        let mut registry = HandlerRegistry::new();
        let (calls, inner) = counter();
        registry
            .register_typed("pair", move |_: (u64, bool)| {
                inner.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let outcome = registry.dispatch(Event::new("pair", vec![Value::Count(1), Value::Double(0.0)]));
        assert!(matches!(
            outcome,
            Err(DispatchError::TypeMismatch {
                position: 1,
                expected: Tag::Bool,
                actual: Tag::Double,
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn untyped_handler_gets_raw_values() {
        let mut registry = HandlerRegistry::new();
        let (calls, inner) = counter();
        registry
            .register_untyped("any", move |args| {
                inner.fetch_add(args.len(), Ordering::SeqCst);
            })
            .unwrap();
        registry
            .dispatch(Event::new("any", vec![Value::Int(1), Value::from("x")]))
            .unwrap();
        registry.dispatch(Event::new("any", vec![])).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn explicit_signature_with_raw_delivery() {
        let mut registry = HandlerRegistry::new();
        let (calls, inner) = counter();
        registry
            .register("addr", EventSignature::new(vec![Tag::Addr]), move |args| {
                assert!(args[0].as_addr().is_some());
                inner.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(registry
            .dispatch(Event::new("addr", vec![Value::from("6.7.6.5")]))
            .is_err());
        registry
            .dispatch(Event::new(
                "addr",
                vec![Value::Addr("6.7.6.5".parse().unwrap())],
            ))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn last_registration_wins_by_default() {
        let mut registry = HandlerRegistry::new();
        let (first, first_inner) = counter();
        let (second, second_inner) = counter();
        registry
            .register_untyped("e", move |_| {
                first_inner.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        registry
            .register_untyped("e", move |_| {
                second_inner.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        registry.dispatch(Event::new("e", vec![])).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn pinned_record_type_gates_typed_handler() {
        let mut registry = HandlerRegistry::new();
        let (calls, inner) = counter();
        let ab = RecordType::create(["a", "b"]).unwrap();
        let other = RecordType::create(["x"]).unwrap();
        registry
            .register_typed_with(
                "test4",
                <(Record,)>::signature().with_record_type(0, ab.clone()),
                move |_: (Record,)| {
                    inner.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap();

        let outcome = registry.dispatch(Event::new(
            "test4",
            vec![Value::Record(Record::new(&other))],
        ));
        assert!(matches!(
            outcome,
            Err(DispatchError::RecordTypeMismatch { position: 0, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        registry
            .dispatch(Event::new("test4", vec![Value::Record(Record::new(&ab))]))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn typed_with_refuses_foreign_tags() {
        let mut registry = HandlerRegistry::new();
        assert_eq!(
            registry.register_typed_with(
                "ping",
                EventSignature::new(vec![Tag::Int]),
                |_: (u64,)| {}
            ),
            Err(RegistryError::SignatureMismatch("ping".into()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn handle_changes_wait_for_apply() {
        let mut registry = HandlerRegistry::with_policy(DuplicatePolicy::Reject);
        let handle = registry.handle();
        registry.register_untyped("kept", |_| {}).unwrap();

        handle.register_untyped("new", |_| {});
        handle.register_untyped("kept", |_| {});
        handle.unregister("kept");
        assert_eq!(handle.pending(), 3);
        assert!(registry.lookup("new").is_none());

        let errors = registry.apply_pending();
        assert_eq!(errors, vec![RegistryError::Duplicate("kept".into())]);
        assert!(registry.lookup("new").is_some());
        assert!(registry.lookup("kept").is_none());
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn reject_policy_keeps_first_handler() {
        let mut registry = HandlerRegistry::with_policy(DuplicatePolicy::Reject);
        registry.register_untyped("e", |_| {}).unwrap();
        assert_eq!(
            registry.register_untyped("e", |_| {}),
            Err(RegistryError::Duplicate("e".into()))
        );
        assert!(registry.unregister("e"));
        assert!(registry.register_untyped("e", |_| {}).is_ok());
    }
}
