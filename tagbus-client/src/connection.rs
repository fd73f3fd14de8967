//! ## tagbus-client::connection
//! **Connection lifecycle and the polling dispatch loop**
//!
//! A [`Connection`] owns one transport session and the [`HandlerRegistry`].
//! Nothing runs in the background: inbound events are only delivered from
//! inside [`Connection::process_input`], which the caller invokes repeatedly.
//! One pass handles the messages that were ready when it started; anything
//! arriving meanwhile, replies to its own handlers included, waits for the
//! next pass.
//!
//! ### Handlers that send
//! Handlers cannot borrow the connection that is dispatching to them. They
//! send through an [`EventSender`] obtained from [`Connection::sender`]. The
//! event is encoded at the moment of the call and queued; the queue is
//! flushed right after the handler returns, before the next inbound message
//! is dispatched. Once the connection is closed or failed the sender refuses
//! new events.
//!
//! Registry changes from a handler go through a [`RegistryHandle`] from
//! [`Connection::registry_handle`] and apply as soon as the handler returns.
//!
//! A `Connection` is not internally synchronised. Sharing one across
//! threads means serialising every call externally.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use tagbus_config::TagbusConfig;
use tagbus_core::{EventSignature, FromArgs, Value};
use tagbus_telemetry::{EventLogger, MetricsRecorder};
use tagbus_wire::EventCodec;

use crate::error::{BusError, ConnectionError, PollError, RegistryError};
use crate::registry::{Dispatch, HandlerRegistry, RegistryHandle};
use crate::transport::Transport;

/// Bytes of a malformed message shown in logs.
const MALFORMED_PREVIEW: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Connecting,
    Connected,
    Closed,
    /// Terminal. Reached when connecting fails or the transport breaks.
    Failed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Disconnected => "disconnected",
            State::Connecting => "connecting",
            State::Connected => "connected",
            State::Closed => "closed",
            State::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl State {
    fn check_open(self) -> Result<(), ConnectionError> {
        match self {
            State::Connected => Ok(()),
            State::Closed => Err(ConnectionError::Closed),
            other => Err(ConnectionError::NotConnected(other)),
        }
    }
}

/// What one [`Connection::process_input`] pass did.
#[derive(Debug, Default)]
pub struct PollReport {
    pub received: usize,
    pub dispatched: usize,
    pub ignored: usize,
    /// Non-fatal problems: malformed messages, rejected dispatches and
    /// refused handler registrations.
    pub errors: Vec<BusError>,
}

/// Output queued by senders, and the connection state they check against.
struct Outbound {
    queue: VecDeque<Bytes>,
    state: State,
}

type Outbox = Arc<Mutex<Outbound>>;

/// Queues outbound events on behalf of a [`Connection`].
#[derive(Clone)]
pub struct EventSender {
    codec: EventCodec,
    outbox: Outbox,
}

impl EventSender {
    /// Encodes `args` now and queues the message for the owning connection.
    /// Fails like [`Connection::send`] when the connection is not open.
    pub fn send(&self, name: &str, args: &[Value]) -> Result<(), BusError> {
        let message = self.codec.encode(name, args)?;
        let mut outbound = self.outbox.lock();
        outbound.state.check_open()?;
        outbound.queue.push_back(message);
        debug!(event = name, "Queued outbound event");
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.outbox.lock().queue.len()
    }
}

type ErrorHandler = Box<dyn FnMut(&BusError) + Send>;

pub struct Connection<T: Transport> {
    transport: T,
    session: Option<T::Session>,
    state: State,
    endpoint: Option<String>,
    registry: HandlerRegistry,
    codec: EventCodec,
    outbox: Outbox,
    error_handler: Option<ErrorHandler>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self::with_parts(transport, HandlerRegistry::new(), EventCodec::new())
    }

    /// Applies the frame limit and the duplicate handler policy from `config`.
    pub fn with_config(transport: T, config: &TagbusConfig) -> Self {
        Self::with_parts(
            transport,
            HandlerRegistry::with_policy(config.registry.duplicate_policy),
            EventCodec::with_max_message_size(config.connection.max_frame_size),
        )
    }

    /// Outbound messages never exceed what the transport can carry, so an
    /// oversized send is refused by the codec instead of breaking the link.
    fn with_parts(transport: T, registry: HandlerRegistry, codec: EventCodec) -> Self {
        let codec = match transport.max_message_size() {
            Some(limit) if limit < codec.max_message_size() => {
                EventCodec::with_max_message_size(limit)
            }
            _ => codec,
        };
        Self {
            transport,
            session: None,
            state: State::Disconnected,
            endpoint: None,
            registry,
            codec,
            outbox: Arc::new(Mutex::new(Outbound {
                queue: VecDeque::new(),
                state: State::Disconnected,
            })),
            error_handler: None,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Largest encoded event this connection will send.
    pub fn max_message_size(&self) -> usize {
        self.codec.max_message_size()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// For changing handlers from inside a handler.
    pub fn registry_handle(&self) -> RegistryHandle {
        self.registry.handle()
    }

    pub fn register<F>(
        &mut self,
        event: &str,
        signature: EventSignature,
        callback: F,
    ) -> Result<(), RegistryError>
    where
        F: FnMut(Vec<Value>) + Send + 'static,
    {
        self.registry.register(event, signature, callback)
    }

    pub fn register_untyped<F>(&mut self, event: &str, callback: F) -> Result<(), RegistryError>
    where
        F: FnMut(Vec<Value>) + Send + 'static,
    {
        self.registry.register_untyped(event, callback)
    }

    pub fn register_typed<A, F>(&mut self, event: &str, callback: F) -> Result<(), RegistryError>
    where
        A: FromArgs + 'static,
        F: FnMut(A) + Send + 'static,
    {
        self.registry.register_typed(event, callback)
    }

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
        self.registry.register_typed_with(event, signature, callback)
    }

    /// Installs a callback for errors found while polling. They are also
    /// returned in [`PollReport::errors`].
    pub fn on_error<F>(&mut self, callback: F)
    where
        F: FnMut(&BusError) + Send + 'static,
    {
        self.error_handler = Some(Box::new(callback));
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            codec: self.codec,
            outbox: self.outbox.clone(),
        }
    }

    #[instrument(skip(self))]
    pub fn connect(&mut self, endpoint: &str) -> Result<(), ConnectionError> {
        if self.state != State::Disconnected {
            return Err(ConnectionError::AlreadyStarted(self.state));
        }
        self.set_state(State::Connecting);
        self.endpoint = Some(endpoint.to_string());

        match self.transport.connect(endpoint) {
            Ok(session) => {
                self.session = Some(session);
                self.set_state(State::Connected);
                info!("Connected");
                Ok(())
            }
            Err(e) => {
                self.set_state(State::Failed);
                error!(error = %e, "Connection attempt failed");
                Err(e)
            }
        }
    }

    /// Serialises and transmits one event. Output queued by senders goes
    /// first; if the transport cannot take all of it this fails with
    /// [`ConnectionError::Backpressure`] and the connection stays open.
    pub fn send(&mut self, name: &str, args: &[Value]) -> Result<(), BusError> {
        self.state.check_open()?;
        self.flush_outbox()?;
        let message = self.codec.encode(name, args)?;
        let queued: usize = self.outbox.lock().queue.iter().map(Bytes::len).sum();
        if queued > 0 {
            return Err(ConnectionError::Backpressure { pending: queued }.into());
        }
        self.transmit(message)?;
        EventLogger::log_event("outbound", name, args.len());
        Ok(())
    }

    /// Dispatches, in arrival order, every message the transport had ready
    /// when the pass began, then returns.
    ///
    /// Malformed messages and dispatch rejections are reported and skipped.
    /// Only a transport failure aborts the pass, leaving the connection
    /// [`State::Failed`]; the [`PollError`] still carries what the pass did
    /// up to that point.
    #[instrument(level = "debug", skip(self))]
    pub fn process_input(&mut self) -> Result<PollReport, PollError> {
        let mut report = PollReport::default();
        match self.drain(&mut report) {
            Ok(()) => Ok(report),
            Err(error) => Err(PollError { error, report }),
        }
    }

    fn drain(&mut self, report: &mut PollReport) -> Result<(), ConnectionError> {
        self.state.check_open()?;
        self.apply_registry_changes(report);
        self.flush_outbox()?;

        let budget = self.ready()?;
        for _ in 0..budget {
            let Some(message) = self.receive()? else {
                break;
            };
            report.received += 1;
            self.record(MetricsRecorder::inc_received);

            let event = match self.codec.decode(message.clone()) {
                Ok(event) => event,
                Err(e) => {
                    let preview = &message[..message.len().min(MALFORMED_PREVIEW)];
                    warn!(error = %e, bytes = %hex::encode(preview), "Dropping malformed message");
                    self.record(MetricsRecorder::inc_decode_errors);
                    self.report(report, e.into());
                    continue;
                }
            };

            EventLogger::log_event("inbound", &event.name, event.args.len());
            let name = event.name.clone();
            match self.registry.dispatch(event) {
                Ok(Dispatch::Delivered) => {
                    report.dispatched += 1;
                    self.record(MetricsRecorder::inc_dispatched);
                }
                Ok(Dispatch::Ignored) => {
                    report.ignored += 1;
                    self.record(MetricsRecorder::inc_ignored);
                }
                Err(e) => {
                    warn!(event = %name, error = %e, "Dispatch rejected");
                    self.record(MetricsRecorder::inc_dispatch_errors);
                    self.report(report, e.into());
                }
            }
            self.apply_registry_changes(report);
            self.flush_outbox()?;
        }

        if report.received > 0 {
            debug!(
                received = report.received,
                dispatched = report.dispatched,
                ignored = report.ignored,
                errors = report.errors.len(),
                "Poll pass complete"
            );
        }
        Ok(())
    }

    /// Releases the transport. Calling it again is a no-op, and a failed
    /// connection stays failed.
    pub fn close(&mut self) {
        if matches!(self.state, State::Closed | State::Failed) {
            return;
        }
        self.set_state(State::Closed);
        self.release();
        info!(endpoint = self.endpoint.as_deref().unwrap_or(""), "Connection closed");
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
        self.outbox.lock().state = state;
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.transport.close(session);
        }
        self.outbox.lock().queue.clear();
    }

    fn fail(&mut self, e: ConnectionError) -> ConnectionError {
        error!(error = %e, "Transport failure");
        self.set_state(State::Failed);
        self.release();
        e
    }

    fn transmit(&mut self, message: Bytes) -> Result<(), ConnectionError> {
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return Err(ConnectionError::NotConnected(state));
        };
        match self.transport.try_send(session, message) {
            Ok(()) => {
                self.record(MetricsRecorder::inc_sent);
                Ok(())
            }
            Err(e @ ConnectionError::Backpressure { .. }) => Err(e),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn ready(&mut self) -> Result<usize, ConnectionError> {
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return Err(ConnectionError::NotConnected(state));
        };
        match self.transport.ready(session) {
            Ok(count) => Ok(count),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn receive(&mut self) -> Result<Option<Bytes>, ConnectionError> {
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return Err(ConnectionError::NotConnected(state));
        };
        match self.transport.try_receive(session) {
            Ok(message) => Ok(message),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Stops early, keeping the rest queued, if the transport pushes back.
    fn flush_outbox(&mut self) -> Result<(), ConnectionError> {
        loop {
            let next = self.outbox.lock().queue.pop_front();
            let Some(message) = next else {
                return Ok(());
            };
            match self.transmit(message.clone()) {
                Ok(()) => {}
                Err(ConnectionError::Backpressure { pending }) => {
                    debug!(pending, "Transport is full; keeping queued output");
                    self.outbox.lock().queue.push_front(message);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn apply_registry_changes(&mut self, report: &mut PollReport) {
        for e in self.registry.apply_pending() {
            warn!(error = %e, "Deferred registration refused");
            self.report(report, e.into());
        }
    }

    fn report(&mut self, report: &mut PollReport, e: BusError) {
        if let Some(handler) = self.error_handler.as_mut() {
            handler(&e);
        }
        report.errors.push(e);
    }

    fn record(&self, counter: fn(&MetricsRecorder)) {
        if let Some(metrics) = &self.metrics {
            counter(metrics);
        }
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.close();
    }
}
