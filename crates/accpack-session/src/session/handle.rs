//! Handle to the underlying shared session.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use accpack_core::SessionConfig;

use crate::events::{Connection, SessionEvent, Stream};
use crate::registry::ObserverRegistry;

use super::state::SessionState;
use super::types::{ConnectionState, DispatchReport, SessionStats};

/// One underlying session and its observers.
///
/// The transport feeds events in through [`publish`](Self::publish) or an
/// [`event_forwarder`](Self::event_forwarder); each event updates the session
/// state and is then fanned out to every registered observer.
#[derive(Debug)]
pub struct SessionHandle {
    config: SessionConfig,
    registry: ObserverRegistry,
    state: RwLock<SessionState>,
    /// Serialises publishes so every observer sees the same order.
    publish_lock: ReentrantMutex<RefCell<PublishQueue>>,
    /// Dropped with the handle, which stops every event forwarder.
    shutdown_tx: watch::Sender<bool>,
}

/// Events published from inside a callback, waiting for the current fan-out.
#[derive(Debug, Default)]
struct PublishQueue {
    draining: bool,
    pending: VecDeque<(u64, SessionEvent)>,
}

/// Ends a drain, also on unwind out of an observer callback.
struct DrainGuard<'a>(&'a RefCell<PublishQueue>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let mut queue = self.0.borrow_mut();
        queue.draining = false;
        queue.pending.clear();
    }
}

impl SessionHandle {
    /// Create the session for `config`.
    pub fn new(config: SessionConfig) -> Self {
        info!(
            session_id = config.session_id(),
            api_key = config.api_key(),
            "Session created"
        );
        Self {
            config,
            registry: ObserverRegistry::new(),
            state: RwLock::new(SessionState::default()),
            publish_lock: ReentrantMutex::new(RefCell::new(PublishQueue::default())),
            shutdown_tx: watch::channel(false).0,
        }
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn api_key(&self) -> &str {
        self.config.api_key()
    }

    pub fn session_id(&self) -> &str {
        self.config.session_id()
    }

    pub const fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    /// Publish an event from the transport to every registered observer.
    ///
    /// Publishing from inside an observer callback does not deliver the
    /// nested event right away: it gets its sequence number and state update
    /// immediately, then waits until the outer event has reached every
    /// observer. The outermost publish delivers queued events in sequence
    /// order before returning. A queued event reports `deferred: true` and
    /// `delivered: 0`.
    pub fn publish(&self, event: SessionEvent) -> DispatchReport {
        let serial = self.publish_lock.lock();

        let sequence = {
            let mut state = self.state.write();
            state.apply(&event);
            state.next_sequence()
        };

        if serial.borrow().draining {
            debug!(
                session_id = self.session_id(),
                sequence,
                event = event.name(),
                "Event queued behind in-flight delivery"
            );
            serial.borrow_mut().pending.push_back((sequence, event));
            return DispatchReport {
                sequence,
                delivered: 0,
                deferred: true,
            };
        }

        serial.borrow_mut().draining = true;
        let _drain = DrainGuard(&serial);

        let delivered = self.deliver(sequence, &event);
        loop {
            let next = serial.borrow_mut().pending.pop_front();
            let Some((queued_sequence, queued)) = next else {
                break;
            };
            self.deliver(queued_sequence, &queued);
        }

        DispatchReport {
            sequence,
            delivered,
            deferred: false,
        }
    }

    fn deliver(&self, sequence: u64, event: &SessionEvent) -> usize {
        let delivered = self.registry.dispatch(event);
        debug!(
            session_id = self.session_id(),
            sequence,
            event = event.name(),
            delivered,
            "Event published"
        );
        delivered
    }

    /// Create a sender channel for forwarding transport events.
    ///
    /// Events sent on the channel are published in the order received. The
    /// forwarding task stops once every sender is dropped or this handle is
    /// dropped, whichever comes first. Must be called from within a tokio
    /// runtime.
    pub fn event_forwarder(self: &Arc<Self>, capacity: usize) -> mpsc::Sender<SessionEvent> {
        let (tx, mut rx) = mpsc::channel::<SessionEvent>(capacity.max(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let session = Arc::downgrade(self);
        let session_id = self.session_id().to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = rx.recv() => {
                        let Some(event) = received else {
                            break;
                        };
                        let Some(session) = session.upgrade() else {
                            break;
                        };
                        session.publish(event);
                    }
                    // Only errors once the handle, and its sender, are gone.
                    Err(_) = shutdown_rx.changed() => break,
                }
            }
            debug!(session_id, "Event forwarder stopped");
        });

        tx
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.read().connection_state
    }

    /// This client's own connection, once connected.
    pub fn connection(&self) -> Option<Connection> {
        self.state.read().connection.clone()
    }

    /// Active streams, ordered by stream id.
    pub fn streams(&self) -> Vec<Stream> {
        self.state.read().streams.values().cloned().collect()
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.state.read();
        SessionStats {
            observer_count: self.registry.len(),
            events_published: state.events_published(),
            active_streams: state.streams.len(),
            connection_state: state.connection_state,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::events::{Signal, VideoType};
    use crate::observer::SessionObserver;
    use parking_lot::Mutex;
    use std::sync::Weak;
    use std::thread;

    fn handle() -> Arc<SessionHandle> {
        Arc::new(SessionHandle::new(
            SessionConfig::new("12345", "session-1", "token").unwrap(),
        ))
    }

    fn signal(data: String) -> SessionEvent {
        SessionEvent::SignalReceived(Signal {
            kind: Some("chat".into()),
            data,
            from_connection: None,
        })
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl SessionObserver for Recorder {
        fn on_event(&self, event: &SessionEvent) {
            self.events.lock().push(event.clone());
        }
    }

    /// Answers every `Connected` with a greeting signal.
    struct Greeter {
        session: Weak<SessionHandle>,
        replies: Mutex<Vec<DispatchReport>>,
    }

    impl Greeter {
        fn new(session: &Arc<SessionHandle>) -> Self {
            Self {
                session: Arc::downgrade(session),
                replies: Mutex::new(Vec::new()),
            }
        }
    }

    impl SessionObserver for Greeter {
        fn on_connected(&self, _connection: &Connection) {
            if let Some(session) = self.session.upgrade() {
                let report = session.publish(signal("hello".into()));
                self.replies.lock().push(report);
            }
        }
    }

    fn connected() -> SessionEvent {
        SessionEvent::Connected(Connection {
            connection_id: "me".into(),
            data: None,
        })
    }

    #[test]
    fn publish_assigns_sequence_and_counts_deliveries() {
        let session = handle();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        session.registry().register(&a).unwrap();
        session.registry().register(&b).unwrap();

        let first = session.publish(SessionEvent::Reconnecting);
        let second = session.publish(SessionEvent::Reconnected);

        assert_eq!(first.sequence, 1);
        assert_eq!(first.delivered, 2);
        assert_eq!(second.sequence, 2);
        assert_eq!(
            *a.events.lock(),
            vec![SessionEvent::Reconnecting, SessionEvent::Reconnected]
        );
    }

    #[test]
    fn publish_without_observers_still_updates_state() {
        let session = handle();
        let report = session.publish(connected());

        assert_eq!(report.delivered, 0);
        assert_eq!(session.connection_state(), ConnectionState::Connected);
        assert_eq!(session.connection().unwrap().connection_id, "me");
    }

    #[test]
    fn observers_see_the_same_order_under_concurrent_publishers() {
        let session = handle();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        session.registry().register(&a).unwrap();
        session.registry().register(&b).unwrap();

        thread::scope(|s| {
            for publisher in ["left", "right"] {
                let session = &session;
                s.spawn(move || {
                    for i in 0..200 {
                        session.publish(signal(format!("{publisher}-{i}")));
                    }
                });
            }
        });

        let seen_a = a.events.lock().clone();
        let seen_b = b.events.lock().clone();
        assert_eq!(seen_a.len(), 400);
        assert_eq!(seen_a, seen_b);

        let left: Vec<String> = seen_a
            .iter()
            .filter_map(|e| match e {
                SessionEvent::SignalReceived(s) if s.data.starts_with("left-") => {
                    Some(s.data.clone())
                }
                _ => None,
            })
            .collect();
        let expected: Vec<String> = (0..200).map(|i| format!("left-{i}")).collect();
        assert_eq!(left, expected);
    }

    #[test]
    fn nested_publish_reaches_every_observer_after_the_outer_event() {
        // Fresh sessions and allocations each round vary the snapshot order.
        for _ in 0..32 {
            let session = handle();
            let greeter = Arc::new(Greeter::new(&session));
            let recorders: Vec<Arc<Recorder>> =
                (0..8).map(|_| Arc::new(Recorder::default())).collect();
            for recorder in &recorders[..4] {
                session.registry().register(recorder).unwrap();
            }
            session.registry().register(&greeter).unwrap();
            for recorder in &recorders[4..] {
                session.registry().register(recorder).unwrap();
            }

            let report = session.publish(connected());

            assert_eq!(report.sequence, 1);
            assert_eq!(report.delivered, 9);
            assert!(!report.deferred);
            for recorder in &recorders {
                assert_eq!(
                    *recorder.events.lock(),
                    vec![connected(), signal("hello".into())]
                );
            }
            assert_eq!(
                *greeter.replies.lock(),
                vec![DispatchReport {
                    sequence: 2,
                    delivered: 0,
                    deferred: true,
                }]
            );
            assert_eq!(session.stats().events_published, 2);
        }
    }

    #[test]
    fn publish_after_a_nested_drain_is_delivered_directly() {
        let session = handle();
        let greeter = Arc::new(Greeter::new(&session));
        let recorder = Arc::new(Recorder::default());
        session.registry().register(&greeter).unwrap();
        session.registry().register(&recorder).unwrap();

        session.publish(connected());
        let report = session.publish(SessionEvent::Disconnected);

        assert!(!report.deferred);
        assert_eq!(report.sequence, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(
            *recorder.events.lock(),
            vec![
                connected(),
                signal("hello".into()),
                SessionEvent::Disconnected
            ]
        );
    }

    #[test]
    fn panicking_observer_does_not_wedge_publishing() {
        struct Faulty;
        impl SessionObserver for Faulty {
            fn on_reconnecting(&self) {
                panic!("observer failure");
            }
        }

        let session = handle();
        let faulty = Arc::new(Faulty);
        let recorder = Arc::new(Recorder::default());
        session.registry().register(&faulty).unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            session.publish(SessionEvent::Reconnecting);
        }));
        assert!(outcome.is_err());

        session.registry().deregister(&faulty).unwrap();
        session.registry().register(&recorder).unwrap();
        let report = session.publish(SessionEvent::Reconnected);

        assert!(!report.deferred);
        assert_eq!(report.delivered, 1);
        assert_eq!(*recorder.events.lock(), vec![SessionEvent::Reconnected]);
    }

    #[test]
    fn stats_reflect_streams_and_observers() {
        let session = handle();
        let recorder = Arc::new(Recorder::default());
        session.registry().register(&recorder).unwrap();

        for id in ["s2", "s1"] {
            session.publish(SessionEvent::StreamCreated(Stream {
                stream_id: id.into(),
                connection_id: "remote".into(),
                name: None,
                video_type: VideoType::Screen,
                has_audio: false,
                has_video: true,
            }));
        }

        let stats = session.stats();
        assert_eq!(stats.observer_count, 1);
        assert_eq!(stats.events_published, 2);
        assert_eq!(stats.active_streams, 2);
        assert_eq!(stats.connection_state, ConnectionState::Disconnected);

        let ids: Vec<String> = session.streams().into_iter().map(|s| s.stream_id).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn forwarder_publishes_in_order() {
        let session = handle();
        let recorder = Arc::new(Recorder::default());
        session.registry().register(&recorder).unwrap();

        let tx = session.event_forwarder(8);
        for i in 0..20 {
            tx.send(signal(i.to_string())).await.unwrap();
        }
        tx.send(SessionEvent::Disconnected).await.unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while recorder.events.lock().last() != Some(&SessionEvent::Disconnected) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("forwarder did not deliver all events");

        let events = recorder.events.lock();
        assert_eq!(events.len(), 21);
        assert_eq!(events[0], signal("0".into()));
        assert_eq!(events[19], signal("19".into()));
    }

    #[tokio::test]
    async fn forwarder_stops_when_handle_is_dropped() {
        let session = handle();
        let tx = session.event_forwarder(8);
        drop(session);

        tokio::time::timeout(std::time::Duration::from_secs(5), tx.closed())
            .await
            .expect("forwarder kept running after the handle was dropped");
    }
}
