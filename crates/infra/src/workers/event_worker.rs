use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use learnhub_events::{EventBus, Subscription};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Generic event worker loop.
///
/// - Subscribes to an event bus
/// - Applies a handler for each message; handler errors are logged and the
///   loop continues
/// - Stops on shutdown request or when the bus goes away
#[derive(Debug)]
pub struct EventWorker;

impl EventWorker {
    /// Spawn a worker thread that processes events from a bus subscription.
    ///
    /// The subscription is taken before this returns, so events published
    /// afterwards are never missed. `handler` must tolerate redelivery.
    pub fn spawn<M, B, H, E>(name: &'static str, bus: B, mut handler: H) -> io::Result<WorkerHandle>
    where
        M: Send + 'static,
        B: EventBus<M> + Send + Sync + 'static,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Display + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &mut handler))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<M, H, E>(
    name: &'static str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    handler: &mut H,
) where
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Display,
{
    loop {
        if shutdown_rx.try_recv().is_ok() {
            debug!(worker = name, "shutdown requested");
            break;
        }

        match sub.recv_timeout(POLL_INTERVAL) {
            Ok(msg) => {
                if let Err(err) = handler(msg) {
                    warn!(worker = name, error = %err, "event worker handler failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use learnhub_events::InMemoryEventBus;

    #[test]
    fn handler_errors_do_not_stop_the_worker() {
        let bus = Arc::new(InMemoryEventBus::<u32>::new());
        let (seen_tx, seen_rx) = mpsc::channel();

        let handle = EventWorker::spawn("test-worker", Arc::clone(&bus), move |n: u32| {
            let _ = seen_tx.send(n);
            if n == 1 { Err("odd event") } else { Ok(()) }
        })
        .unwrap();

        bus.publish(1).unwrap();
        bus.publish(2).unwrap();

        let timeout = Duration::from_secs(5);
        assert_eq!(seen_rx.recv_timeout(timeout).unwrap(), 1);
        assert_eq!(seen_rx.recv_timeout(timeout).unwrap(), 2);

        handle.shutdown();
    }

    #[test]
    fn shutdown_joins_an_idle_worker() {
        let bus = Arc::new(InMemoryEventBus::<u32>::new());
        let handle =
            EventWorker::spawn("idle-worker", Arc::clone(&bus), |_: u32| Ok::<(), String>(()))
                .unwrap();

        assert_eq!(bus.subscriber_count(), 1);
        handle.shutdown();
    }
}
