//! Cross-thread executor: marshal command invocations onto one designated
//! thread.
//!
//! Some host applications crash if their API is touched from anywhere but
//! the main/UI thread, while the listener must run on a worker thread to
//! avoid blocking that same UI. The executor bridges the two: the dispatcher
//! enqueues a [`WorkItem`] through its [`ExecutorHandle`] and awaits a
//! one-shot reply, while [`Executor::run`] drains the queue on the host's
//! designated thread, strictly one item at a time.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::error::DispatchError;
use crate::hook::{Event, EventHub};
use crate::registry::Command;

/// One queued invocation: the resolved command, its arguments, and the
/// single-use reply slot the result is delivered through. Consumed exactly
/// once by the executor thread.
struct WorkItem {
    command: Command,
    parameters: Map<String, Value>,
    reply: oneshot::Sender<Result<Value, DispatchError>>,
}

/// Submit side handed to the dispatcher.
#[derive(Clone)]
pub struct ExecutorHandle {
    queue: mpsc::Sender<WorkItem>,
    timeout: Duration,
}

impl ExecutorHandle {
    /// Enqueue a command for the designated thread and wait for its result.
    ///
    /// On timeout the item is not cancelled: it still executes eventually and
    /// its result is discarded, so a timed-out call may have had side
    /// effects.
    pub async fn submit(
        &self,
        command: Command,
        parameters: Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        let (tx, rx) = oneshot::channel();
        self.queue
            .send(WorkItem {
                command,
                parameters,
                reply: tx,
            })
            .map_err(|_| DispatchError::Invocation("executor thread is gone".into()))?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DispatchError::Invocation(
                "executor dropped the work item".into(),
            )),
            Err(_) => Err(DispatchError::ExecutorTimeout),
        }
    }

    /// The bound every submit waits for.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Runs command invocations on the one thread the host application considers
/// safe to mutate from. Create with [`Executor::new`], hand the returned
/// handle to the server, and call [`run`](Self::run) from the designated
/// thread.
pub struct Executor {
    queue: mpsc::Receiver<WorkItem>,
    hook: Arc<EventHub>,
}

impl Executor {
    pub fn new(timeout: Duration) -> (Self, ExecutorHandle) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                queue: rx,
                hook: Arc::new(EventHub::new()),
            },
            ExecutorHandle { queue: tx, timeout },
        )
    }

    /// Observers connected here are invoked on the designated thread, after
    /// each invocation, independently of the dispatcher's own notification
    /// on the listener thread.
    pub fn hook(&self) -> &Arc<EventHub> {
        &self.hook
    }

    /// Process work items one at a time until every submit handle is
    /// dropped. No reordering, no concurrent host-thread mutation.
    pub fn run(&self) {
        tracing::info!("executor started");
        while let Ok(item) = self.queue.recv() {
            let WorkItem {
                command,
                parameters,
                reply,
            } = item;
            let name = command.name().to_string();

            let result = command
                .invoke(&parameters)
                .map_err(|e| DispatchError::Invocation(e.to_string()));
            let success = result.is_ok();

            if success {
                tracing::debug!(command = %name, "executor invoked command");
            } else {
                tracing::warn!(command = %name, "command failed on executor thread");
            }
            self.hook.fire(&Event::executed(&name, parameters, success));

            // A timed-out submitter has dropped its receiver; the result is
            // simply discarded in that case.
            let _ = reply.send(result);
        }
        tracing::info!("executor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::EventKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    fn sentinel_command(flag: Arc<AtomicBool>) -> Command {
        Command::from_fn("touch", &[], move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(json!("touched"))
        })
    }

    #[tokio::test]
    async fn submit_round_trips_the_result() {
        let (executor, handle) = Executor::new(Duration::from_secs(1));
        let worker = thread::spawn(move || executor.run());

        let flag = Arc::new(AtomicBool::new(false));
        let result = handle
            .submit(sentinel_command(Arc::clone(&flag)), Map::new())
            .await
            .unwrap();

        assert_eq!(result, json!("touched"));
        assert!(flag.load(Ordering::SeqCst));

        drop(handle);
        worker.join().unwrap();
    }

    #[tokio::test]
    async fn invocation_failure_is_captured() {
        let (executor, handle) = Executor::new(Duration::from_secs(1));
        let worker = thread::spawn(move || executor.run());

        let command = Command::from_fn("boom", &[], |_| {
            Err(crate::error::InvokeError::new("host exploded"))
        });
        let err = handle.submit(command, Map::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "invocation_failure");
        assert!(err.to_string().contains("host exploded"));

        drop(handle);
        worker.join().unwrap();
    }

    #[tokio::test]
    async fn timed_out_item_still_executes() {
        let (executor, handle) = Executor::new(Duration::from_millis(20));
        let worker = thread::spawn(move || executor.run());

        let flag = Arc::new(AtomicBool::new(false));
        let late_flag = Arc::clone(&flag);
        let slow = Command::from_fn("slow", &[], move |_| {
            thread::sleep(Duration::from_millis(150));
            late_flag.store(true, Ordering::SeqCst);
            Ok(Value::Null)
        });

        let err = handle.submit(slow, Map::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "executor_timeout");
        // Abandoned, not cancelled: the item completes after the caller gave up
        assert!(!flag.load(Ordering::SeqCst));
        thread::sleep(Duration::from_millis(300));
        assert!(flag.load(Ordering::SeqCst));

        drop(handle);
        worker.join().unwrap();
    }

    #[tokio::test]
    async fn executed_event_fires_on_the_designated_thread() {
        let (executor, handle) = Executor::new(Duration::from_secs(1));

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        executor.hook().connect(EventKind::Executed, move |event| {
            assert_eq!(event.command, "touch");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let worker = thread::spawn(move || executor.run());
        let flag = Arc::new(AtomicBool::new(false));
        handle
            .submit(sentinel_command(flag), Map::new())
            .await
            .unwrap();

        drop(handle);
        worker.join().unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
