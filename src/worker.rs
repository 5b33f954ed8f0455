// Worker abstraction used by the row pipeline's filter-parallel and
// reconstruct-parallel scheduling modes (section 4.4, "Concurrency &
// Resource Model"). A `Worker<T>` owns one OS thread and runs a single
// caller-supplied hook against each payload handed to it via `launch`;
// `sync` blocks until that hook returns.
//
// The channels are bounded at capacity 1, so `launch` backpressures a
// second payload until `sync` has drained the first - this is what keeps
// "at most one job in flight per worker" an invariant rather than a
// convention.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};

pub struct Worker<T: Send + 'static> {
  job_tx: Sender<T>,
  done_rx: Receiver<()>,
  thread: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Worker<T> {
  pub fn spawn<F>(hook: F) -> Self
  where
    F: Fn(T) + Send + 'static,
  {
    let (job_tx, job_rx) = bounded::<T>(1);
    let (done_tx, done_rx) = bounded::<()>(1);

    let thread = thread::spawn(move || {
      while let Ok(job) = job_rx.recv() {
        hook(job);
        if done_tx.send(()).is_err() {
          break;
        }
      }
    });

    Self { job_tx, done_rx, thread: Some(thread) }
  }

  // Hand a payload to the worker thread. Panics if the worker thread has
  // already terminated (a programming error: callers must `sync` before
  // the owning `Worker` is dropped on any remaining in-flight job).
  pub fn launch(&self, payload: T) {
    self.job_tx.send(payload).expect("worker thread terminated unexpectedly");
  }

  // Block until the most recently launched job's hook has returned.
  pub fn sync(&self) {
    self.done_rx.recv().expect("worker thread terminated unexpectedly");
  }
}

impl<T: Send + 'static> Drop for Worker<T> {
  fn drop(&mut self) {
    // Dropping `job_tx` happens implicitly as part of the struct's own
    // drop, which closes the channel and lets the worker's receive loop
    // exit; join it so the OS thread doesn't outlive its `Worker`.
    if let Some(handle) = self.thread.take() {
      let _ = handle.join();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[test]
  fn launch_then_sync_runs_the_hook_once() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let worker = Worker::spawn(move |amount: u32| {
      counter_clone.fetch_add(amount, Ordering::SeqCst);
    });

    worker.launch(5);
    worker.sync();
    assert_eq!(counter.load(Ordering::SeqCst), 5);

    worker.launch(7);
    worker.sync();
    assert_eq!(counter.load(Ordering::SeqCst), 12);
  }
}
