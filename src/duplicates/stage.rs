//! Fixed-size worker pools connecting pipeline stages.
//!
//! A [`WorkerPool`] runs `workers` threads that drain one shared bounded
//! input queue and push their results to one bounded output queue. The pool
//! is owned by a coordinator thread that joins every worker (scoped threads)
//! and only then drops the output sender. The output therefore closes exactly
//! when the input is exhausted and every worker has finished, whatever order
//! the workers finish in.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

/// A running pool of workers and the receiving end of its output queue.
#[derive(Debug)]
pub struct WorkerPool<O> {
    output: Receiver<O>,
    coordinator: JoinHandle<()>,
}

impl<O: Send + 'static> WorkerPool<O> {
    /// Spawn a pool of `workers` threads named after `name`.
    ///
    /// Each worker takes items from `input` and pushes everything `work`
    /// returns for it to the output queue (capacity `capacity`). A worker
    /// stops when `input` is closed and empty, or when the output has no
    /// receiver left.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator thread cannot be spawned. Failing
    /// to spawn individual workers is logged; the pool runs with the workers
    /// it got, and with none the coordinator drains the input itself.
    pub fn spawn<I, F>(
        name: &str,
        workers: usize,
        input: Receiver<I>,
        capacity: usize,
        work: F,
    ) -> io::Result<Self>
    where
        I: Send + 'static,
        F: Fn(I) -> Vec<O> + Send + Sync + 'static,
    {
        let (tx, rx) = bounded(capacity);
        let pool_name = name.to_string();

        let coordinator = thread::Builder::new()
            .name(pool_name.clone())
            .spawn(move || run_pool(&pool_name, workers.max(1), &input, tx, &work))?;

        Ok(Self {
            output: rx,
            coordinator,
        })
    }

    /// The receiving end of the output queue.
    #[must_use]
    pub fn output(&self) -> &Receiver<O> {
        &self.output
    }

    /// Split the pool into its output queue and coordinator handle.
    #[must_use]
    pub fn into_parts(self) -> (Receiver<O>, JoinHandle<()>) {
        (self.output, self.coordinator)
    }
}

fn run_pool<I, O, F>(name: &str, workers: usize, input: &Receiver<I>, output: Sender<O>, work: &F)
where
    I: Send,
    O: Send,
    F: Fn(I) -> Vec<O> + Sync,
{
    let spawned = thread::scope(|s| {
        let mut spawned = 0;
        for i in 0..workers {
            let output = output.clone();
            let worker = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn_scoped(s, move || drain(input, &output, work));
            match worker {
                Ok(_) => spawned += 1,
                Err(e) => log::warn!("Failed to spawn {} worker {}: {}", name, i, e),
            }
        }
        if spawned == 0 {
            drain(input, &output, work);
        }
        spawned
    });

    log::debug!("{}: all {} workers finished", name, spawned);
    // Every worker is joined; closing the output now is what tells the next
    // stage that this one is done.
    drop(output);
}

fn drain<I, O, F>(input: &Receiver<I>, output: &Sender<O>, work: &F)
where
    F: Fn(I) -> Vec<O>,
{
    for item in input {
        for result in work(item) {
            if output.send(result).is_err() {
                log::debug!("Downstream closed, stopping worker");
                return;
            }
        }
    }
}
