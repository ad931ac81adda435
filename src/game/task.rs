//! Cooperative, cancellable step sequences driven by the frame loop.
//!
//! A lifecycle state owns one [`TaskSlot`]. Starting a task cancels whatever the slot
//! was running before, including a task that is in the middle of being driven: the
//! driver sees its token flip and drops it instead of putting it back.

use std::cell::Cell;
use std::rc::Rc;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// What a step asks the driver to do next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow<S> {
    /// Run `S` immediately, in the same tick.
    Next(S),
    /// Resume with `S` on the next tick.
    Yield(S),
    /// Resume with `S` once this many seconds have elapsed.
    Sleep(S, f32),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Done,
    Cancelled,
}

#[derive(Debug)]
pub struct Task<S> {
    step: S,
    token: CancelToken,
    delay: f32,
    last_frame: Option<u64>,
}

impl<S: Copy> Task<S> {
    #[cfg(test)]
    pub fn step(&self) -> S {
        self.step
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run steps until one yields, sleeps, finishes, or the task gets cancelled.
    /// A task is driven at most once per `frame`.
    pub fn drive<F>(&mut self, dt: f32, frame: u64, mut run: F) -> Status
    where
        F: FnMut(S) -> Flow<S>,
    {
        if self.token.is_cancelled() {
            return Status::Cancelled;
        }
        if self.last_frame == Some(frame) {
            return Status::Pending;
        }
        let resumed = self.last_frame.is_some();
        self.last_frame = Some(frame);
        if resumed && self.delay > 0.0 {
            self.delay -= dt;
            if self.delay > 0.0 {
                return Status::Pending;
            }
        }
        self.delay = 0.0;
        loop {
            let flow = run(self.step);
            if self.token.is_cancelled() {
                return Status::Cancelled;
            }
            match flow {
                Flow::Next(next) => self.step = next,
                Flow::Yield(next) => {
                    self.step = next;
                    return Status::Pending;
                }
                Flow::Sleep(next, secs) => {
                    self.step = next;
                    self.delay = secs;
                    return Status::Pending;
                }
                Flow::Done => return Status::Done,
            }
        }
    }
}

/// Holds at most one live task for a lifecycle state.
#[derive(Debug)]
pub struct TaskSlot<S> {
    task: Option<Task<S>>,
    live: Option<CancelToken>,
    started: u64,
}

impl<S> Default for TaskSlot<S> {
    fn default() -> Self {
        Self {
            task: None,
            live: None,
            started: 0,
        }
    }
}

impl<S: Copy> TaskSlot<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the current task (if any) and install a new one starting at `step`.
    pub fn start(&mut self, step: S) -> CancelToken {
        self.cancel();
        let token = CancelToken::new();
        self.live = Some(token.clone());
        self.task = Some(Task {
            step,
            token: token.clone(),
            delay: 0.0,
            last_frame: None,
        });
        self.started += 1;
        tracing::trace!(started = self.started, "task started");
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.live.take() {
            token.cancel();
        }
        self.task = None;
    }

    /// Borrow the task out of the slot for driving.
    pub fn take(&mut self) -> Option<Task<S>> {
        self.task.take()
    }

    /// Put a pending task back. Finished or superseded tasks are dropped.
    pub fn restore(&mut self, task: Task<S>, status: Status) {
        if status == Status::Pending && !task.is_cancelled() && self.task.is_none() {
            self.task = Some(task);
        } else if status == Status::Done && !task.is_cancelled() {
            self.live = None;
        }
    }

    /// A task is installed or currently being driven.
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.live.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    #[cfg(test)]
    pub fn current_step(&self) -> Option<S> {
        self.task.as_ref().map(Task::step)
    }

    /// Number of tasks ever started in this slot.
    #[cfg(test)]
    pub fn started(&self) -> u64 {
        self.started
    }
}
