//! Sequential composition of steps and nested activities.
//!
//! An [`ActivitySeries`] owns three disjoint queues — pending, the one task
//! in flight, and completed — whose concatenation is preserved by every
//! add/remove/reset. Tasks execute one at a time with no lock held, so a
//! task may itself be a long-running [`Activity`]; pause and halt are then
//! forwarded into it rather than waiting for the gap between tasks.

use super::{Activity, Controller, Task};
use crate::error::{ControlError, SimError};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Queues {
    pending: VecDeque<Task>,
    current: Option<CurrentTask>,
    completed: Vec<Task>,
}

struct CurrentTask {
    label: String,
    child: Option<Arc<Controller>>,
}

/// Queue sizes at one observable instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub completed: usize,
}

impl SeriesCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.completed
    }
}

/// Cloneable cross-thread surface of a series: queue mutation plus the
/// pause/halt protocol with delegation into the running child.
#[derive(Clone)]
pub struct SeriesHandle {
    controller: Arc<Controller>,
    queues: Arc<Mutex<Queues>>,
}

impl SeriesHandle {
    fn lock(&self) -> MutexGuard<'_, Queues> {
        match self.queues.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Append a task to the pending queue; legal while running.
    pub fn add(&self, task: Task) {
        self.lock().pending.push_back(task);
    }

    /// Remove a task by label, searching pending first, then completed.
    /// The task in flight is in neither queue and cannot be removed.
    pub fn remove(&self, label: &str) -> Option<Task> {
        let mut queues = self.lock();
        if let Some(index) = queues.pending.iter().position(|t| t.label() == label) {
            return queues.pending.remove(index);
        }
        if let Some(index) = queues.completed.iter().position(|t| t.label() == label) {
            return Some(queues.completed.remove(index));
        }
        None
    }

    pub fn counts(&self) -> SeriesCounts {
        let queues = self.lock();
        SeriesCounts {
            pending: queues.pending.len(),
            in_flight: usize::from(queues.current.is_some()),
            completed: queues.completed.len(),
        }
    }

    /// Label of the task currently in flight, if any.
    pub fn current_label(&self) -> Option<String> {
        self.lock().current.as_ref().map(|c| c.label.clone())
    }

    /// Requeue everything that already ran, ahead of what has not run yet.
    /// Only legal while the series is idle.
    pub fn reset(&self) -> Result<(), ControlError> {
        let mut queues = self.lock();
        // Checked under the queue lock: the run loop marks a task current
        // before releasing it, so an active series always fails here.
        if self.controller.is_active() {
            return Err(ControlError::Busy);
        }
        let completed = std::mem::take(&mut queues.completed);
        for task in completed.into_iter().rev() {
            queues.pending.push_front(task);
        }
        Ok(())
    }

    fn current_child(&self) -> Option<Arc<Controller>> {
        self.lock().current.as_ref().and_then(|c| c.child.clone())
    }

    /// Pause with delegation: when the task in flight is itself an
    /// activity, park that activity's run loop (taking effect at its own
    /// poll granularity); otherwise park the series between tasks.
    pub fn pause(&self) {
        match self.current_child() {
            Some(child) => child.pause(),
            None => self.controller.pause(),
        }
    }

    pub fn resume(&self) {
        match self.current_child() {
            Some(child) => child.resume(),
            None => self.controller.resume(),
        }
    }

    /// True when either the series itself or the nested activity in flight
    /// is parked.
    pub fn is_paused(&self) -> bool {
        self.controller.is_paused()
            || self
                .current_child()
                .is_some_and(|child| child.is_paused())
    }

    /// Halt the series and whatever is in flight, and wait for both. The
    /// series is marked halting first so the loop cannot start another
    /// task once the child stops.
    pub fn halt(&self) {
        self.controller.request_halt();
        if let Some(child) = self.current_child() {
            child.halt();
        }
        self.controller.wait_until_idle();
    }
}

/// The sequential group activity.
pub struct ActivitySeries {
    handle: SeriesHandle,
    label: String,
    pause_after_each: bool,
}

impl Default for ActivitySeries {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivitySeries {
    pub fn new() -> Self {
        Self {
            handle: SeriesHandle {
                controller: Arc::new(Controller::new()),
                queues: Arc::new(Mutex::new(Queues::default())),
            },
            label: "series".to_string(),
            pause_after_each: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Request a pause after every completed task, so a supervisor can
    /// single-step the series.
    pub fn with_pause_after_each(mut self) -> Self {
        self.pause_after_each = true;
        self
    }

    /// Builder-style add for assembling a series before running it.
    pub fn with_task(self, task: Task) -> Self {
        self.handle.add(task);
        self
    }

    pub fn handle(&self) -> SeriesHandle {
        self.handle.clone()
    }
}

impl Deref for ActivitySeries {
    type Target = SeriesHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Activity for ActivitySeries {
    fn controller(&self) -> &Arc<Controller> {
        &self.handle.controller
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn run(&mut self) -> Result<(), SimError> {
        loop {
            let mut task = {
                let mut queues = self.handle.lock();
                match queues.pending.pop_front() {
                    Some(task) => {
                        queues.current = Some(CurrentTask {
                            label: task.label().to_string(),
                            child: task.controller().cloned(),
                        });
                        task
                    }
                    None => break,
                }
            };

            // Execute with no lock held; the task may block for a long time
            // and must stay reachable for pause/halt delegation.
            let result = task.perform();

            {
                let mut queues = self.handle.lock();
                queues.current = None;
                queues.completed.push(task);
            }
            result?;

            if self.pause_after_each {
                self.handle.controller.request_pause();
            }
            if !self.handle.controller.keep_going() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Action;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAction {
        label: String,
        counter: Arc<AtomicUsize>,
    }

    impl CountingAction {
        fn new(label: &str, counter: &Arc<AtomicUsize>) -> Self {
            Self {
                label: label.to_string(),
                counter: Arc::clone(counter),
            }
        }
    }

    impl Action for CountingAction {
        fn perform(&mut self) -> Result<(), SimError> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn label(&self) -> &str {
            &self.label
        }
    }

    fn three_step_series(counter: &Arc<AtomicUsize>) -> ActivitySeries {
        ActivitySeries::new()
            .with_task(Task::step(CountingAction::new("first", counter)))
            .with_task(Task::step(CountingAction::new("second", counter)))
            .with_task(Task::step(CountingAction::new("third", counter)))
    }

    #[test]
    fn test_series_runs_all_tasks_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut series = three_step_series(&counter);

        series.perform().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        let counts = series.counts();
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.completed, 3);
        assert!(!series.controller().is_active());
    }

    #[test]
    fn test_queue_concatenation_is_preserved() {
        let counter = Arc::new(AtomicUsize::new(0));
        let series = three_step_series(&counter);
        assert_eq!(series.counts().total(), 3);

        series.add(Task::step(CountingAction::new("fourth", &counter)));
        assert_eq!(series.counts().total(), 4);

        let removed = series.remove("second");
        assert!(removed.is_some());
        assert_eq!(series.counts().total(), 3);

        assert!(series.remove("second").is_none());
        assert_eq!(series.counts().total(), 3);
    }

    #[test]
    fn test_remove_searches_completed_after_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut series = three_step_series(&counter);
        series.perform().unwrap();

        let removed = series.remove("first");
        assert!(removed.is_some());
        assert_eq!(series.counts().completed, 2);
    }

    #[test]
    fn test_reset_requeues_completed_before_pending() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut series = three_step_series(&counter);
        series.perform().unwrap();

        series.add(Task::step(CountingAction::new("late", &counter)));
        series.reset().unwrap();

        let counts = series.counts();
        assert_eq!(counts.pending, 4);
        assert_eq!(counts.completed, 0);

        // Completed tasks come back ahead of tasks that never ran.
        assert_eq!(series.remove("late").map(|t| t.label().to_string()), Some("late".into()));
        series.perform().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_mid_run_add_is_picked_up() {
        struct AddingAction {
            handle: SeriesHandle,
            counter: Arc<AtomicUsize>,
        }

        impl Action for AddingAction {
            fn perform(&mut self) -> Result<(), SimError> {
                self.handle
                    .add(Task::step(CountingAction::new("appended", &self.counter)));
                Ok(())
            }

            fn label(&self) -> &str {
                "adder"
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let mut series = ActivitySeries::new();
        series.add(Task::step(AddingAction {
            handle: series.handle(),
            counter: Arc::clone(&counter),
        }));

        series.perform().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(series.counts().completed, 2);
    }

    #[test]
    fn test_failed_task_still_lands_in_completed() {
        struct FailingAction;

        impl Action for FailingAction {
            fn perform(&mut self) -> Result<(), SimError> {
                Err(ControlError::Busy.into())
            }

            fn label(&self) -> &str {
                "failing"
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let mut series = ActivitySeries::new()
            .with_task(Task::step(FailingAction))
            .with_task(Task::step(CountingAction::new("after", &counter)));

        assert!(series.perform().is_err());

        // The failing task was bookkept before the error propagated, and
        // the rest of the queue never ran.
        let counts = series.counts();
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!series.controller().is_active());
    }
}
