// Copyright 2025 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation frames and deferred work.
//!
//! Hosts drive time by calling their container's frame entry point once per display frame.
//! Work that must wait for the next frame is parked in a [`Deferred`] slot: scheduling
//! replaces whatever was pending (last request wins), and the slot is emptied before the task
//! is handed back to run.

use tracing::trace;

/// Frame counter and timestamp supplied by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameClock {
    frame: u64,
    now_ms: f64,
}

impl FrameClock {
    /// A clock at frame 0, time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to the next frame at `now_ms`. Time never runs backwards.
    pub fn tick(&mut self, now_ms: f64) {
        self.frame += 1;
        if now_ms.is_finite() && now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
    }

    /// Current frame number.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Current time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }
}

/// Handle of a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

#[derive(Debug)]
struct Pending<T> {
    handle: FrameHandle,
    scheduled_in: u64,
    task: T,
}

/// A single-slot pending task.
#[derive(Debug)]
pub struct Deferred<T> {
    slot: Option<Pending<T>>,
    generation: u64,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    /// An empty slot.
    pub const fn new() -> Self {
        Self {
            slot: None,
            generation: 0,
        }
    }

    /// Schedules `task` for the first frame after `clock`'s current one.
    ///
    /// Any task already pending is cancelled.
    pub fn schedule(&mut self, clock: &FrameClock, task: T) -> FrameHandle {
        if let Some(prev) = self.slot.take() {
            trace!(handle = prev.handle.0, "superseded pending frame task");
        }
        self.generation += 1;
        let handle = FrameHandle(self.generation);
        self.slot = Some(Pending {
            handle,
            scheduled_in: clock.frame(),
            task,
        });
        handle
    }

    /// Cancels the pending task, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take().map(|p| p.task)
    }

    /// Returns `true` if a task is pending.
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// The handle of the pending task.
    pub fn handle(&self) -> Option<FrameHandle> {
        self.slot.as_ref().map(|p| p.handle)
    }

    /// Takes the task if `clock` has moved past the frame it was scheduled in.
    ///
    /// The slot is empty when this returns `Some`, so the task may reschedule itself.
    pub fn take_due(&mut self, clock: &FrameClock) -> Option<T> {
        let due = self
            .slot
            .as_ref()
            .is_some_and(|p| clock.frame() > p.scheduled_in);
        if due { self.cancel() } else { None }
    }
}
