//! # mcell-sched
//!
//! Hierarchical cascaded time-wheel scheduler (spec.md §4.5 — component
//! C5), ported from `original_source/src/sched_util.c`'s
//! `schedule_helper`: a chain of circular buffers ("levels"), each
//! covering a wider time span at coarser resolution, with overflowing
//! events cascading down (fine to coarse) on insert and bubbling back up
//! (coarse to fine) only once the coarse slot they were parked in is
//! finally reached.
//!
//! `depth` in the original is a process-global counter that never resets
//! and aborts the whole program past 10 *cumulative* scheduler
//! constructions. That reads as an implementation accident rather than a
//! deliberate limit; this port instead bounds the recursion depth of one
//! scheduler's own level chain (spec.md §9's open-question resolution),
//! surfaced as `McellError::Internal` rather than a process exit.

use std::collections::VecDeque;

use mcell_core::{constants, McellError, Result, Time};

#[derive(Debug, Clone)]
struct ScheduledItem<T> {
    time: Time,
    data: T,
}

#[derive(Debug)]
struct Level<T> {
    dt: Time,
    now: Time,
    buf_len: usize,
    index: usize,
    count: u64,
    slots: Vec<VecDeque<ScheduledItem<T>>>,
    next_scale: Option<Box<Level<T>>>,
}

impl<T> Level<T> {
    fn new(dt_min: Time, dt_max: Time, maxlen: usize, start_time: Time, depth: u32) -> Result<Self> {
        if depth >= constants::SCHEDULER_MAX_LEVELS {
            return Err(McellError::Internal(
                "scheduler hierarchy exceeded its maximum depth".to_string(),
            ));
        }
        let n_slots = dt_max / dt_min;
        let len = if n_slots < (maxlen as f64 - 1.0) {
            n_slots as usize + 1
        } else {
            maxlen
        };
        let mut level = Level {
            dt: dt_min,
            now: start_time,
            buf_len: len.max(1),
            index: 0,
            count: 0,
            slots: (0..len.max(1)).map(|_| VecDeque::new()).collect(),
            next_scale: None,
        };
        if level.dt * level.buf_len as Time < dt_max {
            level.next_scale = Some(Box::new(Level::new(
                dt_min * level.buf_len as Time,
                dt_max,
                maxlen,
                level.now + dt_min * level.buf_len as Time,
                depth + 1,
            )?));
        }
        Ok(level)
    }

    fn insert(&mut self, time: Time, data: T) -> Result<()> {
        self.count += 1;
        let nsteps = (time - self.now) / self.dt;
        if nsteps < self.buf_len as f64 {
            let mut i = if nsteps < 0.0 {
                self.index
            } else {
                self.index + nsteps as usize
            };
            if i >= self.buf_len {
                i -= self.buf_len;
            }
            self.slots[i].push_back(ScheduledItem { time, data });
        } else {
            if self.next_scale.is_none() {
                self.next_scale = Some(Box::new(Level::new(
                    self.dt * self.buf_len as Time,
                    self.dt * self.buf_len as Time * self.buf_len as Time,
                    self.buf_len + 1,
                    self.now + self.dt * self.buf_len as Time,
                    0,
                )?));
            }
            self.next_scale
                .as_mut()
                .expect("just ensured Some above")
                .insert(time, data)?;
        }
        Ok(())
    }

    /// Drain the current slot, advance `now`/`index`, and — on wraparound
    /// — pull the next coarser level's due slot down into this one
    /// (spec.md §4.5's cascade step). The coarser level's `count` is
    /// already reflected in `self.count` from when those events first
    /// cascaded *down* past this level on insert, so the temporary
    /// re-inserts here must not double-count them: `self.count` is
    /// snapshotted and restored around the cascade, mirroring the
    /// original's `conservecount`.
    fn advance(&mut self) -> Vec<ScheduledItem<T>> {
        let drained: Vec<ScheduledItem<T>> = self.slots[self.index].drain(..).collect();
        self.count -= drained.len() as u64;
        self.index += 1;
        self.now += self.dt;

        if self.index >= self.buf_len {
            self.index = 0;
            if let Some(next) = self.next_scale.as_mut() {
                let conserved_count = self.count;
                let pulled = next.advance();
                for item in pulled {
                    self.insert(item.time, item.data)
                        .expect("re-inserting an already-scheduled item cannot exceed depth");
                }
                self.count = conserved_count;
            }
        }
        drained
    }

    fn total_count(&self) -> u64 {
        self.count
    }
}

/// A hierarchical event scheduler over payload type `T` (spec.md §4.5).
#[derive(Debug)]
pub struct Scheduler<T> {
    root: Level<T>,
    current: VecDeque<ScheduledItem<T>>,
}

impl<T> Scheduler<T> {
    /// `dt_min` is the width of one slot at the finest level, `dt_max`
    /// the time span the whole hierarchy must cover without growing a
    /// new level, and `maxlen` the maximum slots per level.
    pub fn new(dt_min: Time, dt_max: Time, maxlen: usize, start_time: Time) -> Result<Self> {
        Ok(Self {
            root: Level::new(dt_min, dt_max, maxlen, start_time, 0)?,
            current: VecDeque::new(),
        })
    }

    pub fn now(&self) -> Time {
        self.root.now
    }

    /// Schedule `data` for `time`. When `put_neg_in_current` is set and
    /// `time` already lies in the past, the item skips the time-wheel
    /// entirely and joins the current-slot FIFO directly (spec.md §4.5's
    /// "late insert" case).
    pub fn insert(&mut self, time: Time, data: T, put_neg_in_current: bool) -> Result<()> {
        if put_neg_in_current && time < self.root.now {
            self.current.push_back(ScheduledItem { time, data });
            return Ok(());
        }
        self.root.insert(time, data)
    }

    /// Total number of items scheduled anywhere in the hierarchy plus the
    /// current-slot FIFO; `0` means the scheduler is fully drained.
    pub fn total_count(&self) -> u64 {
        self.root.total_count() + self.current.len() as u64
    }

    /// Pop the next due item in FIFO order, together with the time it was
    /// scheduled for — `Scheduler::now()` reflects the time wheel's
    /// internal advance and can already be one `dt` ahead of the item by
    /// the time this returns, so callers that need "when did this event
    /// happen" must use the returned time, not `now()`. Returns `None`
    /// both when the current slot was empty and had to be refilled from
    /// the time wheel (the caller should call again) and when the
    /// scheduler is fully drained; check [`Scheduler::total_count`] to
    /// distinguish the two.
    pub fn next(&mut self) -> Option<(Time, T)> {
        if let Some(item) = self.current.pop_front() {
            return Some((item.time, item.data));
        }
        self.current = self.root.advance().into();
        None
    }

    /// Convenience loop around [`Scheduler::next`]: keeps advancing until
    /// an item is found or the scheduler is exhausted.
    pub fn next_due(&mut self) -> Option<(Time, T)> {
        loop {
            if let Some(item) = self.next() {
                return Some(item);
            }
            if self.total_count() == 0 {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_come_back_in_time_order() {
        let mut sh: Scheduler<&'static str> = Scheduler::new(1.0, 10.0, 10, 0.0).unwrap();
        sh.insert(3.0, "third", true).unwrap();
        sh.insert(1.0, "first", true).unwrap();
        sh.insert(2.0, "second", true).unwrap();

        let mut seen = Vec::new();
        while let Some((_, item)) = sh.next_due() {
            seen.push(item);
        }
        assert_eq!(seen, vec!["first", "second", "third"]);
    }

    #[test]
    fn equal_time_items_are_fifo() {
        let mut sh: Scheduler<u32> = Scheduler::new(1.0, 10.0, 10, 0.0).unwrap();
        sh.insert(5.0, 1, true).unwrap();
        sh.insert(5.0, 2, true).unwrap();
        sh.insert(5.0, 3, true).unwrap();

        let mut seen = Vec::new();
        while sh.total_count() > 0 {
            if let Some((_, item)) = sh.next() {
                seen.push(item);
            }
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn events_beyond_the_first_levels_span_cascade_through_a_coarser_level() {
        // dt_min=1, maxlen=4 => level 0 only covers [0,4). An event at
        // t=50 must fall through to a coarser level and later cascade
        // back down correctly.
        let mut sh: Scheduler<&'static str> = Scheduler::new(1.0, 8.0, 4, 0.0).unwrap();
        sh.insert(50.0, "far future", true).unwrap();
        sh.insert(2.0, "soon", true).unwrap();

        let (_, first) = sh.next_due().unwrap();
        assert_eq!(first, "soon");
        let (_, second) = sh.next_due().unwrap();
        assert_eq!(second, "far future");
    }

    #[test]
    fn total_count_reaches_zero_once_drained() {
        let mut sh: Scheduler<u32> = Scheduler::new(1.0, 10.0, 10, 0.0).unwrap();
        sh.insert(1.0, 1, true).unwrap();
        assert_eq!(sh.total_count(), 1);
        sh.next_due();
        assert_eq!(sh.total_count(), 0);
        assert!(sh.next_due().is_none());
    }

    #[test]
    fn deeply_nested_span_is_rejected_as_internal_error() {
        // dt_max/dt_min astronomically large relative to maxlen forces
        // the constructor to recurse past the depth bound.
        let res: Result<Scheduler<u32>> = Scheduler::new(1e-12, 1e12, 2, 0.0);
        assert!(matches!(res, Err(McellError::Internal(_))));
    }
}
