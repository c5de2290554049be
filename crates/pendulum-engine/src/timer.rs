//! Tick-scheduled one-shot and repeating callbacks.
//!
//! Each [`Timer`] entry owns its callback directly, invoked with the shared
//! state a callback is expected to need -- the entity registry, the PRNG,
//! the tick it fired on, and a [`TimerScheduler`] handle for scheduling
//! further timers -- passed in for the duration of the call, the same
//! by-reference-for-one-call pattern [`crate::event_manager::EventManager::dispatch`]
//! uses to hand a caller-owned `Recorder` through without the manager
//! storing a second reference to state the `Engine` already owns.

use std::panic::{self, AssertUnwindSafe};

use pendulum_core::prng::Prng;
use pendulum_core::registry::Registry;

/// Safety cap on how many times [`Timer::update`]'s outer collect-fire-reschedule
/// loop may repeat inside a single call. Guards against a pathological
/// combination of periods and a large `delta_ticks` looping effectively
/// forever.
const MAX_BATCH_ITERATIONS: u32 = 1_000;

type TimerCallback = Box<dyn FnMut(&mut Registry, &mut Prng, u64, &mut TimerScheduler<'_>)>;

fn noop_callback() -> TimerCallback {
    Box::new(|_registry, _prng, _tick, _scheduler| {})
}

struct Entry {
    id: u64,
    callback: TimerCallback,
    target_tick: u64,
    /// `None` for a one-shot. `Some(0)` for a zero-interval repeater (fires
    /// at most once per `update`, see [`Timer::set_interval`]). `Some(n)`,
    /// `n > 0`, for a normal repeating timer.
    interval: Option<u64>,
    active: bool,
}

/// Handle passed to a firing callback for scheduling further timers.
///
/// Anything scheduled through this handle is held in a side buffer and only
/// merged into the live timer table after the enclosing [`Timer::update`]
/// call returns, computed relative to the tick that *started* that update --
/// this is what guarantees a timer created from inside a callback cannot
/// itself fire within the same `update`, even if its requested delay is
/// zero or negative.
pub struct TimerScheduler<'a> {
    pending: &'a mut Vec<Entry>,
    next_id: &'a mut u64,
    base_tick: u64,
}

impl<'a> TimerScheduler<'a> {
    fn alloc_id(&mut self) -> u64 {
        let id = *self.next_id;
        *self.next_id += 1;
        id
    }

    /// Schedule a one-shot timer, relative to the tick the enclosing
    /// `update` started at.
    pub fn set_timeout(
        &mut self,
        delay_ticks: i64,
        callback: impl FnMut(&mut Registry, &mut Prng, u64, &mut TimerScheduler<'_>) + 'static,
    ) -> u64 {
        let target_tick = self.base_tick.saturating_add_signed(delay_ticks);
        let id = self.alloc_id();
        self.pending.push(Entry {
            id,
            callback: Box::new(callback),
            target_tick,
            interval: None,
            active: true,
        });
        id
    }

    /// Schedule a repeating timer, relative to the tick the enclosing
    /// `update` started at.
    pub fn set_interval(
        &mut self,
        period_ticks: i64,
        callback: impl FnMut(&mut Registry, &mut Prng, u64, &mut TimerScheduler<'_>) + 'static,
    ) -> u64 {
        let effective_period = period_ticks.max(0) as u64;
        let target_tick = self.base_tick.saturating_add(effective_period);
        let id = self.alloc_id();
        self.pending.push(Entry {
            id,
            callback: Box::new(callback),
            target_tick,
            interval: Some(effective_period),
            active: true,
        });
        id
    }
}

/// A read-only snapshot of one scheduled timer, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerInfo {
    pub id: u64,
    pub target_tick: u64,
    pub interval: Option<u64>,
    pub active: bool,
}

/// A collection of scheduled one-shot and repeating timers.
///
/// Tracks its own notion of the current tick (`reset` to 0, advanced only by
/// [`Timer::update`]) so that a callback scheduling a new timer through the
/// [`TimerScheduler`] it's handed computes its target relative to the tick
/// that *started* the in-progress `update`, never the tick `update` is
/// currently racing towards.
pub struct Timer {
    next_id: u64,
    entries: Vec<Entry>,
    current_tick: u64,
    is_updating: bool,
    update_start_tick: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
            current_tick: 0,
            is_updating: false,
            update_start_tick: 0,
        }
    }

    fn base_tick(&self) -> u64 {
        if self.is_updating {
            self.update_start_tick
        } else {
            self.current_tick
        }
    }

    /// Schedule a one-shot timer at `base + delay_ticks`, where `base` is
    /// the current tick. `delay_ticks <= 0` is legal and schedules a target
    /// at or before `base`, i.e. due on the next `update` whose resulting
    /// tick reaches it. Intended for top-level scheduling (e.g. from
    /// `Simulation::setup`); a callback already firing inside `Timer::update`
    /// schedules through the [`TimerScheduler`] it's handed instead.
    pub fn set_timeout(&mut self, delay_ticks: i64, callback: impl FnMut(&mut Registry, &mut Prng, u64, &mut TimerScheduler<'_>) + 'static) -> u64 {
        let target_tick = self.base_tick().saturating_add_signed(delay_ticks);
        let id = self.alloc_id();
        self.entries.push(Entry {
            id,
            callback: Box::new(callback),
            target_tick,
            interval: None,
            active: true,
        });
        id
    }

    /// Schedule a repeating timer, first firing at `base + period_ticks`
    /// and every `period_ticks` after. `period_ticks <= 0` schedules a
    /// zero-interval repeater: it fires at most once per `update` call,
    /// rescheduling to `currentTick + 1` immediately after firing so it
    /// cannot loop forever within one `update`.
    pub fn set_interval(&mut self, period_ticks: i64, callback: impl FnMut(&mut Registry, &mut Prng, u64, &mut TimerScheduler<'_>) + 'static) -> u64 {
        let effective_period = period_ticks.max(0) as u64;
        let target_tick = self.base_tick().saturating_add(effective_period);
        let id = self.alloc_id();
        self.entries.push(Entry {
            id,
            callback: Box::new(callback),
            target_tick,
            interval: Some(effective_period),
            active: true,
        });
        id
    }

    /// Cancel a scheduled timer outright. Returns whether it was found.
    pub fn clear(&mut self, id: u64) -> bool {
        let len_before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != len_before
    }

    /// Suspend a timer without losing its schedule: it neither fires nor
    /// reschedules while paused. Returns whether the id was found.
    pub fn pause(&mut self, id: u64) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.active = false;
                true
            }
            None => false,
        }
    }

    /// Reactivate a paused timer. Returns whether the id was found.
    pub fn resume(&mut self, id: u64) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.active = true;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Advance from the current tick to the caller's already-computed new
    /// total `total_ticks`, firing every due timer.
    ///
    /// Implements the collect-sort-fire-reschedule batch loop: repeatedly
    /// collect every active timer with `target_tick <= total_ticks`, fire
    /// them in `(target_tick asc, id asc)` order, reschedule or drop each,
    /// and repeat until a batch collects nothing, a zero-interval repeater
    /// fires (which ends the whole call early by design), or the iteration
    /// safety cap is hit. A panicking callback is caught, logged, and does
    /// not stop the rest of its batch or subsequent batches. Timers
    /// scheduled by a firing callback through its [`TimerScheduler`] are
    /// merged into the live table only after this entire call returns.
    ///
    /// Returns the ids that fired, in firing order, for diagnostics; a
    /// repeating timer crossed more than once by a large delta appears
    /// once per crossing.
    pub fn update(&mut self, total_ticks: u64, registry: &mut Registry, prng: &mut Prng) -> Vec<u64> {
        self.update_start_tick = self.current_tick;
        self.current_tick = total_ticks;
        self.is_updating = true;

        let mut pending: Vec<Entry> = Vec::new();
        let mut fired = Vec::new();
        let mut iterations = 0u32;

        loop {
            let mut due: Vec<u64> = self
                .entries
                .iter()
                .filter(|e| e.active && e.target_tick <= self.current_tick)
                .map(|e| e.id)
                .collect();
            if due.is_empty() {
                break;
            }
            due.sort_by_key(|&id| {
                let entry = self.entries.iter().find(|e| e.id == id).expect("id just collected from self.entries");
                (entry.target_tick, id)
            });

            for id in &due {
                let Some(idx) = self.entries.iter().position(|e| e.id == *id) else {
                    // cleared by an earlier callback in this same batch
                    continue;
                };
                let mut callback = std::mem::replace(&mut self.entries[idx].callback, noop_callback());
                let tick = self.current_tick;
                let mut scheduler = TimerScheduler {
                    pending: &mut pending,
                    next_id: &mut self.next_id,
                    base_tick: self.update_start_tick,
                };
                let result = panic::catch_unwind(AssertUnwindSafe(|| callback(registry, prng, tick, &mut scheduler)));
                if result.is_err() {
                    tracing::error!(timer_id = *id, "timer callback panicked; isolated, not rethrown");
                }
                if let Some(entry) = self.entries.iter_mut().find(|e| e.id == *id) {
                    entry.callback = callback;
                }
                fired.push(*id);
            }

            let mut stop_after_batch = false;
            self.entries.retain_mut(|e| {
                if !due.contains(&e.id) {
                    return true;
                }
                match e.interval {
                    None => false,
                    Some(0) => {
                        e.target_tick = self.current_tick + 1;
                        stop_after_batch = true;
                        true
                    }
                    Some(period) => {
                        e.target_tick += period;
                        true
                    }
                }
            });

            iterations += 1;
            if stop_after_batch {
                break;
            }
            if iterations >= MAX_BATCH_ITERATIONS {
                tracing::warn!("timer update hit the batch-iteration safety cap; remaining firings deferred to a later update");
                break;
            }
        }

        self.entries.append(&mut pending);
        self.is_updating = false;
        fired
    }

    /// Drop every scheduled timer and rewind the internal tick counter to
    /// 0. Does not reset the monotonic id counter.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.current_tick = 0;
        self.is_updating = false;
        self.update_start_tick = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }

    /// Snapshot of every scheduled timer, in internal (non-deterministic
    /// across runs) storage order -- callers that need deterministic
    /// diagnostics should sort by `id`.
    pub fn info(&self) -> Vec<TimerInfo> {
        self.entries
            .iter()
            .map(|e| TimerInfo {
                id: e.id,
                target_tick: e.target_tick,
                interval: e.interval,
                active: e.active,
            })
            .collect()
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fire_log() -> (
        Rc<RefCell<Vec<u64>>>,
        impl FnMut(&mut Registry, &mut Prng, u64, &mut TimerScheduler<'_>) + 'static,
    ) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let cb = move |_: &mut Registry, _: &mut Prng, tick: u64, _: &mut TimerScheduler<'_>| log_clone.borrow_mut().push(tick);
        (log, cb)
    }

    #[test]
    fn one_shot_fires_once_then_is_dropped() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let (log, cb) = fire_log();
        let id = timer.set_timeout(5, cb);

        timer.update(5, &mut registry, &mut prng);
        assert!(log.borrow().is_empty());

        let fired = timer.update(6, &mut registry, &mut prng);
        assert_eq!(fired, vec![id]);
        assert_eq!(*log.borrow(), vec![6]);

        timer.update(100, &mut registry, &mut prng);
        assert_eq!(log.borrow().len(), 1, "one-shot does not fire twice");
        assert!(timer.is_empty());
    }

    #[test]
    fn interval_reschedules_for_each_period_crossed() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let (log, cb) = fire_log();
        timer.set_interval(2, cb);

        timer.update(10, &mut registry, &mut prng);
        assert_eq!(*log.borrow(), vec![10, 10, 10, 10, 10]);
        assert_eq!(timer.len(), 1);
    }

    #[test]
    fn fires_in_target_tick_then_id_order() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_clone = order.clone();
        let late = timer.set_timeout(5, move |_, _, _, _| order_clone.borrow_mut().push("late"));
        let order_clone = order.clone();
        let early_higher_id = timer.set_timeout(2, move |_, _, _, _| order_clone.borrow_mut().push("early_higher"));
        let order_clone = order.clone();
        let early_lower_id = timer.set_timeout(2, move |_, _, _, _| order_clone.borrow_mut().push("early_lower"));
        assert!(early_lower_id < early_higher_id);
        assert!(early_higher_id < late);

        timer.update(10, &mut registry, &mut prng);
        assert_eq!(*order.borrow(), vec!["early_lower", "early_higher", "late"]);
    }

    #[test]
    fn zero_interval_repeater_fires_at_most_once_per_update() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let (log, cb) = fire_log();
        timer.set_interval(0, cb);

        timer.update(10, &mut registry, &mut prng);
        assert_eq!(log.borrow().len(), 1);

        timer.update(11, &mut registry, &mut prng);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn timer_scheduled_from_inside_a_callback_cannot_fire_in_the_same_update() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let inner_fired = Rc::new(RefCell::new(false));

        timer.set_timeout(0, {
            let inner_fired = inner_fired.clone();
            move |_registry, _prng, _tick, scheduler| {
                let inner_fired = inner_fired.clone();
                scheduler.set_timeout(0, move |_, _, _, _| *inner_fired.borrow_mut() = true);
            }
        });

        // Outer timer (target 0) fires on this very update; the timer it
        // schedules (delay 0, base = update_start_tick = 0) must not also
        // fire within this same call even though 0 <= 5.
        timer.update(5, &mut registry, &mut prng);
        assert!(!*inner_fired.borrow(), "timer created mid-callback fired in the same update");

        // It does fire on the very next update.
        timer.update(6, &mut registry, &mut prng);
        assert!(*inner_fired.borrow());
    }

    #[test]
    fn clear_removes_pending_timer() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let (log, cb) = fire_log();
        let id = timer.set_timeout(1, cb);
        assert!(timer.clear(id));
        assert!(!timer.clear(id));
        timer.update(10, &mut registry, &mut prng);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn paused_timer_does_not_fire_or_reschedule() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let (log, cb) = fire_log();
        let id = timer.set_interval(2, cb);

        assert!(timer.pause(id));
        timer.update(10, &mut registry, &mut prng);
        assert!(log.borrow().is_empty());

        assert!(timer.resume(id));
        timer.update(20, &mut registry, &mut prng);
        assert_eq!(log.borrow().len(), 5, "still targeting tick 2 after resuming, unaffected by paused time");
    }

    #[test]
    fn pause_and_resume_report_whether_the_id_existed() {
        let mut timer = Timer::new();
        assert!(!timer.pause(999));
        assert!(!timer.resume(999));
    }

    #[test]
    fn active_count_excludes_paused_timers() {
        let mut timer = Timer::new();
        let a = timer.set_timeout(10, |_, _, _, _| {});
        let _b = timer.set_timeout(10, |_, _, _, _| {});
        timer.pause(a);
        assert_eq!(timer.len(), 2);
        assert_eq!(timer.active_count(), 1);
    }

    #[test]
    fn panicking_callback_is_isolated_and_does_not_stop_the_batch() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let (log, cb) = fire_log();

        timer.set_timeout(0, |_, _, _, _| panic!("boom"));
        timer.set_timeout(0, cb);

        let fired = timer.update(1, &mut registry, &mut prng);
        assert_eq!(fired.len(), 2);
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn runaway_batch_is_capped_by_iteration_count() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let (log, cb) = fire_log();
        timer.set_interval(1, cb);

        timer.update(1_000_000, &mut registry, &mut prng);
        assert!(log.borrow().len() <= MAX_BATCH_ITERATIONS as usize);
        assert!(!log.borrow().is_empty());
    }

    #[test]
    fn clearing_a_timer_before_it_is_due_prevents_it_from_firing() {
        let mut timer = Timer::new();
        let mut registry = Registry::new();
        let mut prng = Prng::from_seed("t");
        let victim_fired = Rc::new(RefCell::new(false));

        let victim = timer.set_timeout(0, {
            let flag = victim_fired.clone();
            move |_, _, _, _| *flag.borrow_mut() = true
        });
        timer.clear(victim);

        timer.update(1, &mut registry, &mut prng);
        assert!(!*victim_fired.borrow());
    }

    #[test]
    fn info_reports_every_scheduled_timer() {
        let mut timer = Timer::new();
        let id = timer.set_timeout(3, |_, _, _, _| {});
        let info = timer.info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].id, id);
        assert_eq!(info[0].target_tick, 3);
        assert!(info[0].active);
    }

    #[test]
    fn reset_drops_entries_and_rewinds_tick_but_keeps_id_counter() {
        let mut timer = Timer::new();
        timer.set_timeout(1, |_, _, _, _| {});
        let next_after_first = timer.set_timeout(1, |_, _, _, _| {});
        timer.reset();
        assert!(timer.is_empty());
        let id_after_reset = timer.set_timeout(1, |_, _, _, _| {});
        assert!(id_after_reset > next_after_first);
    }
}
