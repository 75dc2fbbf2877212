#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct TimerEntry<T> {
    id: TimerId,
    remaining_seconds: f32,
    payload: T,
}

/// Countdown timers advanced by the fixed tick. Timers that expire on the
/// same tick fire in scheduling order. Ids are never reused.
#[derive(Debug)]
pub struct TickTimers<T> {
    next_id: u64,
    entries: Vec<TimerEntry<T>>,
}

impl<T> Default for TickTimers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> TickTimers<T> {
    pub fn push(&mut self, delay_seconds: f32, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.entries.push(TimerEntry {
            id,
            remaining_seconds: delay_seconds.max(0.0),
            payload,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn tick(&mut self, fixed_dt_seconds: f32) -> Vec<T> {
        let mut fired = Vec::new();
        let mut remaining_entries = Vec::with_capacity(self.entries.len());
        for mut entry in self.entries.drain(..) {
            entry.remaining_seconds -= fixed_dt_seconds;
            if entry.remaining_seconds <= 0.0 {
                fired.push(entry.payload);
            } else {
                remaining_entries.push(entry);
            }
        }
        self.entries = remaining_entries;
        fired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_after_delay_elapses() {
        let mut timers = TickTimers::default();
        timers.push(0.5, "a");

        assert!(timers.tick(0.25).is_empty());
        assert_eq!(timers.tick(0.25), vec!["a"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn same_tick_expiry_fires_in_scheduling_order() {
        let mut timers = TickTimers::default();
        timers.push(0.2, "second");
        timers.push(0.1, "first");

        let fired = timers.tick(0.5);
        assert_eq!(fired, vec!["second", "first"]);
    }

    #[test]
    fn cancel_removes_pending_timer() {
        let mut timers = TickTimers::default();
        let doomed = timers.push(1.0, "doomed");
        timers.push(1.0, "kept");

        assert!(timers.cancel(doomed));
        assert!(!timers.cancel(doomed));
        assert_eq!(timers.tick(1.0), vec!["kept"]);
    }

    #[test]
    fn zero_delay_fires_on_next_tick() {
        let mut timers = TickTimers::default();
        timers.push(0.0, "now");
        assert_eq!(timers.tick(0.016), vec!["now"]);
    }

    #[test]
    fn clear_drops_all_entries() {
        let mut timers = TickTimers::default();
        timers.push(1.0, 1u32);
        timers.push(2.0, 2u32);
        timers.clear();
        assert!(timers.is_empty());
        assert!(timers.tick(5.0).is_empty());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut timers = TickTimers::default();
        let first = timers.push(0.1, ());
        let _ = timers.tick(1.0);
        let second = timers.push(0.1, ());
        assert_ne!(first, second);
    }
}
