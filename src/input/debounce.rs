use crate::input::events::MouseEventKind;
use crate::prelude::HashMap;
use instant::{Duration, Instant};

struct Pending<T> {
    item: T,
    due: Instant,
}

/// Trailing debounce with one slot per event kind.
///
/// A new item replaces whatever is still waiting for its kind, so only the
/// last item of a burst is ever released.
pub struct Debouncer<T> {
    pending: HashMap<MouseEventKind, Pending<T>>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self {
            pending: HashMap::default(),
        }
    }
}

impl<T> Debouncer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `item` to be released `delay` after `now`. A zero delay releases
    /// it straight away and also drops any older item of that kind.
    pub fn schedule(&mut self, kind: MouseEventKind, item: T, delay: Duration, now: Instant) -> Option<T> {
        if delay.is_zero() {
            self.pending.remove(&kind);
            return Some(item);
        }
        if self.pending.insert(kind, Pending { item, due: now + delay }).is_some() {
            log::debug!("{:?} event superseded before its delay elapsed", kind);
        }
        None
    }

    /// Items whose delay has elapsed, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<T> {
        let mut due: Vec<(MouseEventKind, Instant)> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.due <= now)
            .map(|(kind, pending)| (*kind, pending.due))
            .collect();
        due.sort_by_key(|(_, at)| *at);

        due.into_iter()
            .filter_map(|(kind, _)| self.pending.remove(&kind))
            .map(|pending| pending.item)
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.due).min()
    }

    /// Drops the waiting item of `kind` without releasing it
    pub fn cancel(&mut self, kind: MouseEventKind) -> bool {
        self.pending.remove(&kind).is_some()
    }

    pub fn is_pending(&self, kind: MouseEventKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_zero_delay_passes_through() {
        let mut debouncer = Debouncer::new();
        let now = Instant::now();
        assert_eq!(debouncer.schedule(MouseEventKind::Click, 1, ms(0), now), Some(1));
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_last_event_wins() {
        let mut debouncer = Debouncer::new();
        let start = Instant::now();
        assert_eq!(debouncer.schedule(MouseEventKind::Hover, "first", ms(50), start), None);
        assert_eq!(debouncer.schedule(MouseEventKind::Hover, "second", ms(50), start + ms(10)), None);

        assert!(debouncer.take_due(start + ms(50)).is_empty());
        assert_eq!(debouncer.next_deadline(), Some(start + ms(60)));
        assert_eq!(debouncer.take_due(start + ms(60)), vec!["second"]);
        assert!(debouncer.take_due(start + ms(500)).is_empty());
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut debouncer = Debouncer::new();
        let start = Instant::now();
        debouncer.schedule(MouseEventKind::Hover, "hover", ms(30), start);
        debouncer.schedule(MouseEventKind::Click, "click", ms(10), start);
        assert_eq!(debouncer.take_due(start + ms(40)), vec!["click", "hover"]);

        debouncer.schedule(MouseEventKind::Click, "late", ms(10), start);
        assert!(debouncer.cancel(MouseEventKind::Click));
        assert!(!debouncer.is_pending(MouseEventKind::Click));
        assert!(debouncer.take_due(start + ms(40)).is_empty());
    }
}
