/// Holder for state that an awaited operation moves out while it runs.
///
/// Requests that find the slot empty are counted, so whoever puts the value
/// back knows the page may have changed underneath it.
#[derive(Debug)]
pub struct BusySlot<T> {
    value: Option<T>,
    dropped: usize,
}

impl<T> BusySlot<T> {
    pub const fn new() -> Self {
        Self {
            value: None,
            dropped: 0,
        }
    }

    /// Moves the value out, or records a dropped request when it is away.
    pub fn take(&mut self) -> Option<T> {
        let value = self.value.take();
        if value.is_none() {
            self.dropped += 1;
        }
        value
    }

    /// Requests dropped since the last `put`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn put(&mut self, value: T) {
        self.value = Some(value);
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::BusySlot;

    #[test]
    fn empty_slot_counts_dropped_requests() {
        let mut slot = BusySlot::<u32>::new();
        assert_eq!(slot.take(), None);
        assert_eq!(slot.take(), None);
        assert_eq!(slot.dropped(), 2);
        slot.put(7);
        assert_eq!(slot.dropped(), 0);
        assert_eq!(slot.take(), Some(7));
    }

    #[test]
    fn request_during_operation_is_reported_on_return() {
        let mut slot = BusySlot::new();
        slot.put("app");
        let app = slot.take().unwrap();
        // A select changes while the app is away.
        assert_eq!(slot.take(), None);
        assert_eq!(slot.dropped(), 1);
        slot.put(app);
        assert_eq!(slot.dropped(), 0);
        assert_eq!(slot.take(), Some("app"));
    }

    #[test]
    fn uninterrupted_operation_reports_nothing_dropped() {
        let mut slot = BusySlot::new();
        slot.put(1u8);
        let value = slot.take().unwrap();
        assert_eq!(slot.dropped(), 0);
        slot.put(value + 1);
        assert_eq!(slot.take(), Some(2));
    }
}
