//! Monitor hot-plug reconciliation.

/// Physical identity of a monitor record.
pub trait SameMonitor: Sized {
    /// Whether both records describe the same physical display.
    fn is_same_monitor(&self, other: &Self) -> bool;

    /// Take the window-system binding from a fresh enumeration of the same
    /// display, keeping per-monitor state.
    fn update_from(&mut self, fresh: Self);
}

/// Outcome of [`MonitorRegistry::refresh`].
#[derive(Debug)]
pub struct MonitorChanges<T> {
    /// Indices into [`MonitorRegistry::monitors`] of newly seen monitors.
    pub connected: Vec<usize>,
    /// Records whose display disappeared. Dropping them releases their
    /// native resources.
    pub disconnected: Vec<T>,
}

impl<T> MonitorChanges<T> {
    pub fn is_empty(&self) -> bool {
        self.connected.is_empty() && self.disconnected.is_empty()
    }
}

/// The current set of monitor records.
#[derive(Debug)]
pub struct MonitorRegistry<T> {
    monitors: Vec<T>,
}

impl<T> Default for MonitorRegistry<T> {
    fn default() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }
}

impl<T: SameMonitor> MonitorRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn monitors(&self) -> &[T] {
        &self.monitors
    }

    pub fn monitors_mut(&mut self) -> &mut [T] {
        &mut self.monitors
    }

    /// The first monitor in enumeration order.
    pub fn primary(&self) -> Option<&T> {
        self.monitors.first()
    }

    /// Replace the current list with a fresh enumeration.
    ///
    /// Records that still describe a connected display are kept so that
    /// per-monitor state survives, and are updated from their fresh
    /// duplicate through [`SameMonitor::update_from`].
    pub fn refresh(&mut self, fresh: Vec<T>) -> MonitorChanges<T> {
        let mut previous: Vec<Option<T>> = std::mem::take(&mut self.monitors)
            .into_iter()
            .map(Some)
            .collect();

        let mut connected = Vec::new();
        for (index, monitor) in fresh.into_iter().enumerate() {
            let existing = previous
                .iter_mut()
                .find(|slot| {
                    slot.as_ref()
                        .is_some_and(|old| old.is_same_monitor(&monitor))
                })
                .and_then(Option::take);

            match existing {
                Some(mut old) => {
                    old.update_from(monitor);
                    self.monitors.push(old);
                }
                None => {
                    self.monitors.push(monitor);
                    connected.push(index);
                }
            }
        }

        let disconnected = previous.into_iter().flatten().collect();
        MonitorChanges {
            connected,
            disconnected,
        }
    }

    /// Drop every record, returning them to the caller.
    pub fn clear(&mut self) -> Vec<T> {
        std::mem::take(&mut self.monitors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Fake {
        id: u32,
        generation: u32,
        screen: u32,
    }

    impl SameMonitor for Fake {
        fn is_same_monitor(&self, other: &Self) -> bool {
            self.id == other.id
        }

        fn update_from(&mut self, fresh: Self) {
            self.screen = fresh.screen;
        }
    }

    fn fake(id: u32, generation: u32) -> Fake {
        Fake {
            id,
            generation,
            screen: 0,
        }
    }

    #[test]
    fn first_refresh_connects_everything() {
        let mut registry = MonitorRegistry::new();
        let changes = registry.refresh(vec![fake(1, 0), fake(2, 0)]);
        assert_eq!(changes.connected, vec![0, 1]);
        assert!(changes.disconnected.is_empty());
        assert_eq!(registry.primary(), Some(&fake(1, 0)));
    }

    #[test]
    fn surviving_monitors_keep_their_record() {
        let mut registry = MonitorRegistry::new();
        registry.refresh(vec![fake(1, 0), fake(2, 0)]);

        let changes = registry.refresh(vec![fake(3, 1), fake(1, 1)]);

        assert_eq!(changes.connected, vec![0]);
        assert_eq!(changes.disconnected, vec![fake(2, 0)]);
        assert_eq!(registry.monitors(), &[fake(3, 1), fake(1, 0)]);
    }

    #[test]
    fn unchanged_refresh_reports_nothing() {
        let mut registry = MonitorRegistry::new();
        registry.refresh(vec![fake(7, 0)]);
        assert!(registry.refresh(vec![fake(7, 1)]).is_empty());
        assert_eq!(registry.clear(), vec![fake(7, 0)]);
        assert!(registry.monitors().is_empty());
    }

    #[test]
    fn kept_records_take_the_fresh_binding() {
        let mut registry = MonitorRegistry::new();
        registry.refresh(vec![fake(1, 0)]);

        let rebound = Fake {
            id: 1,
            generation: 1,
            screen: 9,
        };
        assert!(registry.refresh(vec![rebound]).is_empty());

        let kept = &registry.monitors()[0];
        assert_eq!(kept.generation, 0);
        assert_eq!(kept.screen, 9);
    }
}
