//! Certificate serial numbers
//!
//! Serial numbers are wall-clock milliseconds. Each allocation waits for the
//! clock to tick past the millisecond it observed on entry, so two
//! certificates forged back to back never share a serial number.

use parking_lot::{const_mutex, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

static GLOBAL: SerialNumberSource = SerialNumberSource::new();

/// Monotonic serial number allocator
pub struct SerialNumberSource {
    last: Mutex<u64>,
}

impl SerialNumberSource {
    pub const fn new() -> Self {
        SerialNumberSource {
            last: const_mutex(0),
        }
    }

    /// Process-wide source used by the certificate forge
    pub fn global() -> &'static SerialNumberSource {
        &GLOBAL
    }

    /// Allocate the next serial number
    ///
    /// Blocks for up to one millisecond while the clock advances. The result
    /// is strictly greater than any value previously returned by this source,
    /// even if the wall clock steps backwards.
    pub fn next(&self) -> u64 {
        self.next_with(now_millis)
    }

    fn next_with(&self, clock: impl Fn() -> Option<u64>) -> u64 {
        let mut last = self.last.lock();
        // Without a usable clock the counter alone keeps serials apart
        let next = match clock() {
            Some(entered) => loop {
                match clock() {
                    Some(now) if now == entered => std::hint::spin_loop(),
                    now => break now.unwrap_or(0),
                }
            },
            None => 0,
        };
        *last = next.max(*last + 1);
        *last
    }
}

impl Default for SerialNumberSource {
    fn default() -> Self {
        SerialNumberSource::new()
    }
}

/// Milliseconds since the Unix epoch, `None` for a clock set before it
fn now_millis() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequential_serials_increase() {
        let source = SerialNumberSource::new();
        let mut previous = source.next();
        for _ in 0..20 {
            let next = source.next();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_serial_tracks_wall_clock() {
        let before = now_millis().unwrap();
        let serial = SerialNumberSource::new().next();
        assert!(serial > before);
    }

    #[test]
    fn test_clock_before_epoch_still_advances() {
        let source = SerialNumberSource::new();
        assert_eq!(source.next_with(|| None), 1);
        assert_eq!(source.next_with(|| None), 2);
        assert_eq!(source.next_with(|| None), 3);
    }

    #[test]
    fn test_waits_for_clock_tick() {
        let source = SerialNumberSource::new();
        let reads = Cell::new(0u64);
        let clock = || {
            reads.set(reads.get() + 1);
            // Stuck at 100 for the first three reads
            Some(if reads.get() <= 3 { 100 } else { 101 })
        };

        assert_eq!(source.next_with(clock), 101);
        assert_eq!(reads.get(), 4);

        // A clock stepping backwards cannot repeat a serial
        let ticks = Cell::new(60u64);
        let backwards = || {
            ticks.set(ticks.get() - 1);
            Some(ticks.get())
        };
        assert_eq!(source.next_with(backwards), 102);
    }

    #[test]
    fn test_concurrent_serials_are_distinct() {
        let source = Arc::new(SerialNumberSource::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let source = Arc::clone(&source);
                thread::spawn(move || (0..10).map(|_| source.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for serial in handle.join().unwrap() {
                assert!(seen.insert(serial), "duplicate serial {}", serial);
            }
        }
        assert_eq!(seen.len(), 40);
    }

    #[test]
    fn test_global_source_is_shared() {
        let a = SerialNumberSource::global().next();
        let b = SerialNumberSource::global().next();
        assert!(b > a);
    }
}
