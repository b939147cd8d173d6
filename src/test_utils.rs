/*
 * Test utilities and fakes for Chairman
 *
 * Hand-written collaborators for tests that need to inspect what happened
 * after the fact. Tests that only assert on calls use the mockall mocks.
 */

#[cfg(test)]
pub mod test_utils {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::actuator::{ActuationCommand, Actuator};
    use crate::error::Result;
    use crate::readings::ReadingBuffer;
    use crate::scheduler::Sleeper;
    use crate::sensors::SensorSource;

    /// Returns the same raw values every cycle
    #[derive(Debug, Clone)]
    pub struct FixedSource {
        pub raw: Vec<i32>,
        pub calls: usize,
    }

    impl SensorSource for FixedSource {
        fn acquire(&mut self, capacity: usize) -> Result<ReadingBuffer> {
            self.calls += 1;
            Ok(ReadingBuffer::from_raw(capacity, &self.raw))
        }
    }

    pub fn readings_source(raw: &[i32]) -> FixedSource {
        FixedSource { raw: raw.to_vec(), calls: 0 }
    }

    /// Records every command and reports success
    #[derive(Debug, Default)]
    pub struct RecordingActuator {
        pub commands: Vec<ActuationCommand>,
    }

    impl Actuator for RecordingActuator {
        fn apply(&mut self, command: &ActuationCommand) -> Result<()> {
            self.commands.push(command.clone());
            Ok(())
        }
    }

    /// Records requested pauses and raises shutdown after `limit` of them
    #[derive(Debug)]
    pub struct RecordingSleeper {
        pub sleeps: Vec<Duration>,
        limit: usize,
        shutdown: Arc<AtomicBool>,
    }

    impl RecordingSleeper {
        pub fn stop_after(limit: usize, shutdown: Arc<AtomicBool>) -> Self {
            Self { sleeps: Vec::new(), limit, shutdown }
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
            if self.sleeps.len() >= self.limit {
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_fixed_source_counts_calls() {
        let mut source = readings_source(&[5, 9]);
        let buf = source.acquire(24).unwrap();
        assert_eq!(buf.filled(), 2);
        source.acquire(24).unwrap();
        assert_eq!(source.calls, 2);
    }
}
