use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

use super::{SampleError, UtilizationReader};

/// A [UtilizationReader] replaying a scripted sequence of readings.
///
/// Both resources draw from the same script. Once it runs out, every sample
/// fails with [SampleError::Unavailable]. Clones share the script, so a test
/// can keep one to inspect how many samples were taken.
#[derive(Clone)]
pub struct MockReader {
    readings: Arc<Mutex<VecDeque<Result<f64, SampleError>>>>,
    taken: Arc<Mutex<usize>>,
    latency: Duration,
}

impl MockReader {
    pub fn new(readings: impl IntoIterator<Item = Result<f64, SampleError>>) -> MockReader {
        MockReader {
            readings: Arc::new(Mutex::new(readings.into_iter().collect())),
            taken: Arc::new(Mutex::new(0)),
            latency: Duration::ZERO,
        }
    }

    /// Scripted successful readings only
    pub fn with_readings(readings: &[f64]) -> MockReader {
        Self::new(readings.iter().map(|r| Ok(*r)))
    }

    /// Make every processor reading take `latency` to complete.
    pub fn with_latency(mut self, latency: Duration) -> MockReader {
        self.latency = latency;
        self
    }

    pub fn samples_taken(&self) -> usize {
        *self.taken.lock().unwrap()
    }

    fn next_reading(&self) -> Result<f64, SampleError> {
        *self.taken.lock().unwrap() += 1;
        self.readings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SampleError::Unavailable("mock readings exhausted".to_owned())))
    }
}

#[async_trait]
impl UtilizationReader for MockReader {
    async fn processor_usage(&mut self, _window: Duration) -> Result<f64, SampleError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.next_reading()
    }

    fn memory_usage(&mut self) -> Result<f64, SampleError> {
        self.next_reading()
    }
}
