use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use super::{SampleError, UtilizationReader};

/// A [UtilizationReader] reading the host's counters through [sysinfo].
pub struct SysinfoReader {
    system: System,
}

impl SysinfoReader {
    pub fn new() -> Result<SysinfoReader, SampleError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SampleError::Unsupported);
        }
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());
        Ok(SysinfoReader {
            system: System::new_with_specifics(refresh_kind),
        })
    }
}

#[async_trait]
impl UtilizationReader for SysinfoReader {
    async fn processor_usage(&mut self, window: Duration) -> Result<f64, SampleError> {
        // Usage is computed from the difference between two refreshes
        self.system.refresh_cpu_all();
        tokio::time::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
        self.system.refresh_cpu_all();
        if self.system.cpus().is_empty() {
            return Err(SampleError::Unavailable(
                "no processors reported by the system".to_owned(),
            ));
        }
        Ok(self.system.global_cpu_usage() as f64)
    }

    fn memory_usage(&mut self) -> Result<f64, SampleError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(SampleError::Unavailable(
                "total memory reported as zero".to_owned(),
            ));
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }
}
