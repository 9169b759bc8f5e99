use std::{fmt, str::FromStr, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::external::utilization::{SampleError, UtilizationReader};

/// Observation window of a processor sample
pub const PROCESSOR_WINDOW: Duration = Duration::from_secs(1);

/// The host resource whose utilization is watched.
///
/// Names are matched case-insensitively, both on the command line and in the
/// configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Resource {
    Processor,
    Memory,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Processor => write!(f, "processor"),
            Resource::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown resource {0:?}, expected cpu or memory")]
pub struct UnknownResource(pub String);

impl TryFrom<String> for Resource {
    type Error = UnknownResource;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" | "processor" => Ok(Resource::Processor),
            "memory" | "mem" => Ok(Resource::Memory),
            _ => Err(UnknownResource(s.to_owned())),
        }
    }
}

/// Takes utilization samples of one resource.
pub struct Sampler<R: UtilizationReader> {
    resource: Resource,
    reader: R,
}

impl<R: UtilizationReader> Sampler<R> {
    pub fn new(resource: Resource, reader: R) -> Sampler<R> {
        Sampler { resource, reader }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Read the utilization in percent.
    ///
    /// A processor sample spans [PROCESSOR_WINDOW], a memory sample is
    /// instantaneous. Readings which aren't a valid percentage are reported as
    /// [SampleError::OutOfRange].
    pub async fn sample(&mut self) -> Result<f64, SampleError> {
        let reading = match self.resource {
            Resource::Processor => self.reader.processor_usage(PROCESSOR_WINDOW).await?,
            Resource::Memory => self.reader.memory_usage()?,
        };
        if (0.0..=100.0).contains(&reading) {
            Ok(reading)
        } else {
            Err(SampleError::OutOfRange(reading))
        }
    }
}
