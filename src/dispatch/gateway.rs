use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::domain::{CommandKind, Device};
use crate::error::GridError;

/// Field-communication failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("device {0} unreachable")]
    Unreachable(String),
    #[error("device {0} rejected the command: {1}")]
    Rejected(String, String),
    #[error("no acknowledgement within {0} ms")]
    Timeout(u64),
}

impl From<GatewayError> for GridError {
    fn from(error: GatewayError) -> Self {
        GridError::DeviceOperation(error.to_string())
    }
}

/// Link to the physical device-communication layer (SCADA / AMI head-end).
///
/// `operate` resolves once the device has acknowledged or refused the
/// switching operation. Retries, if any, belong behind this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceGateway: Send + Sync {
    async fn operate(&self, device: &Device, kind: CommandKind) -> Result<(), GatewayError>;
}

/// Simulated field devices with response latency and random refusals
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    latency_ms: RangeInclusive<u64>,
    failure_rate: f64,
}

impl SimulatedGateway {
    pub fn new(latency_ms: RangeInclusive<u64>, failure_rate: f64) -> Self {
        Self {
            latency_ms,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    /// Responds immediately and never fails
    pub fn instant() -> Self {
        Self::new(0..=0, 0.0)
    }
}

#[async_trait]
impl DeviceGateway for SimulatedGateway {
    async fn operate(&self, device: &Device, _kind: CommandKind) -> Result<(), GatewayError> {
        // ThreadRng is not Send; draw everything before the first await.
        let (delay_ms, refuse) = {
            let mut rng = rand::thread_rng();
            let delay = if self.latency_ms.is_empty() {
                0
            } else {
                rng.gen_range(self.latency_ms.clone())
            };
            (delay, rng.gen_bool(self.failure_rate))
        };

        if delay_ms > 0 {
            sleep(Duration::from_millis(delay_ms)).await;
        }

        if refuse {
            return Err(GatewayError::Rejected(
                device.id.to_string(),
                "interlock engaged".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gateway for builds without field simulation and no head-end attached;
/// every operation fails as unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

#[async_trait]
impl DeviceGateway for OfflineGateway {
    async fn operate(&self, device: &Device, _kind: CommandKind) -> Result<(), GatewayError> {
        Err(GatewayError::Unreachable(device.id.to_string()))
    }
}
