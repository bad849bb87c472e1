// The transport seam between the node agent and the host.
//
// `HostClient` is the HTTP implementation; tests and alternative
// transports implement the trait directly.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::types::{ControllerInput, HostConfig, ReportEntry};

/// Everything the node agent needs from the remote host.
#[async_trait]
pub trait Host: Send + Sync {
    /// Register with the host and fetch its view of this node.
    async fn handshake(&self) -> Result<HostConfig, Error>;

    /// Post a sensor batch; the host answers with the control actions to apply.
    async fn report_sense(
        &self,
        device_id: &str,
        entries: &[ReportEntry],
    ) -> Result<Vec<ControllerInput>, Error>;

    /// Post controller outcomes. The response body carries nothing.
    async fn report_control(&self, device_id: &str, entries: &[ReportEntry]) -> Result<(), Error>;
}

#[async_trait]
impl<H: Host + ?Sized> Host for Arc<H> {
    async fn handshake(&self) -> Result<HostConfig, Error> {
        (**self).handshake().await
    }

    async fn report_sense(
        &self,
        device_id: &str,
        entries: &[ReportEntry],
    ) -> Result<Vec<ControllerInput>, Error> {
        (**self).report_sense(device_id, entries).await
    }

    async fn report_control(&self, device_id: &str, entries: &[ReportEntry]) -> Result<(), Error> {
        (**self).report_control(device_id, entries).await
    }
}
