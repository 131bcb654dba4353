use std::{io, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use tokio::{io::AsyncRead, task::JoinHandle};
use tracing::{info, warn};

use crate::{serial::frame::FramedLines, state::buttons::ButtonHub};

/// Baud rate used by the buzzer firmware unless configured otherwise.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;

/// Where and how to open the buzzer serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub path: String,
    /// Line speed in baud.
    pub baud_rate: u32,
}

/// Connection state of the buzzer link as exposed to displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkStatus {
    /// No port is open.
    Disconnected,
    /// A reader owns the port.
    Connected {
        /// Device path.
        path: String,
        /// Line speed in baud.
        baud_rate: u32,
    },
    /// The last open or read failed; buttons were released.
    Failed {
        /// Rendered cause.
        message: String,
    },
}

/// Failures of the serial transport.
#[derive(Debug, Error)]
pub enum SerialError {
    /// Serial access is not available in this build.
    #[error("serial transport is not supported by this build")]
    Unsupported,
    /// The port could not be opened.
    #[error("failed to open serial port `{path}`")]
    Open {
        /// Device path that failed.
        path: String,
        /// Driver error.
        #[source]
        source: io::Error,
    },
    /// Reading from the port failed (disconnect, driver error).
    #[error("serial read failed")]
    Read(#[source] io::Error),
    /// The device closed the stream.
    #[error("serial stream closed by device")]
    Closed,
}

/// Exclusive owner of one serial reader task and, through it, of the port.
///
/// Dropping the link aborts the reader, which closes the port.
pub struct SerialLink {
    settings: SerialSettings,
    hub: Arc<ButtonHub>,
    task: JoinHandle<()>,
}

impl SerialLink {
    /// Open the configured port and start feeding `hub`.
    #[cfg(feature = "serial")]
    pub fn open(settings: SerialSettings, hub: Arc<ButtonHub>) -> Result<Self, SerialError> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(settings.path.as_str(), settings.baud_rate)
            .open_native_async()
            .map_err(|source| SerialError::Open {
                path: settings.path.clone(),
                source: source.into(),
            })?;
        Ok(Self::attach(port, settings, hub))
    }

    /// Serial support is compiled out; every attempt fails immediately.
    #[cfg(not(feature = "serial"))]
    pub fn open(settings: SerialSettings, _hub: Arc<ButtonHub>) -> Result<Self, SerialError> {
        warn!(path = %settings.path, "serial support not compiled in");
        Err(SerialError::Unsupported)
    }

    /// Start reading button lines from an already opened byte source.
    pub fn attach<R>(reader: R, settings: SerialSettings, hub: Arc<ButtonHub>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        hub.set_link_status(LinkStatus::Connected {
            path: settings.path.clone(),
            baud_rate: settings.baud_rate,
        });
        info!(path = %settings.path, baud_rate = settings.baud_rate, "serial link attached");

        let task_hub = hub.clone();
        let path = settings.path.clone();
        let task = tokio::spawn(async move {
            let err = read_buttons(reader, &task_hub).await;
            // The reader (and the port behind it) is dropped at this point.
            warn!(%path, error = %err, "serial link failed; port released");
            task_hub.release_all();
            task_hub.set_link_status(LinkStatus::Failed {
                message: err.to_string(),
            });
        });

        Self {
            settings,
            hub,
            task,
        }
    }

    /// Settings the link was opened with.
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Whether the reader already stopped on its own.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the reader, wait for the port to be closed and reset button state.
    pub async fn release(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        self.hub.release_all();
        self.hub.set_link_status(LinkStatus::Disconnected);
        info!(path = %self.settings.path, "serial link released");
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Feed every framed line to the hub until the stream fails or ends.
async fn read_buttons<R>(reader: R, hub: &ButtonHub) -> SerialError
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedLines::new(reader);
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                hub.ingest_line(&line).await;
            }
            Ok(None) => return SerialError::Closed,
            Err(err) => return SerialError::Read(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::buttons::{DEFAULT_BUTTON_COUNT, DEFAULT_LOG_CAPACITY};
    use tokio::io::AsyncWriteExt;

    fn settings() -> SerialSettings {
        SerialSettings {
            path: "/dev/ttyTEST".into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    fn hub() -> Arc<ButtonHub> {
        Arc::new(ButtonHub::new(DEFAULT_BUTTON_COUNT, DEFAULT_LOG_CAPACITY))
    }

    #[tokio::test]
    async fn split_press_yields_exactly_one_event() {
        let hub = hub();
        let mut board = hub.subscribe();
        let (mut device, port) = tokio::io::duplex(64);
        let _link = SerialLink::attach(port, settings(), hub.clone());

        device.write_all(b"Button 2 PRE").await.unwrap();
        device.write_all(b"SSED\n").await.unwrap();
        board.changed().await.unwrap();

        let current = hub.board();
        assert_eq!(current.states(), &[false, true, false, false, false]);
        assert_eq!(current.last_pressed(), Some(1));
        assert_eq!(hub.diagnostics().await.len(), 1);
    }

    #[tokio::test]
    async fn device_disconnect_fails_link_and_releases_buttons() {
        let hub = hub();
        let mut status = hub.subscribe_link();
        let (mut device, port) = tokio::io::duplex(64);
        let link = SerialLink::attach(port, settings(), hub.clone());
        status.borrow_and_update();

        device.write_all(b"Button 4 PRESSED\n").await.unwrap();
        drop(device);

        status.changed().await.unwrap();
        assert!(matches!(
            &*status.borrow(),
            LinkStatus::Failed { message } if message.contains("closed")
        ));
        assert!(hub.board().states().iter().all(|pressed| !pressed));
        assert_eq!(hub.board().last_pressed(), Some(3));
        assert!(link.is_finished());
    }

    #[tokio::test]
    async fn release_closes_port_and_reports_disconnected() {
        let hub = hub();
        let (mut device, port) = tokio::io::duplex(64);
        let link = SerialLink::attach(port, settings(), hub.clone());
        assert!(matches!(hub.link_status(), LinkStatus::Connected { .. }));

        link.release().await;

        assert_eq!(hub.link_status(), LinkStatus::Disconnected);
        // The reader is gone, so the device side sees a broken pipe.
        assert!(device.write_all(b"Button 1 PRESSED\n").await.is_err());
    }
}
