use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    dto::buzzer::{ButtonStateResponse, ButtonsPayload, ConnectRequest, DiagnosticLine},
    error::ServiceError,
    serial::link::{LinkStatus, SerialError, SerialLink, SerialSettings},
    services::sse_events,
    state::{SharedState, buttons::ButtonHub},
};

/// Open the serial link, releasing any previous reader and port first.
pub async fn connect(
    state: &SharedState,
    request: ConnectRequest,
) -> Result<LinkStatus, ServiceError> {
    let defaults = &state.config().buzzers;
    let path = request
        .path
        .or_else(|| defaults.serial_path.clone())
        .ok_or_else(|| ServiceError::InvalidInput("no serial path given or configured".into()))?;
    let settings = SerialSettings {
        path,
        baud_rate: request.baud_rate.unwrap_or(defaults.baud_rate),
    };

    match replace_link(state, |hub| SerialLink::open(settings, hub)).await {
        Ok(status) => Ok(status),
        Err(err) => {
            if let SerialError::Open { .. } = err {
                state.buttons().set_link_status(LinkStatus::Failed {
                    message: err.to_string(),
                });
            }
            warn!(error = %err, "failed to open serial link");
            Err(err.into())
        }
    }
}

/// Install the link built by `open`, releasing the previous reader and port
/// before `open` runs. The slot stays locked throughout.
pub async fn replace_link<F>(state: &SharedState, open: F) -> Result<LinkStatus, SerialError>
where
    F: FnOnce(Arc<ButtonHub>) -> Result<SerialLink, SerialError>,
{
    let mut slot = state.serial().lock().await;
    if let Some(previous) = slot.take() {
        info!(path = %previous.settings().path, "releasing previous serial link before reconnect");
        previous.release().await;
    }

    *slot = Some(open(state.buttons().clone())?);
    Ok(state.buttons().link_status())
}

/// Release the serial link if one is open. Idempotent.
pub async fn disconnect(state: &SharedState) -> LinkStatus {
    let link = state.serial().lock().await.take();
    if let Some(link) = link {
        link.release().await;
    }
    state.buttons().link_status()
}

/// Current button vector and link status.
pub fn button_state(state: &SharedState) -> ButtonStateResponse {
    let board = state.buttons().board();
    ButtonStateResponse {
        buttons: ButtonsPayload::from(&board),
        link: state.buttons().link_status(),
    }
}

/// Raw serial lines, oldest first.
pub async fn diagnostics(state: &SharedState) -> Vec<DiagnosticLine> {
    state
        .buttons()
        .diagnostics()
        .await
        .into_iter()
        .map(DiagnosticLine::from)
        .collect()
}

/// Forward button board, link status and degraded flag changes to the public stream.
pub fn spawn_forwarder(state: SharedState) -> JoinHandle<()> {
    let mut board = state.buttons().subscribe();
    let mut link = state.buttons().subscribe_link();
    let mut degraded = state.degraded_watcher();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = board.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = board.borrow_and_update().clone();
                    sse_events::broadcast_buttons(&state, &current);
                }
                changed = link.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = link.borrow_and_update().clone();
                    sse_events::broadcast_link_status(&state, &current);
                }
                changed = degraded.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *degraded.borrow_and_update();
                    sse_events::broadcast_system_status(&state, current);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};
    use tokio::io::AsyncWriteExt;

    fn settings(path: &str) -> SerialSettings {
        SerialSettings {
            path: path.into(),
            baud_rate: 9_600,
        }
    }

    #[tokio::test]
    async fn connect_without_any_path_is_rejected() {
        let state = AppState::new(AppConfig::default());
        let err = connect(&state, ConnectRequest::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(state.buttons().link_status(), LinkStatus::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_releases_attached_link() {
        let state = AppState::new(AppConfig::default());
        let (device, host) = tokio::io::duplex(64);
        let link = SerialLink::attach(host, settings("/dev/null"), state.buttons().clone());
        *state.serial().lock().await = Some(link);

        assert_eq!(disconnect(&state).await, LinkStatus::Disconnected);
        assert!(state.serial().lock().await.is_none());
        drop(device);
    }

    #[tokio::test]
    async fn reconnect_releases_previous_link_first() {
        let state = AppState::new(AppConfig::default());
        let (mut first_device, first_port) = tokio::io::duplex(64);
        replace_link(&state, |hub| {
            Ok(SerialLink::attach(first_port, settings("/dev/ttyUSB0"), hub))
        })
        .await
        .unwrap();
        state.buttons().ingest_line("Button 1 PRESSED").await;

        let (_second_device, second_port) = tokio::io::duplex(64);
        let status = replace_link(&state, |hub| {
            // The old reader is gone before the new port is touched.
            assert_eq!(hub.link_status(), LinkStatus::Disconnected);
            assert!(hub.board().states().iter().all(|pressed| !pressed));
            Ok(SerialLink::attach(second_port, settings("/dev/ttyUSB1"), hub))
        })
        .await
        .unwrap();

        assert_eq!(
            status,
            LinkStatus::Connected {
                path: "/dev/ttyUSB1".into(),
                baud_rate: 9_600,
            }
        );
        assert!(first_device.write_all(b"Button 2 PRESSED\n").await.is_err());
        let slot = state.serial().lock().await;
        assert_eq!(slot.as_ref().map(|link| link.settings().path.as_str()), Some("/dev/ttyUSB1"));
    }

    #[tokio::test]
    async fn failed_open_after_release_leaves_slot_empty() {
        let state = AppState::new(AppConfig::default());
        let (_device, port) = tokio::io::duplex(64);
        replace_link(&state, |hub| Ok(SerialLink::attach(port, settings("/dev/ttyUSB0"), hub)))
            .await
            .unwrap();

        let err = replace_link(&state, |_| Err(SerialError::Unsupported))
            .await
            .unwrap_err();
        assert!(matches!(err, SerialError::Unsupported));
        assert!(state.serial().lock().await.is_none());
        assert_eq!(state.buttons().link_status(), LinkStatus::Disconnected);
    }

    #[tokio::test]
    async fn button_changes_reach_public_stream() {
        let state = AppState::new(AppConfig::default());
        let mut rx = state.public_sse().subscribe();
        let forwarder = spawn_forwarder(state.clone());

        state.buttons().ingest_line("Button 3 PRESSED").await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("buzzers.state"));
        assert_eq!(
            event.data,
            r#"{"states":[false,false,true,false,false],"last_pressed":2}"#
        );
        forwarder.abort();
    }
}
