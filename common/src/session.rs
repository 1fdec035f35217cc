use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    ambience::{AmbientEngine, OutputAction, OutputDriver},
    color::Rgb,
    cursor::DeviceCursor,
    error::ClientError,
    http::Transport,
    repository::DeviceRepository,
    types::{Device, SensorSnapshot},
};

#[derive(Debug, Clone, Serialize)]
pub struct DisplayStatus {
    pub index: usize,
    #[serde(rename = "deviceCount")]
    pub device_count: usize,
    pub device: Option<Device>,
    pub snapshot: SensorSnapshot,
    pub track: Option<&'static str>,
    #[serde(rename = "trackNumber")]
    pub track_number: Option<u8>,
    pub volume: u8,
    pub color: Option<Rgb>,
    #[serde(rename = "lastUpdatedEpoch")]
    pub last_updated_epoch: Option<i64>,
}

/// Everything the display node knows: the remote device list, which device
/// is on show, and what the speaker and strip are doing about it.
///
/// Every step that talks to the server runs fetch, render, publish in that
/// order and only once per call.
#[derive(Debug)]
pub struct DisplaySession<T> {
    repository: DeviceRepository<T>,
    cursor: DeviceCursor,
    ambience: AmbientEngine,
    last_updated: Option<DateTime<Utc>>,
}

impl<T: Transport> DisplaySession<T> {
    pub fn new(transport: T, initial_volume: u8) -> Self {
        Self {
            repository: DeviceRepository::new(transport),
            cursor: DeviceCursor::default(),
            ambience: AmbientEngine::new(initial_volume),
            last_updated: None,
        }
    }

    pub fn repository(&self) -> &DeviceRepository<T> {
        &self.repository
    }

    pub fn index(&self) -> usize {
        self.cursor.index()
    }

    pub fn device_count(&self) -> usize {
        self.cursor.count()
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        self.repository.snapshot()
    }

    pub fn volume(&self) -> u8 {
        self.ambience.volume()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn status(&self) -> DisplayStatus {
        let track = self.ambience.current_track();
        DisplayStatus {
            index: self.cursor.index(),
            device_count: self.cursor.count(),
            device: self.repository.device_at(self.cursor.index()).cloned(),
            snapshot: *self.repository.snapshot(),
            track: track.map(|track| track.as_str()),
            track_number: track.map(|track| track.number()),
            volume: self.ambience.volume(),
            color: self.ambience.current_color(),
            last_updated_epoch: self.last_updated.map(|at| at.timestamp()),
        }
    }

    pub async fn start<D: OutputDriver>(&mut self, driver: &mut D) -> Result<(), ClientError> {
        apply_all(driver, self.ambience.init());
        self.refresh(driver).await
    }

    /// Re-lists devices and shows the one under the cursor. A failed listing
    /// keeps the previous list.
    pub async fn refresh<D: OutputDriver>(&mut self, driver: &mut D) -> Result<(), ClientError> {
        if let Err(err) = self.repository.list_devices().await {
            debug!("keeping {} cached devices after: {err}", self.repository.devices().len());
        }
        self.cursor.set_count(self.repository.devices().len());
        self.show_current(driver).await
    }

    pub async fn show_current<D: OutputDriver>(
        &mut self,
        driver: &mut D,
    ) -> Result<(), ClientError> {
        let index = self.cursor.index();
        let device_id = self
            .repository
            .device_at(index)
            .map(|device| device.id)
            .ok_or(ClientError::DeviceUnset)?;

        let snapshot = self.repository.fetch_latest_reading(device_id).await?;
        apply_all(driver, self.ambience.update(&snapshot));
        self.last_updated = Some(Utc::now());
        info!("showing device {device_id} at index {index}");

        if let Err(err) = self.repository.publish_index(index).await {
            warn!("failed to publish index {index}: {err}");
        }
        Ok(())
    }

    pub async fn next<D: OutputDriver>(&mut self, driver: &mut D) -> Result<(), ClientError> {
        if self.cursor.next().is_none() {
            return Err(ClientError::DeviceUnset);
        }
        self.show_current(driver).await
    }

    pub async fn previous<D: OutputDriver>(&mut self, driver: &mut D) -> Result<(), ClientError> {
        if self.cursor.previous().is_none() {
            return Err(ClientError::DeviceUnset);
        }
        self.show_current(driver).await
    }

    pub fn volume_up<D: OutputDriver>(&mut self, driver: &mut D) -> u8 {
        apply_all(driver, self.ambience.volume_up());
        self.ambience.volume()
    }

    pub fn volume_down<D: OutputDriver>(&mut self, driver: &mut D) -> u8 {
        apply_all(driver, self.ambience.volume_down());
        self.ambience.volume()
    }
}

fn apply_all<D: OutputDriver>(driver: &mut D, actions: Vec<OutputAction>) {
    for action in actions {
        driver.apply(action);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{testing::ScriptedTransport, track::Track};

    const DEVICES: &str = r#"[{"id":4,"key":"AA"},{"id":7,"key":"BB"},{"id":9,"key":"CC"}]"#;
    const WARM_EVENING: &str = r#"[{"sensor_name":"DHT11 Temperature Sensor","value":"18.00"},
        {"sensor_name":"BH1750 Light Sensor","value":"10.00"}]"#;

    #[derive(Default)]
    struct Recorder(Vec<OutputAction>);

    impl OutputDriver for Recorder {
        fn apply(&mut self, action: OutputAction) {
            self.0.push(action);
        }
    }

    #[tokio::test]
    async fn start_fetches_renders_then_publishes() {
        let transport = ScriptedTransport::new()
            .reply(DEVICES)
            .reply(WARM_EVENING)
            .reply("");
        let mut session = DisplaySession::new(transport, 20);
        let mut driver = Recorder::default();

        session.start(&mut driver).await.unwrap();

        assert_eq!(
            driver.0,
            vec![
                OutputAction::SetVolume(20),
                OutputAction::PlayLoop(Track::CalmNightCrickets),
                OutputAction::Fill(crate::color::COLOR_WARM_MIN),
            ]
        );
        assert_eq!(
            session.repository().transport().paths(),
            vec![
                "/api/device",
                "/api/views/LatestDeviceReadings?device_id=4",
                "/api/installation/publish",
            ]
        );
        assert_eq!(session.device_count(), 3);
        assert!(session.last_updated().is_some());
    }

    #[tokio::test]
    async fn next_and_previous_wrap_and_publish_new_index() {
        let transport = ScriptedTransport::new()
            .reply(DEVICES)
            .reply(WARM_EVENING)
            .reply("")
            .reply(WARM_EVENING)
            .reply("")
            .reply(WARM_EVENING)
            .reply("")
            .reply(WARM_EVENING)
            .reply("");
        let mut session = DisplaySession::new(transport, 20);
        let mut driver = Recorder::default();
        session.start(&mut driver).await.unwrap();

        session.next(&mut driver).await.unwrap();
        assert_eq!(session.index(), 1);
        session.previous(&mut driver).await.unwrap();
        session.previous(&mut driver).await.unwrap();
        assert_eq!(session.index(), 2);

        let requests = &session.repository().transport().requests;
        assert_eq!(requests[3].path, "/api/views/LatestDeviceReadings?device_id=7");
        assert_eq!(
            requests.last().and_then(|request| request.body.as_ref()).map(|body| body.payload.as_str()),
            Some(r#"{"index":2}"#)
        );
    }

    #[tokio::test]
    async fn same_track_is_not_restarted() {
        let transport = ScriptedTransport::new()
            .reply(DEVICES)
            .reply(WARM_EVENING)
            .reply("")
            .reply(DEVICES)
            .reply(WARM_EVENING)
            .reply("");
        let mut session = DisplaySession::new(transport, 20);
        let mut driver = Recorder::default();
        session.start(&mut driver).await.unwrap();

        session.refresh(&mut driver).await.unwrap();

        let plays = driver
            .0
            .iter()
            .filter(|action| matches!(action, OutputAction::PlayLoop(_)))
            .count();
        assert_eq!(plays, 1);
    }

    #[tokio::test]
    async fn empty_list_reports_unset_device() {
        let mut session = DisplaySession::new(ScriptedTransport::new().reply("[]"), 20);
        let mut driver = Recorder::default();

        assert!(matches!(
            session.start(&mut driver).await,
            Err(ClientError::DeviceUnset)
        ));
        assert!(matches!(
            session.next(&mut driver).await,
            Err(ClientError::DeviceUnset)
        ));
        assert_eq!(session.repository().transport().requests.len(), 1);
        assert_eq!(driver.0, vec![OutputAction::SetVolume(20)]);
    }

    #[tokio::test]
    async fn failed_listing_keeps_showing_cached_devices() {
        let transport = ScriptedTransport::new()
            .reply(DEVICES)
            .reply(WARM_EVENING)
            .reply("")
            .fail()
            .reply(WARM_EVENING)
            .reply("");
        let mut session = DisplaySession::new(transport, 20);
        let mut driver = Recorder::default();
        session.start(&mut driver).await.unwrap();

        session.refresh(&mut driver).await.unwrap();

        assert_eq!(session.device_count(), 3);
        assert_eq!(session.repository().transport().requests.len(), 6);
    }

    #[tokio::test]
    async fn failed_fetch_skips_render_and_publish() {
        let transport = ScriptedTransport::new().reply(DEVICES).fail();
        let mut session = DisplaySession::new(transport, 20);
        let mut driver = Recorder::default();

        assert!(session.start(&mut driver).await.is_err());

        assert_eq!(driver.0, vec![OutputAction::SetVolume(20)]);
        assert_eq!(session.repository().transport().requests.len(), 2);
        assert_eq!(session.last_updated(), None);
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_step() {
        let transport = ScriptedTransport::new()
            .reply(DEVICES)
            .reply(WARM_EVENING)
            .fail();
        let mut session = DisplaySession::new(transport, 20);
        let mut driver = Recorder::default();

        session.start(&mut driver).await.unwrap();

        assert_eq!(session.status().track, Some("calm night crickets"));
    }

    #[tokio::test]
    async fn volume_buttons_stop_at_bounds() {
        let mut session = DisplaySession::new(ScriptedTransport::new(), 29);
        let mut driver = Recorder::default();

        assert_eq!(session.volume_up(&mut driver), 30);
        assert_eq!(session.volume_up(&mut driver), 30);
        assert_eq!(session.volume_down(&mut driver), 29);
        assert_eq!(
            driver.0,
            vec![OutputAction::SetVolume(30), OutputAction::SetVolume(29)]
        );
        assert!(session.repository().transport().requests.is_empty());
    }

    #[test]
    fn status_serializes_with_camel_case_keys() {
        let session = DisplaySession::new(ScriptedTransport::new(), 20);

        let value = serde_json::to_value(session.status()).unwrap();

        assert_eq!(value["deviceCount"], 0);
        assert_eq!(value["volume"], 20);
        assert_eq!(value["snapshot"]["tempDHT"], 0.0);
        assert!(value["track"].is_null());
    }
}
