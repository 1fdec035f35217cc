use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    endpoints::{
        latest_readings_path, PATH_DEVICES, PATH_PUBLISH_INDEX, PATH_READING_WITH_SENSOR_DATA,
    },
    error::ClientError,
    extract::extract_array,
    http::{Request, Response, Transport},
    types::{
        Device, DeviceRegistration, IndexPayload, OutgoingReading, SensorReading, SensorSnapshot,
        SensorValue,
    },
};

/// Remote view of devices and their readings, plus the last good copy of
/// each. Failed fetches never clear what was cached before.
#[derive(Debug)]
pub struct DeviceRepository<T> {
    transport: T,
    devices: Vec<Device>,
    device_id: Option<i64>,
    snapshot: SensorSnapshot,
}

impl<T: Transport> DeviceRepository<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            devices: Vec::new(),
            device_id: None,
            snapshot: SensorSnapshot::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device_at(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    /// Id resolved by the last successful [`Self::find_device_by_mac`].
    pub fn device_id(&self) -> Option<i64> {
        self.device_id
    }

    pub fn registered_device_id(&self) -> Result<i64, ClientError> {
        self.device_id.ok_or(ClientError::DeviceUnset)
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub async fn list_devices(&mut self) -> Result<&[Device], ClientError> {
        match self.fetch_array::<Device>(PATH_DEVICES).await {
            Ok(devices) => {
                debug!("loaded {} devices", devices.len());
                self.devices = devices;
                Ok(&self.devices)
            }
            Err(err) => {
                warn!("failed to load device list: {err}");
                Err(err)
            }
        }
    }

    /// Looks `mac` up in the cached list. Keys compare case-sensitively.
    pub fn find_device_by_mac(&mut self, mac: &str) -> Option<i64> {
        let id = self
            .devices
            .iter()
            .find(|device| device.key == mac)
            .map(|device| device.id)?;
        self.device_id = Some(id);
        Some(id)
    }

    /// Posts a new device entry. Success is not checked here; re-list and
    /// look the MAC up again to learn the assigned id.
    pub async fn register_device(&mut self, mac: &str, name: &str) -> Result<(), ClientError> {
        let payload = serde_json::to_string(&DeviceRegistration { key: mac, name })?;
        let response = self
            .transport
            .send(&Request::post_json(PATH_DEVICES, payload))
            .await?;
        log_unsuccessful("device registration", &response);
        Ok(())
    }

    /// Resolves the id for `mac`, registering the device once when the server
    /// does not know it yet. A device that still cannot be found afterwards
    /// stays unset until the next call.
    pub async fn setup_device(&mut self, mac: &str, name: &str) -> Result<i64, ClientError> {
        self.list_devices().await?;

        if let Some(id) = self.find_device_by_mac(mac) {
            info!("device {mac} already registered with id {id}");
            return Ok(id);
        }

        info!("registering new device {mac}");
        if let Err(err) = self.register_device(mac, name).await {
            warn!("device registration request failed: {err}");
        }

        self.list_devices().await?;
        match self.find_device_by_mac(mac) {
            Some(id) => {
                info!("device {mac} registered with id {id}");
                Ok(id)
            }
            None => {
                warn!("device {mac} not listed after registration");
                Err(ClientError::DeviceUnset)
            }
        }
    }

    /// Fetches the latest readings of `device_id` and folds them into the
    /// cached snapshot. Readings from unknown sensors are dropped.
    pub async fn fetch_latest_reading(
        &mut self,
        device_id: i64,
    ) -> Result<SensorSnapshot, ClientError> {
        let readings = self
            .fetch_array::<SensorReading>(&latest_readings_path(device_id))
            .await
            .inspect_err(|err| warn!("failed to load readings for device {device_id}: {err}"))?;

        for reading in &readings {
            if !self.snapshot.apply(reading) {
                debug!("ignoring reading from unknown sensor {:?}", reading.sensor_name);
            }
        }

        Ok(self.snapshot)
    }

    /// Uploads one reading with all its sensor values in a single request.
    pub async fn submit_reading(
        &mut self,
        device_id: i64,
        readings: &[SensorValue],
    ) -> Result<(), ClientError> {
        let payload = serde_json::to_string(&OutgoingReading::new(device_id, readings))?;
        let response = self
            .transport
            .send(&Request::post_json(PATH_READING_WITH_SENSOR_DATA, payload))
            .await?;
        log_unsuccessful("reading upload", &response);
        Ok(())
    }

    pub async fn publish_index(&mut self, index: usize) -> Result<(), ClientError> {
        let payload = serde_json::to_string(&IndexPayload { index })?;
        let response = self
            .transport
            .send(&Request::post_json(PATH_PUBLISH_INDEX, payload))
            .await?;
        log_unsuccessful("index publish", &response);
        Ok(())
    }

    async fn fetch_array<D: DeserializeOwned>(&mut self, path: &str) -> Result<Vec<D>, ClientError> {
        let response = self.transport.send(&Request::get(path)).await?;
        let json = extract_array(&response.body).ok_or(ClientError::EmptyOrMalformedResponse)?;
        Ok(serde_json::from_str(json)?)
    }
}

fn log_unsuccessful(what: &str, response: &Response) {
    if !response.is_success() {
        warn!("{what} answered with status {:?}", response.status);
    }
}
