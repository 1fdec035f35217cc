use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_name: String,
    #[serde(deserialize_with = "lenient_f32")]
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    TempDht,
    HumDht,
    Lux,
    Water,
    TempBmp,
    Pressure,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 6] = [
        Self::TempDht,
        Self::HumDht,
        Self::Lux,
        Self::Water,
        Self::TempBmp,
        Self::Pressure,
    ];

    /// Name the API reports for this channel in `LatestDeviceReadings`.
    pub fn sensor_name(self) -> &'static str {
        match self {
            Self::TempDht => "DHT11 Temperature Sensor",
            Self::HumDht => "DHT11 Humidity Sensor",
            Self::Lux => "BH1750 Light Sensor",
            Self::Water => "Analog Water Sensor",
            Self::TempBmp => "BMP180 Temperature Sensor",
            Self::Pressure => "BMP180 Pressure Sensor",
        }
    }

    pub fn from_sensor_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.sensor_name() == name)
    }
}

/// Latest known value per channel. Fields stay at 0 until first observed and
/// keep their previous value when a poll omits them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorSnapshot {
    #[serde(rename = "tempDHT")]
    pub temp_dht: f32,
    #[serde(rename = "humDHT")]
    pub hum_dht: f32,
    pub lux: f32,
    pub water: f32,
    #[serde(rename = "tempBMP")]
    pub temp_bmp: f32,
    pub pressure: f32,
}

impl SensorSnapshot {
    /// Folds one reading in. Returns false for names outside the known channels.
    pub fn apply(&mut self, reading: &SensorReading) -> bool {
        let Some(channel) = SensorChannel::from_sensor_name(&reading.sensor_name) else {
            return false;
        };
        self.set(channel, reading.value);
        true
    }

    pub fn set(&mut self, channel: SensorChannel, value: f32) {
        match channel {
            SensorChannel::TempDht => self.temp_dht = value,
            SensorChannel::HumDht => self.hum_dht = value,
            SensorChannel::Lux => self.lux = value,
            SensorChannel::Water => self.water = value,
            SensorChannel::TempBmp => self.temp_bmp = value,
            SensorChannel::Pressure => self.pressure = value,
        }
    }

    pub fn get(&self, channel: SensorChannel) -> f32 {
        match channel {
            SensorChannel::TempDht => self.temp_dht,
            SensorChannel::HumDht => self.hum_dht,
            SensorChannel::Lux => self.lux,
            SensorChannel::Water => self.water,
            SensorChannel::TempBmp => self.temp_bmp,
            SensorChannel::Pressure => self.pressure,
        }
    }
}

/// One measured value headed for the API, keyed by the server-side sensor id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorValue {
    pub sensor_id: i64,
    pub value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingReading {
    pub device_id: i64,
    pub sensor_data: Vec<SensorDataEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDataEntry {
    pub sensor_id: i64,
    pub value: String,
}

impl OutgoingReading {
    pub fn new(device_id: i64, readings: &[SensorValue]) -> Self {
        Self {
            device_id,
            sensor_data: readings
                .iter()
                .map(|reading| SensorDataEntry {
                    sensor_id: reading.sensor_id,
                    value: format!("{:.2}", reading.value),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceRegistration<'a> {
    pub key: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPayload {
    pub index: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::<i64>::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::<f64>::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value as f32),
        NumberOrText::Text(text) => text
            .trim()
            .parse::<f32>()
            .map_err(serde::de::Error::custom),
    }
}
