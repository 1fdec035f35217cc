pub const PATH_DEVICES: &str = "/api/device";
pub const PATH_LATEST_READINGS: &str = "/api/views/LatestDeviceReadings?device_id=";
pub const PATH_PUBLISH_INDEX: &str = "/api/installation/publish";
pub const PATH_READING_WITH_SENSOR_DATA: &str = "/api/reading-with-sensordata";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const TUNNEL_BYPASS_HEADER: &str = "bypass-tunnel-reminder";

pub const DEFAULT_DEVICE_NAME: &str = "Weather Station";

pub fn latest_readings_path(device_id: i64) -> String {
    format!("{PATH_LATEST_READINGS}{device_id}")
}
