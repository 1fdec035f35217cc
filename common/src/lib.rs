pub mod ambience;
pub mod color;
pub mod config;
pub mod cursor;
pub mod endpoints;
pub mod error;
pub mod extract;
pub mod http;
pub mod repository;
pub mod session;
pub mod tls;
pub mod track;
pub mod types;

#[cfg(test)]
mod testing;

pub use ambience::{AmbientEngine, OutputAction, OutputDriver};
pub use color::{temperature_color, Rgb};
pub use config::{ApiConfig, ChannelBinding, DisplayConfig, RuntimeConfig, SensorNodeConfig};
pub use cursor::DeviceCursor;
pub use endpoints::*;
pub use error::{ClientError, ConfigError};
pub use extract::extract_array;
pub use http::{Request, Response, Transport};
pub use repository::DeviceRepository;
pub use session::{DisplaySession, DisplayStatus};
pub use tls::TlsTransport;
pub use track::{select_track, Conditions, Track};
pub use types::{Device, SensorChannel, SensorReading, SensorSnapshot, SensorValue};
