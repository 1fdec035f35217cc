use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use ambience_common::{
    ChannelBinding, DeviceRepository, RuntimeConfig, SensorChannel, SensorValue, TlsTransport,
};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RuntimeConfig::load_from_env_path()
        .await
        .unwrap_or_else(|err| {
            warn!("failed to load runtime config: {err}");
            RuntimeConfig::defaults_from_env()
        });

    let transport = TlsTransport::new(&config.api).context("failed to set up api transport")?;
    let mut repository = DeviceRepository::new(transport);

    let sensor = config.sensor;
    if let Err(err) = repository.setup_device(&sensor.mac, &sensor.device_name).await {
        warn!("device setup for {} failed: {err}", sensor.mac);
    }

    info!(
        "sensor reporter started for {} every {} ms",
        sensor.mac, sensor.report_interval_ms
    );

    let mut tick: u64 = 0;
    let mut interval = tokio::time::interval(Duration::from_millis(sensor.report_interval_ms));

    loop {
        interval.tick().await;
        tick = tick.saturating_add(1);

        let device_id = match repository.registered_device_id() {
            Ok(id) => id,
            Err(err) => {
                warn!("skipping upload: {err}");
                continue;
            }
        };

        let values = sample(&sensor.channels, tick);
        match repository.submit_reading(device_id, &values).await {
            Ok(()) => info!("uploaded {} values for device {device_id}", values.len()),
            Err(err) => warn!("reading upload failed: {err}"),
        }
    }
}

fn sample(channels: &[ChannelBinding], tick: u64) -> Vec<SensorValue> {
    channels
        .iter()
        .map(|binding| SensorValue {
            sensor_id: binding.sensor_id,
            value: simulated_value(binding.channel, tick),
        })
        .collect()
}

// Hardware integration point: DHT11, BH1750, BMP180 and the analog water
// probe replace these on the board build.
fn simulated_value(channel: SensorChannel, tick: u64) -> f32 {
    let step = |period: u64| (tick % period) as f32;
    match channel {
        SensorChannel::TempDht => 17.0 + step(8) * 0.5,
        SensorChannel::HumDht => 45.0 + step(6) * 1.5,
        SensorChannel::Lux => 250.0 + step(10) * 40.0,
        SensorChannel::Water => step(5) * 30.0,
        SensorChannel::TempBmp => 17.3 + step(8) * 0.5,
        SensorChannel::Pressure => 1008.0 + step(7) * 0.8,
    }
}
