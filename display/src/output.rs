use std::path::Path;

use anyhow::bail;
use tracing::info;

use ambience_common::{DisplayConfig, OutputAction, OutputDriver, Rgb, Track};

/// Host stand-in for the MP3 player and the LED strip. Remembers what each
/// would be doing and logs every change.
#[derive(Debug)]
pub struct LoggedOutput {
    led_count: usize,
    brightness: u8,
    volume: Option<u8>,
    track: Option<Track>,
    strip: Option<Rgb>,
}

impl LoggedOutput {
    /// Fails when a configured audio device is not present.
    pub fn open(config: &DisplayConfig) -> anyhow::Result<Self> {
        match config.audio_device.as_deref() {
            Some(device) if !Path::new(device).exists() => {
                bail!("audio player not found at {device}");
            }
            Some(device) => info!("audio player on {device}"),
            None => info!("no audio device configured; playback is logged only"),
        }
        info!(
            "output ready: {} leds at brightness {}",
            config.led_count, config.brightness
        );
        Ok(Self {
            led_count: config.led_count,
            brightness: config.brightness,
            volume: None,
            track: None,
            strip: None,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> (Option<u8>, Option<Track>, Option<Rgb>) {
        (self.volume, self.track, self.strip)
    }
}

impl OutputDriver for LoggedOutput {
    fn apply(&mut self, action: OutputAction) {
        match action {
            OutputAction::SetVolume(volume) => {
                self.volume = Some(volume);
                info!("player volume {volume}");
            }
            OutputAction::PlayLoop(track) => {
                self.track = Some(track);
                info!("looping track {} ({})", track.number(), track.as_str());
            }
            OutputAction::Fill(color) => {
                self.strip = Some(color);
                info!(
                    "strip {} leds #{:02x}{:02x}{:02x} at brightness {}",
                    self.led_count, color.r, color.g, color.b, self.brightness
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn keeps_last_applied_state() {
        let mut output = LoggedOutput::open(&DisplayConfig::default()).unwrap();

        output.apply(OutputAction::SetVolume(12));
        output.apply(OutputAction::PlayLoop(Track::SummerCicadas));
        output.apply(OutputAction::Fill(Rgb::new(1, 2, 3)));
        output.apply(OutputAction::Fill(Rgb::new(4, 5, 6)));

        assert_eq!(
            output.state(),
            (
                Some(12),
                Some(Track::SummerCicadas),
                Some(Rgb::new(4, 5, 6))
            )
        );
    }

    #[test]
    fn missing_audio_device_fails_to_open() {
        let config = DisplayConfig {
            audio_device: Some("/dev/ambience-no-such-player".to_string()),
            ..DisplayConfig::default()
        };

        let err = LoggedOutput::open(&config).unwrap_err();
        assert!(err.to_string().contains("/dev/ambience-no-such-player"));
    }

    #[test]
    fn present_audio_device_opens() {
        let config = DisplayConfig {
            audio_device: Some(env!("CARGO_MANIFEST_DIR").to_string()),
            ..DisplayConfig::default()
        };

        assert!(LoggedOutput::open(&config).is_ok());
    }
}
