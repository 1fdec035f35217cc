use crate::{
    color::{temperature_color, Rgb},
    track::{select_track, Conditions, Track},
    types::SensorSnapshot,
};

pub const VOLUME_MIN: u8 = 0;
pub const VOLUME_MAX: u8 = 30;
pub const VOLUME_INIT: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    SetVolume(u8),
    /// Loop a track until another one is requested.
    PlayLoop(Track),
    /// Paint every LED of the strip with one colour.
    Fill(Rgb),
}

/// Executes output actions against the audio player and LED strip.
pub trait OutputDriver {
    fn apply(&mut self, action: OutputAction);
}

/// Tracks what the audio player and strip are currently doing and turns new
/// sensor data into the actions needed to bring them up to date.
#[derive(Debug, Clone)]
pub struct AmbientEngine {
    volume: u8,
    current_track: Option<Track>,
    current_color: Option<Rgb>,
}

impl Default for AmbientEngine {
    fn default() -> Self {
        Self::new(VOLUME_INIT)
    }
}

impl AmbientEngine {
    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.clamp(VOLUME_MIN, VOLUME_MAX),
            current_track: None,
            current_color: None,
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn current_track(&self) -> Option<Track> {
        self.current_track
    }

    pub fn current_color(&self) -> Option<Rgb> {
        self.current_color
    }

    /// Action pushing the held volume to the player, used once at start-up.
    pub fn init(&self) -> Vec<OutputAction> {
        vec![OutputAction::SetVolume(self.volume)]
    }

    pub fn set_volume(&mut self, volume: u8) -> Vec<OutputAction> {
        self.volume = volume.clamp(VOLUME_MIN, VOLUME_MAX);
        vec![OutputAction::SetVolume(self.volume)]
    }

    pub fn volume_up(&mut self) -> Vec<OutputAction> {
        if self.volume >= VOLUME_MAX {
            return Vec::new();
        }
        self.set_volume(self.volume + 1)
    }

    pub fn volume_down(&mut self) -> Vec<OutputAction> {
        if self.volume == VOLUME_MIN {
            return Vec::new();
        }
        self.set_volume(self.volume - 1)
    }

    /// Starts `track` unless it is already looping.
    pub fn play(&mut self, track: Track) -> Vec<OutputAction> {
        if self.current_track == Some(track) {
            return Vec::new();
        }
        self.current_track = Some(track);
        vec![OutputAction::PlayLoop(track)]
    }

    pub fn play_for(&mut self, conditions: &Conditions) -> Vec<OutputAction> {
        self.play(select_track(conditions))
    }

    pub fn show_color(&mut self, temp: f32) -> Vec<OutputAction> {
        let color = temperature_color(temp);
        self.current_color = Some(color);
        vec![OutputAction::Fill(color)]
    }

    /// Track selection followed by the strip colour for a fresh snapshot.
    pub fn update(&mut self, snapshot: &SensorSnapshot) -> Vec<OutputAction> {
        let mut actions = self.play_for(&Conditions::from(snapshot));
        actions.append(&mut self.show_color(snapshot.temp_dht));
        actions
    }
}
