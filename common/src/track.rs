use serde::Serialize;

use crate::types::SensorSnapshot;

const RAIN_THRESHOLD: f32 = 500.0;
const TEMP_VERY_COLD: f32 = 5.0;
const TEMP_WARM_MIN: f32 = 20.0;
const TEMP_MILD_DAY: f32 = 25.0;
const TEMP_HOT_MIN: f32 = 28.0;
const PRESSURE_LOW: f32 = 1000.0;
const PRESSURE_MILD: f32 = 1015.0;
const LUX_NIGHT_MAX: f32 = 50.0;
const LUX_SUNSET_MAX: f32 = 200.0;
const LUX_DAY_MIN: f32 = 400.0;
const LUX_DAY_MAX: f32 = 1000.0;
const HUMIDITY_HIGH: f32 = 80.0;

/// Ambient loops, numbered as they are stored on the player's SD card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Track {
    Rainstorm = 1,
    BlizzardWind = 2,
    ColdWinterDay = 3,
    ColdSunsetWind = 4,
    MildStormWind = 5,
    SpringMorningBirds = 6,
    MildDayBreeze = 7,
    SpringEveningChill = 8,
    CalmNightCrickets = 9,
    HumidStormBuild = 10,
    WarmMorningBirds = 11,
    SummerCicadas = 12,
    SummerNightCrickets = 13,
}

impl Track {
    pub const DEFAULT: Track = Track::SpringMorningBirds;

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rainstorm => "rainstorm",
            Self::BlizzardWind => "blizzard wind",
            Self::ColdWinterDay => "cold winter day",
            Self::ColdSunsetWind => "cold sunset wind",
            Self::MildStormWind => "mild storm wind",
            Self::SpringMorningBirds => "spring morning birds",
            Self::MildDayBreeze => "mild day breeze",
            Self::SpringEveningChill => "spring evening chill",
            Self::CalmNightCrickets => "calm night crickets",
            Self::HumidStormBuild => "humid storm build",
            Self::WarmMorningBirds => "warm morning birds",
            Self::SummerCicadas => "summer cicadas",
            Self::SummerNightCrickets => "summer night crickets",
        }
    }
}

/// Inputs of the track table: temperature in °C, relative humidity in %,
/// illuminance in lux, raw analog water level and pressure in hPa.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Conditions {
    pub temp: f32,
    pub humidity: f32,
    pub lux: f32,
    pub water: f32,
    pub pressure: f32,
}

impl From<&SensorSnapshot> for Conditions {
    fn from(snapshot: &SensorSnapshot) -> Self {
        Self {
            temp: snapshot.temp_dht,
            humidity: snapshot.hum_dht,
            lux: snapshot.lux,
            water: snapshot.water,
            pressure: snapshot.pressure,
        }
    }
}

/// Picks the ambient loop for the given conditions. Rules are checked in a
/// fixed priority order and the first match wins; anything unmatched
/// (including NaN inputs) falls through to [`Track::DEFAULT`].
pub fn select_track(c: &Conditions) -> Track {
    let Conditions {
        temp,
        humidity,
        lux,
        water,
        pressure,
    } = *c;

    if water > RAIN_THRESHOLD {
        Track::Rainstorm
    } else if temp < TEMP_VERY_COLD && pressure < PRESSURE_LOW {
        Track::BlizzardWind
    } else if temp < TEMP_VERY_COLD && pressure >= PRESSURE_LOW && lux <= LUX_SUNSET_MAX {
        Track::ColdSunsetWind
    } else if temp < TEMP_VERY_COLD && pressure >= PRESSURE_LOW {
        Track::ColdWinterDay
    } else if temp <= TEMP_WARM_MIN && lux < LUX_NIGHT_MAX {
        Track::CalmNightCrickets
    } else if temp < TEMP_WARM_MIN && pressure < PRESSURE_LOW {
        Track::MildStormWind
    } else if temp < TEMP_WARM_MIN && pressure >= PRESSURE_LOW && lux > LUX_DAY_MIN {
        Track::SpringMorningBirds
    } else if temp < TEMP_WARM_MIN && (LUX_NIGHT_MAX..LUX_SUNSET_MAX).contains(&lux) {
        Track::SpringEveningChill
    } else if temp < TEMP_MILD_DAY && pressure <= PRESSURE_MILD && humidity < HUMIDITY_HIGH {
        Track::MildDayBreeze
    } else if temp < TEMP_HOT_MIN && pressure < PRESSURE_LOW && humidity > HUMIDITY_HIGH {
        Track::HumidStormBuild
    } else if (TEMP_WARM_MIN..TEMP_HOT_MIN).contains(&temp)
        && (LUX_SUNSET_MAX..LUX_DAY_MAX).contains(&lux)
    {
        Track::WarmMorningBirds
    } else if temp >= TEMP_HOT_MIN && lux > LUX_DAY_MAX {
        Track::SummerCicadas
    } else if temp >= TEMP_HOT_MIN && lux < LUX_SUNSET_MAX {
        Track::SummerNightCrickets
    } else {
        Track::DEFAULT
    }
}
