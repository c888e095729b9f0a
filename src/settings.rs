use crate::calc::{self, MAX_HEATER_TEMP};
use crate::CalibData;

/// Temperature in whole degrees Celsius, used for heater targets and the
/// ambient temperature assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Celsius(pub i32);

/// Duration wrapper for type-safety. Stored in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Milliseconds(pub u32);

/// Oversampling settings for Temperature, Pressure, and Humidity.
///
/// Higher oversampling rates increase accuracy (reduce noise) but lead to
/// longer measurement times and higher power consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    /// No measurement performed. Used to disable a specific sensor.
    Skipped = 0,
    /// 1x Oversampling.
    #[default]
    X1 = 1,
    /// 2x Oversampling.
    X2 = 2,
    /// 4x Oversampling.
    X4 = 3,
    /// 8x Oversampling.
    X8 = 4,
    /// 16x Oversampling. Values 6 and 7 also mean x16.
    X16 = 5,
}

impl Oversampling {
    /// Decodes a 3-bit `osrs_x` field.
    pub fn from_u8(value: u8) -> Self {
        match value & 0x07 {
            0 => Oversampling::Skipped,
            1 => Oversampling::X1,
            2 => Oversampling::X2,
            3 => Oversampling::X4,
            4 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }
}

/// Grouped oversampling settings for all three environmental sensors.
///
/// The default is humidity x1, temperature x2, pressure x16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OversamplingConfig {
    /// Temperature oversampling.
    pub temp_osrs: Oversampling,
    /// Humidity oversampling.
    pub hum_osrs: Oversampling,
    /// Pressure oversampling.
    pub pres_osrs: Oversampling,
}

impl Default for OversamplingConfig {
    fn default() -> Self {
        OversamplingConfig {
            temp_osrs: Oversampling::X2,
            hum_osrs: Oversampling::X1,
            pres_osrs: Oversampling::X16,
        }
    }
}

/// Requested gas heater set point, stored in heater slot 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaterProfile {
    /// Target hot plate temperature. Clamped to 0..=400 °C when encoded.
    pub target_temp: Celsius,
    /// Time to hold the temperature before the gas conversion.
    pub duration: Milliseconds,
}

impl Default for HeaterProfile {
    fn default() -> Self {
        HeaterProfile {
            target_temp: Celsius(300),
            duration: Milliseconds(100),
        }
    }
}

/// A heater profile encoded for the sensor registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaterConfig {
    /// Target after clamping, in °C.
    pub target_temp: u16,
    pub duration: Milliseconds,
    /// Value for `gas_wait_0`.
    pub wait_code: u8,
    /// Value for `res_heat_0`.
    pub res_heat_code: u8,
}

impl HeaterConfig {
    /// Encodes `profile` with the given calibration and ambient temperature.
    pub fn new(profile: &HeaterProfile, ambient_temp: Celsius, calib: &CalibData) -> Self {
        let target_temp = profile.target_temp.0.clamp(0, MAX_HEATER_TEMP as i32) as u16;

        HeaterConfig {
            target_temp,
            duration: profile.duration,
            wait_code: calc::gas_wait_code(profile.duration.0),
            res_heat_code: calc::res_heat_code(calib, target_temp, ambient_temp.0),
        }
    }
}

/// Complete sensor configuration used for setup and forced-mode sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Oversampling settings for T, P, H.
    pub osrs_config: OversamplingConfig,
    /// Gas heater set point.
    pub heater: HeaterProfile,
    /// Ambient temperature assumed by the heater resistance formula.
    pub ambient_temp: Celsius,
    /// Wait between the forced-mode trigger and reading the data registers.
    pub settle_time: Milliseconds,
    /// Number of sleep requests before a mode transition is abandoned.
    pub mode_retry_budget: u8,
    /// Pause between two power-mode polls.
    pub poll_interval: Milliseconds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            osrs_config: OversamplingConfig::default(),
            heater: HeaterProfile::default(),
            ambient_temp: Celsius(25),
            settle_time: Milliseconds(50),
            mode_retry_budget: 10,
            poll_interval: Milliseconds(10),
        }
    }
}

/// Builder for [`Config`].
#[derive(Default)]
pub struct Bme688Builder {
    config: Config,
}

impl Bme688Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the temperature oversampling.
    pub fn temp_oversampling(mut self, os: Oversampling) -> Self {
        self.config.osrs_config.temp_osrs = os;
        self
    }

    /// Sets the humidity oversampling.
    pub fn hum_oversampling(mut self, os: Oversampling) -> Self {
        self.config.osrs_config.hum_osrs = os;
        self
    }

    /// Sets the pressure oversampling.
    pub fn pres_oversampling(mut self, os: Oversampling) -> Self {
        self.config.osrs_config.pres_osrs = os;
        self
    }

    /// Sets the heater target and hold time.
    pub fn heater(mut self, target_temp: Celsius, duration: Milliseconds) -> Self {
        self.config.heater = HeaterProfile {
            target_temp,
            duration,
        };
        self
    }

    /// Sets the ambient temperature used by the heater calculation.
    pub fn ambient_temp(mut self, temp: Celsius) -> Self {
        self.config.ambient_temp = temp;
        self
    }

    pub fn settle_time(mut self, time: Milliseconds) -> Self {
        self.config.settle_time = time;
        self
    }

    /// Sets how many sleep requests `trigger_forced_mode` issues before failing.
    pub fn mode_retry_budget(mut self, attempts: u8) -> Self {
        self.config.mode_retry_budget = attempts;
        self
    }

    pub fn poll_interval(mut self, interval: Milliseconds) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Config {
        self.config
    }
}
