#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

//! # BME688 Forced-Mode Driver
//!
//! A type-safe, `no_std` driver for the Bosch BME688 plus the windowed
//! acquisition loop and serial command surface built on top of it.
//! The driver uses the typestate pattern so that calibration is always loaded
//! before anything is compensated.
//!
//! ## Features
//! - **Forced Mode**: every measurement is an explicit sleep → forced cycle
//!   with a bounded mode-transition poll.
//! - **Fixed-Point Arithmetic**: bit-exact vendor compensation with 64-bit
//!   intermediates. No FPU required for the driver itself.
//! - **Windowed RMS**: [`acquisition`] streams each sample and the RMS of the
//!   window over any byte [`Transport`](acquisition::Transport).
//! - **Typestate Pattern**: prevents measuring before initialization.
//!
//! ## Units
//! - **Temperature**: Centigrade (C * 100) -> 2350 = 23.50 °C
//! - **Humidity**: Milli-percent (RH % * 1000) -> 45123 = 45.123 %
//! - **Pressure**: Pascal (Pa) -> 101325 = 1013.25 hPa
//!
//! ## Logging
//! Enable the `defmt` feature to get diagnostics through `defmt`.

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod calc;
mod calib;
pub mod command;
pub mod error;
pub mod regs;
mod settings;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

use core::marker::PhantomData;
use embedded_hal::{delay::DelayNs, i2c};

pub use calib::CalibData;
pub use error::Bme688Error;
pub use settings::{
    Bme688Builder, Celsius, Config, HeaterConfig, HeaterProfile, Milliseconds, Oversampling,
    OversamplingConfig,
};

// --- Typestates ---

/// Sensor has been created but not yet initialized with calibration data.
#[derive(Debug)]
pub struct Uninitialized;
/// Sensor is initialized, calibrated, and ready for measurements.
#[derive(Debug)]
pub struct Ready;

/// Power mode bits `mode<1:0>` of `ctrl_meas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerMode {
    Sleep = 0b00,
    Forced = 0b01,
    Parallel = 0b10,
    Sequential = 0b11,
}

impl PowerMode {
    fn from_bits(bits: u8) -> Self {
        match bits & regs::MODE_MASK {
            0b00 => PowerMode::Sleep,
            0b01 => PowerMode::Forced,
            0b10 => PowerMode::Parallel,
            _ => PowerMode::Sequential,
        }
    }
}

/// Raw ADC output read directly from the field 0 data registers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// 20-bit temperature reading.
    pub temp_adc: u32,
    /// 20-bit pressure reading.
    pub press_adc: u32,
    /// 16-bit humidity reading.
    pub hum_adc: u16,
}

impl RawSample {
    /// Reconstructs the ADC values from the burst starting at `press_msb`.
    pub fn from_registers(buffer: &[u8; regs::LEN_FIELD_0]) -> Self {
        let press_adc =
            ((buffer[2] as u32) >> 4) | ((buffer[1] as u32) << 4) | ((buffer[0] as u32) << 12);
        let temp_adc =
            ((buffer[5] as u32) >> 4) | ((buffer[4] as u32) << 4) | ((buffer[3] as u32) << 12);
        let hum_adc = ((buffer[6] as u16) << 8) | buffer[7] as u16;

        RawSample {
            temp_adc,
            press_adc,
            hum_adc,
        }
    }
}

/// Represents temperature in Centigrade (degrees Celsius * 100).
///
/// # Example
/// A value of `2350` represents **23.50 °C**.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(pub i32);

impl Temperature {
    /// Splits the fixed-point value into integral (degrees) and fractional (decimals) parts.
    ///
    /// # Example
    /// ```rust
    /// use bme688_driver::Temperature;
    /// let temp = Temperature(2350);
    /// assert_eq!(temp.split(), (23, 50)); // Represents 23.50 °C
    /// ```
    pub fn split(&self) -> (i32, i32) {
        (self.0 / 100, self.0 % 100)
    }

    /// Degrees Celsius as a float.
    pub fn degrees(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Represents relative humidity in milli-percent (percent * 1000).
///
/// # Example
/// A value of `45123` represents **45.123 %rH**.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Humidity(pub i32);

impl Humidity {
    /// Splits the fixed-point value into integral and fractional parts.
    ///
    /// # Example
    /// ```rust
    /// use bme688_driver::Humidity;
    /// let hum = Humidity(45123);
    /// assert_eq!(hum.split(), (45, 123)); // Represents 45.123 %
    /// ```
    pub fn split(&self) -> (i32, i32) {
        (self.0 / 1000, self.0 % 1000)
    }
}

/// Represents atmospheric pressure in Pascal (Pa).
///
/// # Example
/// A value of `101325` represents **101325 Pa** (or 1013.25 hPa).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pressure(pub u32);

impl Pressure {
    /// Converts the raw Pascal value to Hectopascal (hPa) and splits it into parts.
    ///
    /// # Example
    /// ```rust
    /// use bme688_driver::Pressure;
    /// let press = Pressure(101325);
    /// assert_eq!(press.as_hpa(), (1013, 25)); // Represents 1013.25 hPa
    /// ```
    pub fn as_hpa(&self) -> (u32, u32) {
        (self.0 / 100, self.0 % 100)
    }

    /// Hectopascal as a float.
    pub fn hectopascal(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Compensated measurement result in physical units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompensatedSample {
    pub temp: Temperature,
    pub pres: Pressure,
    pub hum: Humidity,
    /// Fine temperature the pressure result was derived from.
    pub t_fine: i32,
}

/// Snapshot of the measurement configuration held by the sensor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSettings {
    pub osrs_config: OversamplingConfig,
    pub gas_wait_0: u8,
    pub res_heat_0: u8,
    pub run_gas: bool,
    pub nb_conv: u8,
    pub mode: PowerMode,
}

impl SensorSettings {
    /// `true` if the sensor holds exactly this oversampling and heater slot 0,
    /// with gas conversion 0 enabled.
    pub fn matches(&self, heater: &HeaterConfig, osrs: &OversamplingConfig) -> bool {
        self.osrs_config == *osrs
            && self.gas_wait_0 == heater.wait_code
            && self.res_heat_0 == heater.res_heat_code
            && self.run_gas
            && self.nb_conv == 0
    }
}

/// The main BME688 driver structure.
///
/// Use `Bme688::new(...)` to start. The `STATE` generic uses the Typestate pattern
/// to track initialization status at compile time.
#[derive(Debug)]
pub struct Bme688<I2C, STATE> {
    i2c: I2C,
    address: u8,
    pub(crate) calib_data: CalibData,
    config: Config,
    _state: PhantomData<STATE>,
}

impl<I2C, E> Bme688<I2C, Uninitialized>
where
    I2C: i2c::I2c<Error = E>,
    E: i2c::Error,
{
    /// Creates a new driver instance in the `Uninitialized` state.
    ///
    /// This does not communicate with the sensor yet.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus object.
    /// * `address` - The I2C address of the sensor (typically [`regs::DEFAULT_ADDRESS`]).
    /// * `config` - Applied by [`Bme688::configure`] once the driver is `Ready`.
    pub fn new(i2c: I2C, address: u8, config: Config) -> Self {
        Bme688 {
            i2c,
            address,
            calib_data: CalibData::default(),
            config,
            _state: PhantomData,
        }
    }

    /// Initializes the sensor: performs a soft-reset, checks the chip ID and
    /// loads factory calibration data.
    ///
    /// This transitions the driver state from `Uninitialized` to `Ready`.
    ///
    /// # Errors
    /// - [`Bme688Error::ChipIdMismatch`] if the device is not a BME688.
    /// - [`Bme688Error::CalibrationUnavailable`] if the calibration read fails.
    /// - A bus error if the reset or ID read fails.
    pub fn init(mut self, delay: &mut impl DelayNs) -> error::Result<Bme688<I2C, Ready>, E> {
        // Sensor requires time to start up before reset
        delay.delay_ms(2);

        self.reset(delay)?;

        let chip_id = self.read_reg_byte(regs::ADDR_CHIP_ID)?;
        if chip_id != regs::CHIP_ID {
            error!("unexpected chip id {=u8:#x}", chip_id);
            return Err(Bme688Error::ChipIdMismatch(chip_id));
        }

        let calib_data = self
            .get_calib_data()
            .map_err(Bme688Error::into_calibration)?;
        debug!("calibration loaded");

        Ok(Bme688 {
            i2c: self.i2c,
            address: self.address,
            calib_data,
            config: self.config,
            _state: PhantomData,
        })
    }

    /// Reads factory-fused calibration coefficients from the sensor's NVM.
    ///
    /// The BME688 stores calibration data in three non-contiguous memory blocks.
    fn get_calib_data(&mut self) -> error::Result<CalibData, E> {
        use crate::regs::calib::*;

        let mut buffer = [0u8; LEN_TOTAL];
        let (first, rest) = buffer.split_at_mut(LEN_COEFF_1);
        let (second, third) = rest.split_at_mut(LEN_COEFF_2);

        self.read_into(ADDR_COEFF_1, first)?;
        self.read_into(ADDR_COEFF_2, second)?;
        self.read_into(ADDR_COEFF_3, third)?;

        Ok(CalibData::from_registers(&buffer))
    }
}

impl<I2C, STATE, E> Bme688<I2C, STATE>
where
    I2C: i2c::I2c<Error = E>,
    E: i2c::Error,
{
    /// Releases the underlying bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// The configuration the driver applies.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Performs a soft-reset of the sensor.
    ///
    /// This resets all internal registers to their default values.
    fn reset(&mut self, delay: &mut impl DelayNs) -> error::Result<(), E> {
        self.write_reg(&[regs::ADDR_SOFT_RESET, regs::CMD_SOFT_RESET])?;

        delay.delay_ms(10);

        Ok(())
    }

    /// Reads data from a starting register address into a provided buffer.
    fn read_into(&mut self, reg_address: u8, buffer: &mut [u8]) -> error::Result<(), E> {
        self.i2c
            .write_read(self.address, &[reg_address], buffer)
            .map_err(Bme688Error::bus)
    }

    /// Reads a single byte from a specific register address.
    fn read_reg_byte(&mut self, reg_address: u8) -> error::Result<u8, E> {
        let mut buffer = [0];
        self.read_into(reg_address, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Writes a byte slice (typically `[Register, Value]`) to the sensor.
    fn write_reg(&mut self, data: &[u8]) -> error::Result<(), E> {
        self.i2c
            .write(self.address, data)
            .map_err(Bme688Error::bus)
    }

    /// Rewrites the bits selected by `mask` in a register, keeping the rest.
    fn update_reg(&mut self, reg_address: u8, mask: u8, bits: u8) -> error::Result<(), E> {
        let register = self.read_reg_byte(reg_address)?;
        self.write_reg(&[reg_address, (register & !mask) | (bits & mask)])
    }
}

impl<I2C, E> Bme688<I2C, Ready>
where
    I2C: i2c::I2c<Error = E>,
    E: i2c::Error,
{
    /// Factory calibration read during [`Bme688::init`].
    pub fn calib_data(&self) -> &CalibData {
        &self.calib_data
    }

    /// Applies a full sensor configuration: oversampling and heater slot 0.
    pub fn configure(&mut self, config: Config) -> error::Result<HeaterConfig, E> {
        self.config = config;
        self.configure_oversampling(&config.osrs_config)?;
        self.configure_heater(config.heater.target_temp, config.heater.duration)
    }

    /// Sets oversampling rates for Humidity, Temperature, and Pressure.
    ///
    /// Writes to registers `ctrl_hum` (0x72) and `ctrl_meas` (0x74), leaving
    /// unrelated bits (including the power mode) untouched.
    pub fn configure_oversampling(&mut self, osrs_config: &OversamplingConfig) -> error::Result<(), E> {
        self.update_reg(regs::ADDR_CTRL_HUM, regs::OSRS_H_MASK, osrs_config.hum_osrs as u8)?;

        let temp_pres_combined = ((osrs_config.temp_osrs as u8) << regs::OSRS_T_POS)
            | ((osrs_config.pres_osrs as u8) << regs::OSRS_P_POS);
        self.update_reg(regs::ADDR_CTRL_MEAS, !regs::MODE_MASK, temp_pres_combined)?;

        self.config.osrs_config = *osrs_config;
        Ok(())
    }

    /// Programs heater slot 0 and enables gas conversion 0.
    ///
    /// The target is clamped to 400 °C; durations of 4032 ms or more saturate.
    /// The resistance code assumes the configured ambient temperature.
    pub fn configure_heater(
        &mut self,
        target_temp: Celsius,
        duration: Milliseconds,
    ) -> error::Result<HeaterConfig, E> {
        let profile = HeaterProfile {
            target_temp,
            duration,
        };
        let heater = HeaterConfig::new(&profile, self.config.ambient_temp, &self.calib_data);

        self.write_reg(&[regs::ADDR_GAS_WAIT_0, heater.wait_code])?;
        self.write_reg(&[regs::ADDR_RES_HEAT_0, heater.res_heat_code])?;
        // nb_conv = 0 selects heater slot 0
        self.update_reg(
            regs::ADDR_CTRL_GAS_1,
            regs::RUN_GAS | regs::NB_CONV_MASK,
            regs::RUN_GAS,
        )?;

        self.config.heater = profile;
        Ok(heater)
    }

    /// Reads the current power mode.
    pub fn power_mode(&mut self) -> error::Result<PowerMode, E> {
        Ok(PowerMode::from_bits(self.read_reg_byte(regs::ADDR_CTRL_MEAS)?))
    }

    /// Starts one forced-mode measurement cycle.
    ///
    /// The sensor is always driven through sleep first, even when it already
    /// reports forced mode. Each poll that does not see sleep re-issues the
    /// sleep request; after `mode_retry_budget` requests the call fails.
    ///
    /// # Errors
    /// [`Bme688Error::ModeTransitionTimeout`] when the budget is exhausted,
    /// or the bus error that interrupted the sequence.
    pub fn trigger_forced_mode(&mut self, delay: &mut impl DelayNs) -> error::Result<(), E> {
        let budget = self.config.mode_retry_budget;
        let mut attempts: u8 = 0;

        loop {
            let ctrl_meas = self.read_reg_byte(regs::ADDR_CTRL_MEAS)?;

            if PowerMode::from_bits(ctrl_meas) == PowerMode::Sleep {
                trace!("sleep confirmed after {=u8} requests", attempts);
                return self.write_reg(&[
                    regs::ADDR_CTRL_MEAS,
                    (ctrl_meas & !regs::MODE_MASK) | PowerMode::Forced as u8,
                ]);
            }

            if attempts >= budget {
                warn!("sensor did not enter sleep after {=u8} requests", attempts);
                return Err(Bme688Error::ModeTransitionTimeout { attempts });
            }

            self.write_reg(&[regs::ADDR_CTRL_MEAS, ctrl_meas & !regs::MODE_MASK])?;
            attempts += 1;
            delay.delay_ms(self.config.poll_interval.0);
        }
    }

    /// Reads the temperature, pressure and humidity ADC values of field 0.
    ///
    /// # Errors
    /// [`Bme688Error::SampleReadFailure`] on any bus error.
    pub fn read_raw_data(&mut self) -> error::Result<RawSample, E> {
        let mut buffer = [0u8; regs::LEN_FIELD_0];
        self.read_into(regs::ADDR_FIELD_0, &mut buffer)
            .map_err(Bme688Error::into_sample)?;

        Ok(RawSample::from_registers(&buffer))
    }

    /// Triggers a forced measurement, waits the settle time, and returns
    /// compensated data.
    ///
    /// Bus errors are reported as [`Bme688Error::SampleReadFailure`]; an
    /// exhausted mode-transition budget is passed through unchanged.
    pub fn measure(&mut self, delay: &mut impl DelayNs) -> error::Result<CompensatedSample, E> {
        self.trigger_forced_mode(delay)
            .map_err(Bme688Error::into_sample)?;

        delay.delay_ms(self.config.settle_time.0);

        let raw = self.read_raw_data()?;
        Ok(calc::compensate(&self.calib_data, &raw))
    }

    /// Reads the configuration currently held by the sensor.
    pub fn read_settings(&mut self) -> error::Result<SensorSettings, E> {
        // ctrl_gas_1, ctrl_hum, status, ctrl_meas
        let mut buffer = [0u8; 4];
        self.read_into(regs::ADDR_CTRL_GAS_1, &mut buffer)?;
        let gas_wait_0 = self.read_reg_byte(regs::ADDR_GAS_WAIT_0)?;
        let res_heat_0 = self.read_reg_byte(regs::ADDR_RES_HEAT_0)?;

        let osrs_config = OversamplingConfig {
            temp_osrs: Oversampling::from_u8(buffer[3] >> regs::OSRS_T_POS),
            hum_osrs: Oversampling::from_u8(buffer[1] & regs::OSRS_H_MASK),
            pres_osrs: Oversampling::from_u8(buffer[3] >> regs::OSRS_P_POS),
        };

        Ok(SensorSettings {
            osrs_config,
            gas_wait_0,
            res_heat_0,
            run_gas: buffer[0] & regs::RUN_GAS != 0,
            nb_conv: buffer[0] & regs::NB_CONV_MASK,
            mode: PowerMode::from_bits(buffer[3]),
        })
    }

    /// Reads the Chip ID from the sensor (expected value: 0x61).
    pub fn read_chip_id(&mut self) -> error::Result<u8, E> {
        self.read_reg_byte(regs::ADDR_CHIP_ID)
    }
}
