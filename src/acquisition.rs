//! Windowed forced-mode acquisition.
//!
//! One run configures the sensor, takes `window` forced-mode samples, streams
//! every compensated temperature/pressure pair and finally the RMS of the
//! window. Each emitted value is a `{:.6}` decimal followed by `\n`.
//!
//! A bus error while triggering or reading one sample skips that sample; it is
//! counted in [`WindowReport::skipped`] and left out of the RMS. Configuration
//! failures and an exhausted mode-transition budget end the run.

use core::fmt::Write as _;

use embedded_hal::{delay::DelayNs, i2c};
use heapless::String;

use crate::error::{AcquisitionError, Bme688Error};
use crate::window::Window;
use crate::{calc, Bme688, CompensatedSample, Milliseconds, RawSample, Ready};

/// Room for one framed value. Values derived from 32-bit fixed point never
/// need more than 18 characters.
pub const FRAME_CAPACITY: usize = 32;

/// Byte sink for the serial link.
pub trait Transport {
    type Error;

    /// Writes all of `bytes` or fails.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Formats a value the way it goes over the wire: six decimals and a newline.
pub fn frame(value: f64) -> String<FRAME_CAPACITY> {
    let mut line = String::new();
    if writeln!(line, "{:.6}", value).is_err() {
        warn!("value does not fit a {=usize} byte frame", FRAME_CAPACITY);
    }
    line
}

/// Root-mean-square of temperature (°C) and pressure (hPa) over a window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RmsPair {
    pub temp: f64,
    pub pres: f64,
}

/// Running sum of squares.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowAggregate {
    temp_sq_sum: f64,
    pres_sq_sum: f64,
    count: u16,
}

impl WindowAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn push(&mut self, sample: &CompensatedSample) {
        let temp = sample.temp.degrees();
        let pres = sample.pres.hectopascal();

        self.temp_sq_sum += temp * temp;
        self.pres_sq_sum += pres * pres;
        self.count += 1;
    }

    /// Number of samples pushed since the last reset.
    pub fn count(&self) -> u16 {
        self.count
    }

    /// `None` while no sample has been pushed.
    pub fn rms(&self) -> Option<RmsPair> {
        if self.count == 0 {
            return None;
        }

        let n = self.count as f64;
        Some(RmsPair {
            temp: libm::sqrt(self.temp_sq_sum / n),
            pres: libm::sqrt(self.pres_sq_sum / n),
        })
    }
}

/// Timing and size of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionConfig {
    pub window: Window,
    /// Wait before every forced-mode trigger.
    pub sample_delay: Milliseconds,
    /// Wait before and after the RMS pair is sent.
    pub finalize_delay: Milliseconds,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        AcquisitionConfig {
            window: Window::DEFAULT,
            sample_delay: Milliseconds(1000),
            finalize_delay: Milliseconds(3000),
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Idle,
    Configuring,
    Triggering,
    Settling,
    Reading,
    Compensating(RawSample),
    Aggregating(CompensatedSample),
    Finalizing,
    Done,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WindowReport {
    /// Samples that made it into the aggregate.
    pub samples: u16,
    /// Samples dropped because of a bus error.
    pub skipped: u16,
    /// `None` if every sample was skipped.
    pub rms: Option<RmsPair>,
}

/// A single acquisition run. Holds the sensor session for its whole lifetime.
pub struct Acquisition<'a, I2C, D, T> {
    sensor: &'a mut Bme688<I2C, Ready>,
    delay: &'a mut D,
    transport: &'a mut T,
    config: AcquisitionConfig,
    phase: Phase,
    aggregate: WindowAggregate,
    skipped: u16,
}

impl<'a, I2C, D, T, E> Acquisition<'a, I2C, D, T>
where
    I2C: i2c::I2c<Error = E>,
    E: i2c::Error,
    D: DelayNs,
    T: Transport,
{
    pub fn new(
        sensor: &'a mut Bme688<I2C, Ready>,
        delay: &'a mut D,
        transport: &'a mut T,
        config: AcquisitionConfig,
    ) -> Self {
        Acquisition {
            sensor,
            delay,
            transport,
            config,
            phase: Phase::Idle,
            aggregate: WindowAggregate::new(),
            skipped: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn report(&self) -> WindowReport {
        WindowReport {
            samples: self.aggregate.count(),
            skipped: self.skipped,
            rms: self.aggregate.rms(),
        }
    }

    /// Runs every remaining phase until [`Phase::Done`].
    pub fn run(&mut self) -> Result<WindowReport, AcquisitionError<E, T::Error>> {
        while self.step()? != Phase::Done {}
        Ok(self.report())
    }

    /// Executes the current phase and moves to the next one.
    pub fn step(&mut self) -> Result<Phase, AcquisitionError<E, T::Error>> {
        self.phase = match self.phase {
            Phase::Idle => {
                self.aggregate.reset();
                self.skipped = 0;
                debug!("acquisition of {=u16} samples", self.config.window.get());
                Phase::Configuring
            }
            Phase::Configuring => {
                let config = *self.sensor.config();
                self.sensor.configure(config)?;
                Phase::Triggering
            }
            Phase::Triggering => {
                self.delay.delay_ms(self.config.sample_delay.0);
                match self.sensor.trigger_forced_mode(&mut *self.delay) {
                    Ok(()) => Phase::Settling,
                    Err(e) => self.skip(e.into_sample())?,
                }
            }
            Phase::Settling => {
                self.delay.delay_ms(self.sensor.config().settle_time.0);
                Phase::Reading
            }
            Phase::Reading => match self.sensor.read_raw_data() {
                Ok(raw) => Phase::Compensating(raw),
                Err(e) => self.skip(e)?,
            },
            Phase::Compensating(raw) => {
                Phase::Aggregating(calc::compensate(self.sensor.calib_data(), &raw))
            }
            Phase::Aggregating(sample) => {
                self.aggregate.push(&sample);
                self.emit(sample.temp.degrees())?;
                self.emit(sample.pres.hectopascal())?;
                self.next_sample()
            }
            Phase::Finalizing => {
                self.delay.delay_ms(self.config.finalize_delay.0);
                match self.aggregate.rms() {
                    Some(rms) => {
                        self.emit(rms.temp)?;
                        self.emit(rms.pres)?;
                    }
                    None => warn!("no valid sample in window, RMS not sent"),
                }
                self.delay.delay_ms(self.config.finalize_delay.0);
                Phase::Done
            }
            Phase::Done => Phase::Done,
        };

        Ok(self.phase)
    }

    fn skip(&mut self, error: Bme688Error<E>) -> Result<Phase, AcquisitionError<E, T::Error>> {
        if !error.is_sample_local() {
            return Err(error.into());
        }

        self.skipped += 1;
        warn!(
            "sample {=u16} skipped after bus error",
            self.aggregate.count() + self.skipped
        );
        Ok(self.next_sample())
    }

    fn emit(&mut self, value: f64) -> Result<(), AcquisitionError<E, T::Error>> {
        self.transport
            .write_all(frame(value).as_bytes())
            .map_err(AcquisitionError::Transport)
    }

    fn next_sample(&self) -> Phase {
        if self.aggregate.count() + self.skipped >= self.config.window.get() {
            Phase::Finalizing
        } else {
            Phase::Triggering
        }
    }
}
