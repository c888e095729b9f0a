//! Error types for the BME688 driver, the window store and the acquisition run.

use embedded_hal::i2c::{self, ErrorKind};

/// Errors raised while talking to the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bme688Error<E> {
    /// The sensor did not acknowledge its address or a data byte.
    BusNack(E),
    /// The transaction did not complete within the bus timeout (or the
    /// controller aborted it for another reason).
    BusTimeout(E),
    /// The chip ID register did not read `0x61`.
    ChipIdMismatch(u8),
    /// Reading the factory calibration failed. Nothing can be compensated.
    CalibrationUnavailable(E),
    /// A bus error occurred while a single sample was being acquired.
    SampleReadFailure(E),
    /// The sensor never reported sleep mode within the retry budget.
    ModeTransitionTimeout {
        /// Number of sleep requests issued before giving up.
        attempts: u8,
    },
}

impl<E: i2c::Error> Bme688Error<E> {
    /// Classifies a raw bus error.
    pub(crate) fn bus(error: E) -> Self {
        match error.kind() {
            ErrorKind::NoAcknowledge(_) => Bme688Error::BusNack(error),
            _ => Bme688Error::BusTimeout(error),
        }
    }
}

impl<E> Bme688Error<E> {
    /// Re-labels a bus error raised during calibration loading.
    pub(crate) fn into_calibration(self) -> Self {
        match self {
            Bme688Error::BusNack(e) | Bme688Error::BusTimeout(e) => {
                Bme688Error::CalibrationUnavailable(e)
            }
            other => other,
        }
    }

    /// Re-labels a bus error raised while acquiring one sample.
    pub(crate) fn into_sample(self) -> Self {
        match self {
            Bme688Error::BusNack(e) | Bme688Error::BusTimeout(e) => {
                Bme688Error::SampleReadFailure(e)
            }
            other => other,
        }
    }

    /// `true` when the error only spoils the current sample.
    pub fn is_sample_local(&self) -> bool {
        matches!(self, Bme688Error::SampleReadFailure(_))
    }
}

/// Result type alias for sensor operations.
pub type Result<T, E> = core::result::Result<T, Bme688Error<E>>;

/// Errors raised by the persistent window store.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError<E> {
    /// The key-value backend failed to open, read, write or commit.
    PersistentStore(E),
    /// The requested window is zero, negative or unreasonably large.
    InvalidWindow(i32),
}

/// Errors that end an acquisition run early.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionError<BE, TE> {
    Sensor(Bme688Error<BE>),
    Transport(TE),
}

impl<BE, TE> From<Bme688Error<BE>> for AcquisitionError<BE, TE> {
    fn from(e: Bme688Error<BE>) -> Self {
        AcquisitionError::Sensor(e)
    }
}

/// Errors surfaced by the command controller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError<BE, TE, SE> {
    Sensor(Bme688Error<BE>),
    Transport(TE),
    Store(StoreError<SE>),
}

impl<BE, TE, SE> From<AcquisitionError<BE, TE>> for ControlError<BE, TE, SE> {
    fn from(e: AcquisitionError<BE, TE>) -> Self {
        match e {
            AcquisitionError::Sensor(e) => ControlError::Sensor(e),
            AcquisitionError::Transport(e) => ControlError::Transport(e),
        }
    }
}
