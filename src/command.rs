//! Host command protocol.
//!
//! The host sends one command per exchange:
//!
//! | Request   | Reply                                          |
//! |-----------|------------------------------------------------|
//! | `BEGIN`   | `OK\n`, the window's sample lines, `FINISH\n`  |
//! | `END`     | `CLOSED\n`, then the device restarts           |
//! | `<n>`     | nothing if stored, `ERROR\n` if rejected       |
//! | otherwise | `ERROR\n`                                      |
//!
//! Requests may be padded with NUL, CR, LF or spaces.

use embedded_hal::{delay::DelayNs, i2c};

use crate::acquisition::{Acquisition, AcquisitionConfig, Transport, WindowReport};
use crate::error::{ControlError, StoreError};
use crate::window::{KeyValueStore, Window, WindowStore};
use crate::{Bme688, Ready};

pub const REPLY_OK: &[u8] = b"OK\n";
pub const REPLY_FINISH: &[u8] = b"FINISH\n";
pub const REPLY_CLOSED: &[u8] = b"CLOSED\n";
pub const REPLY_ERROR: &[u8] = b"ERROR\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Run one acquisition window.
    Begin,
    /// Close the session and restart.
    End,
    /// Persist a new window size (not yet validated).
    SetWindow(i32),
    Unknown,
}

impl Command {
    pub fn parse(request: &[u8]) -> Self {
        let token = trim(request);

        match token {
            b"BEGIN" => return Command::Begin,
            b"END" => return Command::End,
            _ => {}
        }

        core::str::from_utf8(token)
            .ok()
            .and_then(|text| text.parse::<i32>().ok())
            .map_or(Command::Unknown, Command::SetWindow)
    }
}

fn trim(request: &[u8]) -> &[u8] {
    let padding = |b: &u8| matches!(b, b'\0' | b'\r' | b'\n' | b' ');

    let start = request.iter().position(|b| !padding(b)).unwrap_or(request.len());
    let end = request.iter().rposition(|b| !padding(b)).map_or(start, |i| i + 1);
    &request[start..end]
}

/// What the caller has to do after a command was handled.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    Finished(WindowReport),
    /// `END` was acknowledged; the platform should restart the device.
    Restart,
    WindowStored(Window),
    /// `ERROR` was sent.
    Rejected,
}

/// Owns the sensor session and executes host commands against it.
pub struct Controller<I2C, D, T, S> {
    sensor: Bme688<I2C, Ready>,
    delay: D,
    transport: T,
    windows: WindowStore<S>,
    acquisition: AcquisitionConfig,
}

impl<I2C, D, T, S, E> Controller<I2C, D, T, S>
where
    I2C: i2c::I2c<Error = E>,
    E: i2c::Error,
    D: DelayNs,
    T: Transport,
    S: KeyValueStore,
{
    /// `acquisition` supplies the timing; its window is replaced by the
    /// stored one on every `BEGIN`.
    pub fn new(
        sensor: Bme688<I2C, Ready>,
        delay: D,
        transport: T,
        store: S,
        acquisition: AcquisitionConfig,
    ) -> Self {
        Controller {
            sensor,
            delay,
            transport,
            windows: WindowStore::new(store),
            acquisition,
        }
    }

    /// Parses and executes one request.
    ///
    /// # Errors
    /// Sensor and transport errors of an acquisition run, transport errors
    /// while replying, and store failures while persisting a window.
    pub fn handle(
        &mut self,
        request: &[u8],
    ) -> Result<Outcome, ControlError<E, T::Error, S::Error>> {
        match Command::parse(request) {
            Command::Begin => {
                self.reply(REPLY_OK)?;
                let config = AcquisitionConfig {
                    window: self.windows.load_or_default(),
                    ..self.acquisition
                };
                let report = Acquisition::new(
                    &mut self.sensor,
                    &mut self.delay,
                    &mut self.transport,
                    config,
                )
                .run()?;
                self.reply(REPLY_FINISH)?;
                Ok(Outcome::Finished(report))
            }
            Command::End => {
                self.reply(REPLY_CLOSED)?;
                info!("session closed");
                Ok(Outcome::Restart)
            }
            Command::SetWindow(size) => match self.windows.store(size) {
                Ok(window) => Ok(Outcome::WindowStored(window)),
                Err(StoreError::InvalidWindow(size)) => {
                    warn!("window {=i32} rejected", size);
                    self.reply(REPLY_ERROR)?;
                    Ok(Outcome::Rejected)
                }
                Err(e) => {
                    error!("window could not be persisted");
                    self.reply(REPLY_ERROR)?;
                    Err(ControlError::Store(e))
                }
            },
            Command::Unknown => {
                warn!("unknown command");
                self.reply(REPLY_ERROR)?;
                Ok(Outcome::Rejected)
            }
        }
    }

    fn reply(&mut self, message: &[u8]) -> Result<(), ControlError<E, T::Error, S::Error>> {
        self.transport
            .write_all(message)
            .map_err(ControlError::Transport)
    }

    /// Gives back the sensor, delay, transport and store.
    pub fn release(self) -> (Bme688<I2C, Ready>, D, T, S) {
        (self.sensor, self.delay, self.transport, self.windows.release())
    }
}
