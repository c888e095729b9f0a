//! Shared fixtures for the unit tests.

use std::collections::HashMap;

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

use crate::acquisition::Transport;
use crate::regs::{self, calib::*};
use crate::window::KeyValueStore;
use crate::{Bme688, CalibData, Config, Ready};

pub const ADDR: u8 = regs::DEFAULT_ADDRESS;

/// Calibration registers of a real sensor, in burst order.
pub const CALIB_IMAGE: [u8; LEN_TOTAL] = [
    85, 103, 3, 31, 114, 141, 24, 215, 88, 16, 182, 26, 183, 255, 52, 30, 45, 30, 83, 243, 106,
    248, 30, // 0x8A..
    63, 146, 49, 0, 45, 20, 120, 156, 18, 102, 9, 217, 226, 18, // 0xE1..
    44, 108, 26, 29, 243, // 0x00..
];

pub fn calib() -> CalibData {
    CalibData::from_registers(&CALIB_IMAGE)
}

/// Soft reset, chip id and the three calibration bursts.
pub fn init_transactions() -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write(ADDR, vec![regs::ADDR_SOFT_RESET, regs::CMD_SOFT_RESET]),
        I2cTransaction::write_read(ADDR, vec![regs::ADDR_CHIP_ID], vec![regs::CHIP_ID]),
        I2cTransaction::write_read(
            ADDR,
            vec![ADDR_COEFF_1],
            CALIB_IMAGE[..LEN_COEFF_1].to_vec(),
        ),
        I2cTransaction::write_read(
            ADDR,
            vec![ADDR_COEFF_2],
            CALIB_IMAGE[LEN_COEFF_1..LEN_COEFF_1 + LEN_COEFF_2].to_vec(),
        ),
        I2cTransaction::write_read(
            ADDR,
            vec![ADDR_COEFF_3],
            CALIB_IMAGE[LEN_COEFF_1 + LEN_COEFF_2..].to_vec(),
        ),
    ]
}

/// Bus traffic of `configure(Config::default())` given the previous register contents.
pub fn configure_transactions(ctrl_hum: u8, ctrl_meas: u8, ctrl_gas_1: u8) -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write_read(ADDR, vec![regs::ADDR_CTRL_HUM], vec![ctrl_hum]),
        I2cTransaction::write(ADDR, vec![regs::ADDR_CTRL_HUM, (ctrl_hum & !0x07) | 0x01]),
        I2cTransaction::write_read(ADDR, vec![regs::ADDR_CTRL_MEAS], vec![ctrl_meas]),
        I2cTransaction::write(ADDR, vec![regs::ADDR_CTRL_MEAS, (ctrl_meas & 0x03) | 0x54]),
        I2cTransaction::write(ADDR, vec![regs::ADDR_GAS_WAIT_0, 0x59]),
        I2cTransaction::write(ADDR, vec![regs::ADDR_RES_HEAT_0, 110]),
        I2cTransaction::write_read(ADDR, vec![regs::ADDR_CTRL_GAS_1], vec![ctrl_gas_1]),
        I2cTransaction::write(ADDR, vec![regs::ADDR_CTRL_GAS_1, (ctrl_gas_1 & !0x2F) | 0x20]),
    ]
}

/// Sensor already sleeping: one poll, then the forced-mode write.
pub fn trigger_from_sleep(ctrl_meas: u8) -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write_read(ADDR, vec![regs::ADDR_CTRL_MEAS], vec![ctrl_meas]),
        I2cTransaction::write(ADDR, vec![regs::ADDR_CTRL_MEAS, (ctrl_meas & !0x03) | 0x01]),
    ]
}

/// Field 0 burst carrying the given ADC values.
pub fn read_field(temp_adc: u32, press_adc: u32, hum_adc: u16) -> I2cTransaction {
    I2cTransaction::write_read(
        ADDR,
        vec![regs::ADDR_FIELD_0],
        vec![
            (press_adc >> 12) as u8,
            (press_adc >> 4) as u8,
            ((press_adc & 0x0F) << 4) as u8,
            (temp_adc >> 12) as u8,
            (temp_adc >> 4) as u8,
            ((temp_adc & 0x0F) << 4) as u8,
            (hum_adc >> 8) as u8,
            hum_adc as u8,
        ],
    )
}

/// Runs `init` against a mock that must start with [`init_transactions`].
pub fn ready_sensor(i2c: &I2cMock) -> Bme688<I2cMock, Ready> {
    ready_sensor_with(i2c, Config::default())
}

pub fn ready_sensor_with(i2c: &I2cMock, config: Config) -> Bme688<I2cMock, Ready> {
    Bme688::new(i2c.clone(), ADDR, config)
        .init(&mut NoopDelay::new())
        .unwrap()
}

/// Collects everything written to the serial link.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub bytes: Vec<u8>,
    pub fail: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkDown;

impl RecordingTransport {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap()
    }
}

impl Transport for RecordingTransport {
    type Error = LinkDown;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkDown> {
        if self.fail {
            return Err(LinkDown);
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }
}

/// Key-value store with separate pending and committed views.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub pending: HashMap<String, i32>,
    pub committed: HashMap<String, i32>,
    pub fail_reads: bool,
    pub fail_commit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashFault;

impl MemoryStore {
    pub fn with(key: &str, value: i32) -> Self {
        let mut store = MemoryStore::default();
        store.pending.insert(key.into(), value);
        store.committed.insert(key.into(), value);
        store
    }
}

impl KeyValueStore for MemoryStore {
    type Error = FlashFault;

    fn get_i32(&mut self, key: &str) -> Result<Option<i32>, FlashFault> {
        if self.fail_reads {
            return Err(FlashFault);
        }
        Ok(self.committed.get(key).copied())
    }

    fn set_i32(&mut self, key: &str, value: i32) -> Result<(), FlashFault> {
        self.pending.insert(key.into(), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), FlashFault> {
        if self.fail_commit {
            return Err(FlashFault);
        }
        self.committed = self.pending.clone();
        Ok(())
    }
}
