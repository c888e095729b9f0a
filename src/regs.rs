//! BME688 register map (Bosch Sensortec BME688 datasheet, section 5.2).
//!
//! Only the registers used by the forced-mode pipeline are listed.

/// Default I2C address with SDO tied to GND.
pub const DEFAULT_ADDRESS: u8 = 0x76;

pub const ADDR_CHIP_ID: u8 = 0xD0;
pub const CHIP_ID: u8 = 0x61;

pub const ADDR_SOFT_RESET: u8 = 0xE0;
pub const CMD_SOFT_RESET: u8 = 0xB6;

pub const ADDR_CTRL_GAS_1: u8 = 0x71;
pub const ADDR_CTRL_HUM: u8 = 0x72;
pub const ADDR_CTRL_MEAS: u8 = 0x74;
pub const ADDR_GAS_WAIT_0: u8 = 0x64;
pub const ADDR_RES_HEAT_0: u8 = 0x5A;

/// First byte of the field 0 data block (press_msb).
pub const ADDR_FIELD_0: u8 = 0x1F;
/// press (3) + temp (3) + hum (2)
pub const LEN_FIELD_0: usize = 8;

// ctrl_hum
pub const OSRS_H_MASK: u8 = 0x07;
// ctrl_meas
pub const OSRS_T_POS: u8 = 5;
pub const OSRS_P_POS: u8 = 2;
pub const MODE_MASK: u8 = 0x03;
// ctrl_gas_1
pub const RUN_GAS: u8 = 0x20;
pub const NB_CONV_MASK: u8 = 0x0F;

/// Calibration memory, read as three bursts and laid out back to back.
pub mod calib {
    pub const ADDR_COEFF_1: u8 = 0x8A;
    pub const LEN_COEFF_1: usize = 23;
    pub const ADDR_COEFF_2: u8 = 0xE1;
    pub const LEN_COEFF_2: usize = 14;
    pub const ADDR_COEFF_3: u8 = 0x00;
    pub const LEN_COEFF_3: usize = 5;
    pub const LEN_TOTAL: usize = LEN_COEFF_1 + LEN_COEFF_2 + LEN_COEFF_3;

    // Indices into the concatenated image.
    pub const IDX_T2_LSB: usize = 0;
    pub const IDX_T2_MSB: usize = 1;
    pub const IDX_T3: usize = 2;
    pub const IDX_P1_LSB: usize = 4;
    pub const IDX_P1_MSB: usize = 5;
    pub const IDX_P2_LSB: usize = 6;
    pub const IDX_P2_MSB: usize = 7;
    pub const IDX_P3: usize = 8;
    pub const IDX_P4_LSB: usize = 10;
    pub const IDX_P4_MSB: usize = 11;
    pub const IDX_P5_LSB: usize = 12;
    pub const IDX_P5_MSB: usize = 13;
    pub const IDX_P7: usize = 14;
    pub const IDX_P6: usize = 15;
    pub const IDX_P8_LSB: usize = 18;
    pub const IDX_P8_MSB: usize = 19;
    pub const IDX_P9_LSB: usize = 20;
    pub const IDX_P9_MSB: usize = 21;
    pub const IDX_P10: usize = 22;
    pub const IDX_H2_MSB: usize = 23;
    /// Shared: H2 low nibble in bits 7:4, H1 low nibble in bits 3:0.
    pub const IDX_H1_H2_LSB: usize = 24;
    pub const IDX_H1_MSB: usize = 25;
    pub const IDX_H3: usize = 26;
    pub const IDX_H4: usize = 27;
    pub const IDX_H5: usize = 28;
    pub const IDX_H6: usize = 29;
    pub const IDX_H7: usize = 30;
    pub const IDX_T1_LSB: usize = 31;
    pub const IDX_T1_MSB: usize = 32;
    pub const IDX_GH2_LSB: usize = 33;
    pub const IDX_GH2_MSB: usize = 34;
    pub const IDX_GH1: usize = 35;
    pub const IDX_GH3: usize = 36;
    pub const IDX_RES_HEAT_VAL: usize = 37;
    pub const IDX_RES_HEAT_RANGE: usize = 39;
    pub const IDX_RANGE_SW_ERR: usize = 41;

    pub const RES_HEAT_RANGE_MASK: u8 = 0x30;
}
