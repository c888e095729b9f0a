use crate::regs::calib::*;

/// Factory-fused calibration coefficients read from the sensor.
/// These are unique to every individual chip and required for compensation formulas.
///
/// The values never change during a power cycle; the driver reads them once in
/// [`Bme688::init`](crate::Bme688::init) and keeps them for the lifetime of the
/// `Ready` driver.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibData {
    pub par_t1: u16,
    pub par_t2: i16,
    pub par_t3: i8,
    pub par_p1: u16,
    pub par_p2: i16,
    pub par_p3: i8,
    pub par_p4: i16,
    pub par_p5: i16,
    pub par_p6: i8,
    pub par_p7: i8,
    pub par_p8: i16,
    pub par_p9: i16,
    pub par_p10: u8,
    pub par_h1: u16,
    pub par_h2: u16,
    pub par_h3: i8,
    pub par_h4: i8,
    pub par_h5: i8,
    pub par_h6: u8,
    pub par_h7: i8,
    pub par_g1: i8,
    pub par_g2: i16,
    pub par_g3: i8,
    /// Heater resistance range, bits 5:4 of register `0x02`.
    pub res_heat_range: u8,
    /// Heater resistance correction, register `0x00`.
    pub res_heat_val: i8,
    /// Gas range switching error, upper nibble of register `0x04`.
    pub range_sw_err: i8,
}

impl CalibData {
    /// Decodes the concatenated calibration image
    /// (`0x8A..=0xA0`, `0xE1..=0xEE`, `0x00..=0x04`).
    ///
    /// See BME688 datasheet, section 5.3.
    pub fn from_registers(buffer: &[u8; LEN_TOTAL]) -> Self {
        let le_u16 = |lsb: usize, msb: usize| u16::from_le_bytes([buffer[lsb], buffer[msb]]);
        let le_i16 = |lsb: usize, msb: usize| i16::from_le_bytes([buffer[lsb], buffer[msb]]);

        CalibData {
            par_t1: le_u16(IDX_T1_LSB, IDX_T1_MSB),
            par_t2: le_i16(IDX_T2_LSB, IDX_T2_MSB),
            par_t3: buffer[IDX_T3] as i8,
            par_p1: le_u16(IDX_P1_LSB, IDX_P1_MSB),
            par_p2: le_i16(IDX_P2_LSB, IDX_P2_MSB),
            par_p3: buffer[IDX_P3] as i8,
            par_p4: le_i16(IDX_P4_LSB, IDX_P4_MSB),
            par_p5: le_i16(IDX_P5_LSB, IDX_P5_MSB),
            par_p6: buffer[IDX_P6] as i8,
            par_p7: buffer[IDX_P7] as i8,
            par_p8: le_i16(IDX_P8_LSB, IDX_P8_MSB),
            par_p9: le_i16(IDX_P9_LSB, IDX_P9_MSB),
            par_p10: buffer[IDX_P10],
            // H1 and H2 are 12-bit values sharing the byte at 0xE2
            par_h1: ((buffer[IDX_H1_MSB] as u16) << 4) | (buffer[IDX_H1_H2_LSB] & 0x0F) as u16,
            par_h2: ((buffer[IDX_H2_MSB] as u16) << 4) | (buffer[IDX_H1_H2_LSB] >> 4) as u16,
            par_h3: buffer[IDX_H3] as i8,
            par_h4: buffer[IDX_H4] as i8,
            par_h5: buffer[IDX_H5] as i8,
            par_h6: buffer[IDX_H6],
            par_h7: buffer[IDX_H7] as i8,
            par_g1: buffer[IDX_GH1] as i8,
            par_g2: le_i16(IDX_GH2_LSB, IDX_GH2_MSB),
            par_g3: buffer[IDX_GH3] as i8,
            res_heat_range: (buffer[IDX_RES_HEAT_RANGE] & RES_HEAT_RANGE_MASK) >> 4,
            res_heat_val: buffer[IDX_RES_HEAT_VAL] as i8,
            range_sw_err: (buffer[IDX_RANGE_SW_ERR] as i8) >> 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CALIB_IMAGE;

    #[test]
    fn decodes_reference_image() {
        let calib = CalibData::from_registers(&CALIB_IMAGE);

        assert_eq!(calib.par_t1, 26130);
        assert_eq!(calib.par_t2, 26453);
        assert_eq!(calib.par_t3, 3);
        assert_eq!(calib.par_p1, 36210);
        assert_eq!(calib.par_p2, -10472);
        assert_eq!(calib.par_p3, 88);
        assert_eq!(calib.par_p4, 6838);
        assert_eq!(calib.par_p5, -73);
        assert_eq!(calib.par_p6, 30);
        assert_eq!(calib.par_p7, 52);
        assert_eq!(calib.par_p8, -3245);
        assert_eq!(calib.par_p9, -1942);
        assert_eq!(calib.par_p10, 30);
        assert_eq!(calib.par_h1, 786);
        assert_eq!(calib.par_h2, 1017);
        assert_eq!(calib.par_h3, 0);
        assert_eq!(calib.par_h4, 45);
        assert_eq!(calib.par_h5, 20);
        assert_eq!(calib.par_h6, 120);
        assert_eq!(calib.par_h7, -100);
        assert_eq!(calib.par_g1, -30);
        assert_eq!(calib.par_g2, -9975);
        assert_eq!(calib.par_g3, 18);
        assert_eq!(calib.res_heat_range, 1);
        assert_eq!(calib.res_heat_val, 44);
        assert_eq!(calib.range_sw_err, -1);
    }

    #[test]
    fn shared_humidity_nibbles_do_not_bleed() {
        let mut image = [0u8; LEN_TOTAL];
        image[IDX_H2_MSB] = 0xAB;
        image[IDX_H1_H2_LSB] = 0xCD;
        image[IDX_H1_MSB] = 0xEF;

        let calib = CalibData::from_registers(&image);
        assert_eq!(calib.par_h1, 0xEFD);
        assert_eq!(calib.par_h2, 0xABC);
    }
}
