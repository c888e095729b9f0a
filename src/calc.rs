//! Fixed-point compensation and heater encoding (Bosch BME688 datasheet,
//! sections 3.3 and 3.4).
//!
//! Everything in here is pure. Operand order, shifts and the position of
//! every integer division are part of the contract: reordering an expression
//! changes the truncation and therefore the least significant digits.

use crate::{CalibData, CompensatedSample, Humidity, Pressure, RawSample, Temperature};

/// Upper bound of the heater target temperature in °C.
pub const MAX_HEATER_TEMP: u16 = 400;

/// Durations at or above this value saturate the gas-wait register.
const GAS_WAIT_SATURATION_MS: u32 = 0xFC0;

/// Branch point of the pressure division (2^30).
const PRES_OVF_CHECK: i64 = 1 << 30;

/// Intermediate temperature values used for compensation.
///
/// `temp_fine` is required by the pressure formula, `temp_comp` (centi-degrees)
/// by the humidity formula.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CalcTempData {
    pub temp_fine: i32,
    pub temp_comp: i32,
}

/// Converts the raw temperature ADC value into centi-degrees Celsius.
///
/// This must run first: `temp_fine` feeds pressure and humidity.
pub fn calc_temp(calib: &CalibData, temp_adc: u32) -> CalcTempData {
    let var1 = ((temp_adc as i64) >> 3) - ((calib.par_t1 as i64) << 1);
    let var2 = (var1 * calib.par_t2 as i64) >> 11;
    let var3 = ((var1 >> 1) * (var1 >> 1)) >> 12;
    let var3 = (var3 * ((calib.par_t3 as i64) << 4)) >> 14;
    let temp_fine = (var2 + var3) as i32;

    CalcTempData {
        temp_fine,
        temp_comp: (((temp_fine as i64 * 5) + 128) >> 8) as i32,
    }
}

/// Converts the raw pressure ADC value into Pascal.
///
/// Requires `t_fine` from [`calc_temp`]. Returns 0 if the calibration would
/// cause a division by zero.
pub fn calc_pres(calib: &CalibData, t_fine: i32, press_adc: u32) -> u32 {
    let mut var1 = ((t_fine as i64) >> 1) - 64_000;
    let mut var2 = ((((var1 >> 2) * (var1 >> 2)) >> 11) * calib.par_p6 as i64) >> 2;
    var2 += (var1 * calib.par_p5 as i64) << 1;
    var2 = (var2 >> 2) + ((calib.par_p4 as i64) << 16);
    var1 = (((((var1 >> 2) * (var1 >> 2)) >> 13) * ((calib.par_p3 as i64) << 5)) >> 3)
        + ((calib.par_p2 as i64 * var1) >> 1);
    var1 >>= 18;
    var1 = ((32_768 + var1) * calib.par_p1 as i64) >> 15;

    if var1 == 0 {
        return 0;
    }

    let mut press_comp = 1_048_576 - press_adc as i64;
    press_comp = (press_comp - (var2 >> 12)) * 3125;

    // Divide first for large values, shift first otherwise, to keep precision
    if press_comp >= PRES_OVF_CHECK {
        press_comp = (press_comp / var1) << 1;
    } else {
        press_comp = (press_comp << 1) / var1;
    }

    let var1 = (calib.par_p9 as i64 * (((press_comp >> 3) * (press_comp >> 3)) >> 13)) >> 12;
    let var2 = ((press_comp >> 2) * calib.par_p8 as i64) >> 13;
    let var3 = ((press_comp >> 8)
        * (press_comp >> 8)
        * (press_comp >> 8)
        * calib.par_p10 as i64)
        >> 17;

    press_comp += (var1 + var2 + var3 + ((calib.par_p7 as i64) << 7)) >> 4;
    press_comp as u32
}

/// Converts the raw humidity ADC value into milli-percent (% * 1000).
///
/// `temp_comp` is the compensated temperature in centi-degrees. The result
/// is clamped to `0..=100_000`.
pub fn calc_hum(calib: &CalibData, temp_comp: i32, hum_adc: u16) -> i32 {
    let temp_scaled = temp_comp as i64;

    let var1 = hum_adc as i64
        - ((calib.par_h1 as i64) << 4)
        - (((temp_scaled * calib.par_h3 as i64) / 100) >> 1);
    let var2 = (calib.par_h2 as i64
        * (((temp_scaled * calib.par_h4 as i64) / 100)
            + (((temp_scaled * ((temp_scaled * calib.par_h5 as i64) / 100)) >> 6) / 100)
            + (1 << 14)))
        >> 10;
    let var3 = var1 * var2;
    let var4 = (((calib.par_h6 as i64) << 7) + ((temp_scaled * calib.par_h7 as i64) / 100)) >> 4;
    let var5 = ((var3 >> 14) * (var3 >> 14)) >> 10;
    let var6 = (var4 * var5) >> 1;
    let hum_comp = (((var3 + var6) >> 10) * 1000) >> 12;

    hum_comp.clamp(0, 100_000) as i32
}

/// Runs the three formulas in their required order.
pub fn compensate(calib: &CalibData, raw: &RawSample) -> CompensatedSample {
    let temp = calc_temp(calib, raw.temp_adc);

    CompensatedSample {
        temp: Temperature(temp.temp_comp),
        pres: Pressure(calc_pres(calib, temp.temp_fine, raw.press_adc)),
        hum: Humidity(calc_hum(calib, temp.temp_comp, raw.hum_adc)),
        t_fine: temp.temp_fine,
    }
}

/// Encodes a heater duration for `gas_wait_x`.
///
/// The register holds a 6-bit mantissa and a 2-bit multiplier
/// (1, 4, 16 or 64 ms steps). Values from 4032 ms upward saturate to `0xFF`.
pub fn gas_wait_code(duration_ms: u32) -> u8 {
    if duration_ms >= GAS_WAIT_SATURATION_MS {
        return 0xFF;
    }

    let mut duration = duration_ms;
    let mut factor: u8 = 0;
    while duration > 0x3F {
        duration >>= 2;
        factor += 1;
    }

    duration as u8 + factor * 64
}

/// Computes the `res_heat_x` code for a heater target temperature.
///
/// The target is clamped to [`MAX_HEATER_TEMP`] to protect the hot plate.
/// `ambient_temp` is in whole degrees Celsius.
pub fn res_heat_code(calib: &CalibData, target_temp: u16, ambient_temp: i32) -> u8 {
    let target_temp = target_temp.min(MAX_HEATER_TEMP) as i32;

    let var1 = ((ambient_temp * calib.par_g3 as i32) / 1000) * 256;
    let var2 = (calib.par_g1 as i32 + 784)
        * (((((calib.par_g2 as i32 + 154_009) * target_temp * 5) / 100) + 3_276_800) / 10);
    let var3 = var1 + (var2 / 2);
    let var4 = var3 / (calib.res_heat_range as i32 + 4);
    let var5 = 131 * calib.res_heat_val as i32 + 65_536;
    let res_heat_x100 = ((var4 / var5) - 250) * 34;

    ((res_heat_x100 + 50) / 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::calib;

    #[test]
    fn temperature_golden_vector() {
        let t = calc_temp(&calib(), 480_000);
        assert_eq!(t.temp_fine, 99_983);
        assert_eq!(t.temp_comp, 1953);
    }

    #[test]
    fn temperature_below_zero() {
        let t = calc_temp(&calib(), 100_000);
        assert_eq!(t.temp_fine, -513_279);
        assert_eq!(t.temp_comp, -10_025);
    }

    #[test]
    fn temperature_is_deterministic() {
        let calib = calib();
        for adc in [0, 100_000, 480_000, 0xF_FFFF] {
            assert_eq!(calc_temp(&calib, adc), calc_temp(&calib, adc));
        }
    }

    #[test]
    fn pressure_golden_vector_divide_first_branch() {
        assert_eq!(calc_pres(&calib(), 99_983, 330_000), 104_351);
    }

    #[test]
    fn pressure_golden_vector_shift_first_branch() {
        assert_eq!(calc_pres(&calib(), 99_983, 600_000), 58_054);
    }

    #[test]
    fn pressure_guards_zero_divisor() {
        let calib = CalibData {
            par_p1: 0,
            ..calib()
        };
        assert_eq!(calc_pres(&calib, 99_983, 330_000), 0);
    }

    #[test]
    fn humidity_golden_vector() {
        assert_eq!(calc_hum(&calib(), 1953, 22_000), 48_391);
    }

    #[test]
    fn humidity_is_clamped() {
        // unclamped this lands above 100 %rH
        assert_eq!(calc_hum(&calib(), 3215, 30_000), 100_000);
        assert_eq!(calc_hum(&calib(), 1953, 0), 0);
    }

    #[test]
    fn compensate_runs_temperature_first() {
        let raw = RawSample {
            temp_adc: 100_000,
            press_adc: 300_000,
            hum_adc: 20_000,
        };
        let sample = compensate(&calib(), &raw);
        assert_eq!(sample.t_fine, -513_279);
        assert_eq!(sample.temp.0, -10_025);
        assert_eq!(sample.pres.0, 89_283);
        assert_eq!(sample.hum.0, 34_818);
    }

    #[test]
    fn gas_wait_reference_points() {
        assert_eq!(gas_wait_code(0), 0x00);
        assert_eq!(gas_wait_code(63), 0x3F);
        assert_eq!(gas_wait_code(64), 0x50);
        assert_eq!(gas_wait_code(100), 0x59);
        assert_eq!(gas_wait_code(1009), 0xBF);
        assert_eq!(gas_wait_code(4031), 0xFE);
        assert_eq!(gas_wait_code(4032), 0xFF);
        assert_eq!(gas_wait_code(60_000), 0xFF);
    }

    #[test]
    fn gas_wait_factor_never_decreases() {
        let mut last_factor = 0;
        for dur in [1, 9, 10, 99, 100, 999, 1000, 4000] {
            let factor = gas_wait_code(dur) >> 6;
            assert!(factor >= last_factor, "factor dropped at {} ms", dur);
            last_factor = factor;
        }
    }

    #[test]
    fn heater_code_at_default_profile() {
        assert_eq!(res_heat_code(&calib(), 300, 25), 110);
        assert_eq!(res_heat_code(&calib(), 0, 25), 33);
        assert_eq!(res_heat_code(&calib(), 320, 25), 116);
    }

    #[test]
    fn heater_target_is_clamped() {
        let calib = calib();
        assert_eq!(res_heat_code(&calib, 400, 25), 136);
        assert_eq!(res_heat_code(&calib, 500, 25), 136);
        assert_eq!(res_heat_code(&calib, u16::MAX, 25), 136);
    }
}
