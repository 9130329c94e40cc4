//! Inverter clock registers
//!
//! The inverter keeps its clock in three consecutive registers, each packing
//! two fields as high/low bytes:
//!
//! | Register | High byte          | Low byte |
//! |----------|--------------------|----------|
//! | n        | year - 2000        | month    |
//! | n + 1    | day of month       | hour     |
//! | n + 2    | minute             | second   |
//!
//! Deye hybrids expose the clock starting at register 22 (0x16).

use crate::error::{SolarmanError, SolarmanResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Number of registers holding the inverter clock
pub const DATE_TIME_REGISTERS: usize = 3;

/// First year representable by the year-offset byte
const BASE_YEAR: i32 = 2000;

/// Pack a wall-clock time into the three clock registers
///
/// # Errors
/// Returns `InvalidData` if the year is outside 2000..=2255
pub fn date_time_to_registers(time: &NaiveDateTime) -> SolarmanResult<[u16; DATE_TIME_REGISTERS]> {
    let offset = time.year() - BASE_YEAR;
    if !(0..=0xFF).contains(&offset) {
        return Err(SolarmanError::InvalidData(format!(
            "Year {} cannot be stored in the inverter clock (2000..=2255)",
            time.year()
        )));
    }

    let pack = |high: u32, low: u32| ((high << 8) | low) as u16;

    Ok([
        pack(offset as u32, time.month()),
        pack(time.day(), time.hour()),
        pack(time.minute(), time.second()),
    ])
}

/// Unpack the three clock registers into a wall-clock time
///
/// # Errors
/// Returns `InvalidData` if `registers` does not hold exactly three values or
/// the fields do not form a valid calendar date and time
pub fn registers_to_date_time(registers: &[u16]) -> SolarmanResult<NaiveDateTime> {
    let [year_month, day_hour, minute_second] = registers else {
        return Err(SolarmanError::InvalidData(format!(
            "Expected {} clock registers, got {}",
            DATE_TIME_REGISTERS,
            registers.len()
        )));
    };

    let split = |reg: u16| ((reg >> 8) as u32, (reg & 0xFF) as u32);
    let (year_offset, month) = split(*year_month);
    let (day, hour) = split(*day_hour);
    let (minute, second) = split(*minute_second);

    NaiveDate::from_ymd_opt(BASE_YEAR + year_offset as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| {
            SolarmanError::InvalidData(format!(
                "Invalid inverter clock: {:04X} {:04X} {:04X}",
                year_month, day_hour, minute_second
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_date_time_round_trip() {
        let time = at(2024, 5, 6, 12, 34, 56);
        let registers = date_time_to_registers(&time).unwrap();
        assert_eq!(registers, [0x1805, 0x060C, 0x2238]);

        let decoded = registers_to_date_time(&registers).unwrap();
        assert_eq!(decoded, time);
    }

    #[test]
    fn test_known_register_values() {
        // Clock of a Deye SUN-6K at 2025-02-19 19:15:19
        let decoded = registers_to_date_time(&[6402, 4883, 3859]).unwrap();
        assert_eq!(decoded, at(2025, 2, 19, 19, 15, 19));
    }

    #[test]
    fn test_year_out_of_range() {
        assert!(matches!(
            date_time_to_registers(&at(1999, 12, 31, 23, 59, 59)),
            Err(SolarmanError::InvalidData(_))
        ));
        assert!(date_time_to_registers(&at(2255, 1, 1, 0, 0, 0)).is_ok());
        assert!(date_time_to_registers(&at(2256, 1, 1, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_wrong_register_count() {
        assert!(matches!(
            registers_to_date_time(&[0x1805, 0x060C]),
            Err(SolarmanError::InvalidData(_))
        ));
    }

    #[test]
    fn test_invalid_calendar_values() {
        // Month 13
        assert!(registers_to_date_time(&[0x180D, 0x0101, 0x0000]).is_err());
        // Hour 24
        assert!(registers_to_date_time(&[0x1801, 0x0118, 0x0000]).is_err());
    }
}
