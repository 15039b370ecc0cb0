use chrono::prelude::Local;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

pub fn get_utc_iso_datetime() -> String {
    let timestamp = chrono::Utc::now().to_rfc3339();
    return timestamp;
}

/// Used to stamp output artifacts, e.g. `%Y-%m-%d_%H-%M-%S`
pub fn get_local_datetime_with_format(format: &str) -> String {
    return Local::now().format(format).to_string();
}

/// Convert an Excel serial date (days since 1899-12-30, fraction = time of day).
pub fn excel_serial_to_chrono(value: f64) -> Option<NaiveDateTime> {
    let excel_base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let days = value.trunc() as i64;
    let seconds = ((value - days as f64) * 86400.0).round() as i64;
    excel_base.checked_add_signed(TimeDelta::try_days(days)? + TimeDelta::try_seconds(seconds)?)
}

/// Render a timestamp as the sheet author most likely typed it.
pub fn format_sheet_datetime(datetime: &NaiveDateTime) -> String {
    if datetime.time() == NaiveTime::MIN {
        return datetime.format("%Y-%m-%d").to_string();
    }
    return datetime.format("%Y-%m-%d %H:%M:%S").to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_serial_dates() {
        let date = excel_serial_to_chrono(44197.0).unwrap();
        assert_eq!(format_sheet_datetime(&date), "2021-01-01");

        let with_time = excel_serial_to_chrono(44197.5).unwrap();
        assert_eq!(format_sheet_datetime(&with_time), "2021-01-01 12:00:00");
    }

    #[test]
    fn test_local_format() {
        assert_eq!(get_local_datetime_with_format("%Y").len(), 4);
    }
}
