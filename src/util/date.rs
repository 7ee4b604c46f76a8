use std::cell::RefCell;

use chrono::Datelike;
pub use time::Date;
use time::{macros::format_description, Month, UtcOffset};

pub type StaticDateFormat<'a> =
    &'static [time::format_description::BorrowedFormatItem<'a>];

pub const STANDARD_DATE_FORMAT: StaticDateFormat =
    format_description!("[year]-[month]-[day]");

pub fn parse_standard_date(date_str: &str) -> Result<Date, time::error::Parse> {
    Date::parse(date_str, STANDARD_DATE_FORMAT)
}

pub const US_DATE_FORMAT: StaticDateFormat =
    format_description!("[month]/[day]/[year]");

/// Dates as capital gains reports show them, with a four digit year.
pub fn format_us_date(d: &Date) -> String {
    d.format(US_DATE_FORMAT).unwrap_or_else(|_| d.to_string())
}

// Two digit years are placed in the century that puts them within
// 80 years before and 20 years after today.
fn expand_two_digit_year(yy: i32) -> i32 {
    let this_year = today_local().year();
    let mut year = (this_year / 100) * 100 + yy;
    if year >= this_year + 20 {
        year -= 100;
    } else if year < this_year - 80 {
        year += 100;
    }
    year
}

/// Parses the M/d/yy dates found in capital gains reports.
/// Four digit years are also accepted.
pub fn parse_mdy_date(date_str: &str) -> Result<Date, String> {
    let err = || format!("Invalid date \"{}\" (expected M/d/yy)", date_str);
    let parts: Vec<&str> = date_str.trim().split('/').collect();
    if parts.len() != 3 {
        return Err(err());
    }
    let num = |s: &str| -> Result<u32, String> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        s.parse::<u32>().map_err(|_| err())
    };

    let month = num(parts[0])?;
    let day = num(parts[1])?;
    let year = match parts[2].len() {
        1 | 2 => expand_two_digit_year(num(parts[2])? as i32),
        4 => num(parts[2])? as i32,
        _ => return Err(err()),
    };

    let month = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(err)?;
    let day = u8::try_from(day).map_err(|_| err())?;
    Date::from_calendar_date(year, month, day).map_err(|_| err())
}

fn date_naive_to_date(dn: &chrono::NaiveDate) -> Date {
    Date::from_calendar_date(
        dn.year(),
        Month::December.nth_next(dn.month() as u8),
        dn.day() as u8,
    )
    .unwrap()
}

thread_local! {
    static TODAYS_DATE_FOR_TEST_TL: RefCell<Date> = const { RefCell::new(Date::MIN) };
}

pub fn set_todays_date_for_test(d: Date) {
    TODAYS_DATE_FOR_TEST_TL.with_borrow_mut(|d_| *d_ = d);
}

pub fn today_local() -> Date {
    let test_date: Date = TODAYS_DATE_FOR_TEST_TL.with_borrow(|d| *d);
    if test_date != Date::MIN {
        return test_date;
    }
    let now = chrono::offset::Local::now();
    date_naive_to_date(&now.date_naive())
}

// UtcOffset::current_local_offset refuses to work on Linux without the
// "unsound" feature, so go through chrono's Local instead.
pub fn local_utc_offset() -> Result<UtcOffset, time::error::ComponentRange> {
    let now = chrono::offset::Local::now();
    let offset = now.offset();
    UtcOffset::from_whole_seconds(-offset.utc_minus_local())
}

// Used by both unit and integration tests
pub mod pub_testlib {
    use time::{Date, Month};

    pub fn ymd(year: i32, month: u8, day: u8) -> Date {
        Date::from_calendar_date(year, Month::try_from(month).unwrap(), day).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use time::{Date, Month};

    use super::pub_testlib::ymd;
    use super::{
        format_us_date, parse_mdy_date, parse_standard_date,
        set_todays_date_for_test,
    };

    #[test]
    fn test_parse() {
        let d = parse_standard_date("2023-01-21");
        assert_eq!(
            d.unwrap(),
            Date::from_calendar_date(2023, Month::January, 21).unwrap()
        );

        let d = parse_standard_date("2023-01-41");
        assert!(d.is_err());
    }

    #[test]
    fn test_parse_mdy_date() {
        set_todays_date_for_test(ymd(2024, 6, 1));

        assert_eq!(parse_mdy_date("02/28/05").unwrap(), ymd(2005, 2, 28));
        assert_eq!(parse_mdy_date("1/20/91").unwrap(), ymd(1991, 1, 20));
        assert_eq!(parse_mdy_date("01/20/00").unwrap(), ymd(2000, 1, 20));
        assert_eq!(parse_mdy_date("3/4/2019").unwrap(), ymd(2019, 3, 4));
        // Within 20 years ahead stays in this century
        assert_eq!(parse_mdy_date("1/1/43").unwrap(), ymd(2043, 1, 1));
        assert_eq!(parse_mdy_date("1/1/44").unwrap(), ymd(1944, 1, 1));

        assert!(parse_mdy_date("").is_err());
        assert!(parse_mdy_date("2005-02-28").is_err());
        assert!(parse_mdy_date("13/01/05").is_err());
        assert!(parse_mdy_date("02/30/05").is_err());
        assert!(parse_mdy_date("02/x8/05").is_err());
        assert!(parse_mdy_date("02/28/205").is_err());
    }

    #[test]
    fn test_format_us_date() {
        assert_eq!(format_us_date(&ymd(2005, 2, 8)), "02/08/2005");
        assert_eq!(format_us_date(&ymd(1991, 12, 20)), "12/20/1991");
    }
}
