use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike, Utc};

// Iran has observed a fixed UTC+03:30 since daylight saving was abolished in 2022.
const TEHRAN_OFFSET_SECS: i32 = 3 * 3600 + 30 * 60;

const SOLAR_HIJRI_MONTHS: [&str; 12] = [
    "فروردین",
    "اردیبهشت",
    "خرداد",
    "تیر",
    "مرداد",
    "شهریور",
    "مهر",
    "آبان",
    "آذر",
    "دی",
    "بهمن",
    "اسفند",
];

pub fn to_tehran(now_utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(TEHRAN_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    now_utc.with_timezone(&offset)
}

/// Converts a Gregorian date to (year, month, day) in the Solar Hijri calendar.
pub fn to_solar_hijri(date: NaiveDate) -> (i32, u32, u32) {
    const CUMULATIVE_DAYS: [i32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

    let gy = date.year();
    let gm = date.month() as usize;
    let gd = date.day() as i32;

    let gy2 = if gm > 2 { gy + 1 } else { gy };
    let mut days = 355_666 + 365 * gy + (gy2 + 3) / 4 - (gy2 + 99) / 100
        + (gy2 + 399) / 400
        + gd
        + CUMULATIVE_DAYS[gm - 1];

    let mut jy = -1595 + 33 * (days / 12_053);
    days %= 12_053;
    jy += 4 * (days / 1461);
    days %= 1461;
    if days > 365 {
        jy += (days - 1) / 365;
        days = (days - 1) % 365;
    }

    let (jm, jd) = if days < 186 {
        (1 + days / 31, 1 + days % 31)
    } else {
        (7 + (days - 186) / 30, 1 + (days - 186) % 30)
    };
    (jy, jm as u32, jd as u32)
}

pub fn to_persian_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_u32('۰' as u32 + d).unwrap_or(c),
            None => c,
        })
        .collect()
}

/// "Last update" label as the dashboard shows it, e.g. `۲۴ مهر ۱۴۰۵ | ۲۱:۳۰`.
pub fn update_label(fetched_at: DateTime<Utc>) -> String {
    let local = to_tehran(fetched_at);
    let (year, month, day) = to_solar_hijri(local.date_naive());
    let month_name = SOLAR_HIJRI_MONTHS[(month as usize - 1).min(11)];
    let label = format!(
        "{day} {month_name} {year} | {:02}:{:02}",
        local.hour(),
        local.minute()
    );
    to_persian_digits(&label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn converts_known_dates() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(to_solar_hijri(d(2024, 3, 20)), (1403, 1, 1));
        assert_eq!(to_solar_hijri(d(2024, 3, 19)), (1402, 12, 29));
        assert_eq!(to_solar_hijri(d(2025, 3, 20)), (1403, 12, 30));
        assert_eq!(to_solar_hijri(d(2026, 10, 16)), (1405, 7, 24));
    }

    #[test]
    fn label_uses_tehran_wall_clock() {
        // 18:00 UTC is 21:30 in Tehran, same calendar day.
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 18, 0, 0).unwrap();
        assert_eq!(update_label(at), "۲۴ مهر ۱۴۰۵ | ۲۱:۳۰");
    }

    #[test]
    fn label_rolls_over_to_next_local_day() {
        // 21:00 UTC is 00:30 the next day in Tehran.
        let at = Utc.with_ymd_and_hms(2024, 3, 19, 21, 0, 0).unwrap();
        assert_eq!(update_label(at), "۱ فروردین ۱۴۰۳ | ۰۰:۳۰");
    }

    #[test]
    fn persian_digits_leave_other_characters() {
        assert_eq!(to_persian_digits("12:05 | x"), "۱۲:۰۵ | x");
    }
}
