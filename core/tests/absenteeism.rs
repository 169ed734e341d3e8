//! Absenteeism rates from raw attendance.

use chrono::NaiveDate;
use shortfall_core::{
    absenteeism::{calculate_absenteeism, indicator_is_set, AttendanceDay},
    config::DEFAULT_WORKING_DAYS_PER_MONTH,
    types::YearMonth,
};

fn day(worker: &str, month: u32, d: u32, absent: bool) -> AttendanceDay {
    AttendanceDay {
        worker_id: worker.into(),
        date: NaiveDate::from_ymd_opt(2024, month, d).unwrap(),
        absent,
    }
}

#[test]
fn indicator_defaults_are_not_absences() {
    assert!(!indicator_is_set("0:00"));
    assert!(!indicator_is_set("00:00"));
    assert!(!indicator_is_set(""));
    assert!(!indicator_is_set("  0:00 "));
    assert!(indicator_is_set("8:00"));
    assert!(indicator_is_set("0:30"));
}

#[test]
fn any_spelling_of_zero_is_not_an_absence() {
    for zero in ["0", "0.0", "000:00", "00:00:00", "0:00:00"] {
        assert!(!indicator_is_set(zero), "{zero:?} is a zero duration");
    }
    for set in ["1", "0:00:01", "X", "0:xx"] {
        assert!(indicator_is_set(set), "{set:?} should mark an absence");
    }
}

#[test]
fn rate_is_absences_over_fixed_denominator() {
    let mut days: Vec<AttendanceDay> = (1..=20).map(|d| day("ANA", 3, d, d <= 3)).collect();
    days.extend((1..=20).map(|d| day("ANA", 4, d, false)));
    days.extend((1..=20).map(|d| day("BRUNO", 3, d, d % 2 == 0)));

    let rates = calculate_absenteeism(&days, DEFAULT_WORKING_DAYS_PER_MONTH);

    assert_eq!(rates.len(), 3, "one rate per worker-month");
    assert_eq!(rates[0].worker_id, "ANA");
    assert_eq!(rates[0].month, YearMonth::new(2024, 3).unwrap());
    assert_eq!(rates[0].absent_days, 3);
    assert!((rates[0].rate - 3.0 / 21.0).abs() < 1e-12);

    assert_eq!(rates[1].month, YearMonth::new(2024, 4).unwrap());
    assert_eq!(rates[1].rate, 0.0, "a month with no absences still gets a zero rate");

    assert_eq!(rates[2].worker_id, "BRUNO");
    assert_eq!(rates[2].absent_days, 10);
    assert!((rates[2].rate - 10.0 / 21.0).abs() < 1e-12);
}

#[test]
fn denominator_is_configurable() {
    let days: Vec<AttendanceDay> = (1..=4).map(|d| day("ANA", 3, d, d == 1)).collect();
    let rates = calculate_absenteeism(&days, 22);
    assert!((rates[0].rate - 1.0 / 22.0).abs() < 1e-12);
}

#[test]
fn rate_is_clamped_when_absences_exceed_working_days() {
    let days: Vec<AttendanceDay> = (1..=31).map(|d| day("ANA", 3, d, true)).collect();
    let rates = calculate_absenteeism(&days, DEFAULT_WORKING_DAYS_PER_MONTH);
    assert_eq!(rates[0].absent_days, 31);
    assert_eq!(rates[0].rate, 1.0);
}

#[test]
fn no_attendance_gives_no_rates() {
    assert!(calculate_absenteeism(&[], DEFAULT_WORKING_DAYS_PER_MONTH).is_empty());
}
