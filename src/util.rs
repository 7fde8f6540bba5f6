use std::str::FromStr;

use chrono::NaiveDateTime;

// chrono <-> page token helpers.
// Postgres keeps microsecond precision, so every timestamp the service
// produces or compares is truncated to whole microseconds.

pub fn now() -> NaiveDateTime {
  truncate_micros(chrono::Utc::now().naive_utc())
}

pub fn truncate_micros(ts: NaiveDateTime) -> NaiveDateTime {
  from_micros(to_micros(ts)).unwrap_or(ts)
}

pub fn to_micros(ts: NaiveDateTime) -> i64 {
  ts.timestamp() * 1_000_000 + ts.timestamp_subsec_micros() as i64
}

pub fn from_micros(micros: i64) -> Option<NaiveDateTime> {
  let secs = micros.div_euclid(1_000_000);
  let nsecs = (micros.rem_euclid(1_000_000) * 1_000) as u32;
  NaiveDateTime::from_timestamp_opt(secs, nsecs)
}

pub fn parse_num<T: FromStr>(val: &str) -> Option<T> {
  let val = val.trim();
  if val.is_empty() {
    return None;
  }
  match T::from_str(val) {
    Ok(val) => Some(val),
    Err(_) => {
      log::debug!("Failed to parse number: {:?}", val);
      None
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_micros_round_trip_drops_nanos() {
    let ts = NaiveDateTime::from_timestamp_opt(1_600_000_000, 123_456_789).unwrap();
    let back = from_micros(to_micros(ts)).unwrap();
    assert_eq!(back.timestamp(), 1_600_000_000);
    assert_eq!(back.timestamp_subsec_nanos(), 123_456_000);
    assert_eq!(truncate_micros(ts), back);
  }

  #[test]
  fn test_parse_num() {
    assert_eq!(parse_num::<i32>(" 42 "), Some(42));
    assert_eq!(parse_num::<i32>(""), None);
    assert_eq!(parse_num::<i64>("x1"), None);
  }
}
