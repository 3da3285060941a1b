use crate::udbc::value::Value;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mysql_async::Value as MyValue;

pub fn from_mysql_value(v: &MyValue) -> Value {
    match v {
        MyValue::NULL => Value::Null,
        MyValue::Int(i) => Value::I64(*i),
        MyValue::UInt(u) => i64::try_from(*u).map_or(Value::U64(*u), Value::I64),
        MyValue::Float(f) => Value::F64(*f as f64),
        MyValue::Double(d) => Value::F64(*d),
        MyValue::Bytes(b) => Value::Bytes(b.clone()),
        MyValue::Date(y, m, d, h, min, s, micro) => {
            let Some(date) = NaiveDate::from_ymd_opt(*y as i32, *m as u32, *d as u32) else {
                // zero dates such as 0000-00-00 have no calendar equivalent
                return Value::Str(format!("{:04}-{:02}-{:02}", y, m, d));
            };
            if *h == 0 && *min == 0 && *s == 0 && *micro == 0 {
                return Value::Date(date);
            }
            match date.and_hms_micro_opt(*h as u32, *min as u32, *s as u32, *micro) {
                Some(dt) => Value::DateTime(dt),
                None => Value::Date(date),
            }
        }
        MyValue::Time(is_neg, days, h, min, s, micro) => {
            let total_h = *days * 24 + (*h as u32);
            match NaiveTime::from_hms_micro_opt(total_h, *min as u32, *s as u32, *micro) {
                Some(t) if !*is_neg => Value::Time(t),
                _ => Value::Str(format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    if *is_neg { "-" } else { "" },
                    total_h,
                    min,
                    s,
                    micro
                )),
            }
        }
    }
}

pub fn to_mysql_value(v: &Value) -> MyValue {
    match v {
        Value::Null => MyValue::NULL,
        Value::Bool(b) => MyValue::Int(i64::from(*b)),
        Value::I16(i) => MyValue::Int(*i as i64),
        Value::I32(i) => MyValue::Int(*i as i64),
        Value::I64(i) => MyValue::Int(*i),
        Value::U8(u) => MyValue::UInt(*u as u64),
        Value::U64(u) => MyValue::UInt(*u),
        Value::F64(f) => MyValue::Double(*f),
        Value::Str(s) => MyValue::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => MyValue::Bytes(b.clone()),
        Value::Date(d) => MyValue::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        Value::Time(t) => MyValue::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1000,
        ),
        Value::DateTime(dt) => datetime(dt),
        Value::DateTimeUtc(dt) => datetime(&dt.naive_utc()),
        Value::Decimal(d) => MyValue::Bytes(d.to_string().into_bytes()),
    }
}

fn datetime(dt: &NaiveDateTime) -> MyValue {
    MyValue::Date(
        dt.date().year() as u16,
        dt.date().month() as u8,
        dt.date().day() as u8,
        dt.time().hour() as u8,
        dt.time().minute() as u8,
        dt.time().second() as u8,
        dt.and_utc().timestamp_subsec_micros(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_date_does_not_panic() {
        let v = from_mysql_value(&MyValue::Date(0, 0, 0, 0, 0, 0, 0));
        assert_eq!(v, Value::Str("0000-00-00".into()));
    }

    #[test]
    fn test_unsigned_bigint_keeps_its_value() {
        assert_eq!(from_mysql_value(&MyValue::UInt(42)), Value::I64(42));
        assert_eq!(from_mysql_value(&MyValue::UInt(u64::MAX)), Value::U64(u64::MAX));
        assert_eq!(to_mysql_value(&Value::U64(u64::MAX)), MyValue::UInt(u64::MAX));
    }

    #[test]
    fn test_datetime_value() {
        let v = from_mysql_value(&MyValue::Date(2024, 2, 29, 13, 5, 9, 0));
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        assert_eq!(v, Value::DateTime(expected));
        assert_eq!(to_mysql_value(&v), MyValue::Date(2024, 2, 29, 13, 5, 9, 0));
    }
}
