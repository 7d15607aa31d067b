//! UTC date parsing and formatting.
//!
//! Credentials and identity providers carry timestamps in whichever format the
//! backing store wrote them:
//!
//! - LDAP generalized time: `20161219072029Z`
//! - Server response format: `2016-12-19T07:20:29.000+0530`
//! - RFC 3339: `9999-01-10T08:02:47.806-05:00`
//!
//! Request dates arrive either in the SigV4 basic format (`20130524T000000Z`)
//! or, for SigV2, as an RFC 2822 `Date` header.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{RustStackError, RustStackResult};

const LDAP_DATE_FORMAT: &str = "%Y%m%d%H%M%SZ";
const SERVER_RESPONSE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";
const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// The current UTC time.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a stored timestamp (LDAP, server response, or RFC 3339) as UTC.
///
/// # Errors
///
/// Returns [`RustStackError::InvalidDate`] if none of the formats match.
///
/// # Examples
///
/// ```
/// use ruststack_core::dates::parse_timestamp;
///
/// let ldap = parse_timestamp("20161219072029Z").unwrap();
/// let offset = parse_timestamp("2016-12-19T12:50:29.000+0530").unwrap();
/// assert_eq!(ldap, offset);
/// ```
pub fn parse_timestamp(value: &str) -> RustStackResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, LDAP_DATE_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, SERVER_RESPONSE_DATE_FORMAT) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(RustStackError::InvalidDate(value.to_owned()))
}

/// Parse a request date: `x-amz-date` basic format or an RFC 2822 `Date` header.
///
/// # Errors
///
/// Returns [`RustStackError::InvalidDate`] if the value is empty or unparsable.
pub fn parse_request_date(value: &str) -> RustStackResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, AMZ_DATE_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(RustStackError::InvalidDate(value.to_owned()))
}

/// Format a time as LDAP generalized time (`yyyyMMddHHmmssZ`).
#[must_use]
pub fn to_ldap_date(time: &DateTime<Utc>) -> String {
    time.format(LDAP_DATE_FORMAT).to_string()
}

/// Format a time in the server response format (`yyyy-MM-ddTHH:mm:ss.SSS+0000`).
#[must_use]
pub fn to_server_response_format(time: &DateTime<Utc>) -> String {
    time.format(SERVER_RESPONSE_DATE_FORMAT).to_string()
}

/// Format a time as the SigV4 basic format (`yyyyMMddTHHmmssZ`).
#[must_use]
pub fn to_amz_date(time: &DateTime<Utc>) -> String {
    time.format(AMZ_DATE_FORMAT).to_string()
}

/// Format a time as RFC 3339 with millisecond precision.
#[must_use]
pub fn to_rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
