//! EEW XML extraction.
//!
//! Telegrams are JMA `Report` documents. The walker below tracks the element
//! path by local name, so namespace prefixes such as `jmx_eb:` do not matter,
//! and only the first occurrence of each field is captured.

use chrono::{DateTime, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use crate::advisory::{Advisory, Depth, Intensity, LatLng};
use crate::error::AdvisoryError;

/// Verbatim phrase announcing the final bulletin of an event.
const FINAL_NOTICE: &str = "この情報をもって、緊急地震速報：最終報とします。";

#[derive(Debug, Default)]
struct RawReport {
    event_id: Option<String>,
    serial: Option<String>,
    origin_time: Option<String>,
    arrival_time: Option<String>,
    area_name: Option<String>,
    coordinate: Option<String>,
    magnitude: Option<String>,
    intensity_from: Option<String>,
    intensity_to: Option<String>,
    next_advisory: Option<String>,
}

impl RawReport {
    fn capture(&mut self, path: &[String], text: String) {
        let slot = if at(path, &["Head", "EventID"]) {
            &mut self.event_id
        } else if at(path, &["Head", "Serial"]) {
            &mut self.serial
        } else if at(path, &["Earthquake", "OriginTime"]) {
            &mut self.origin_time
        } else if at(path, &["Earthquake", "ArrivalTime"]) {
            &mut self.arrival_time
        } else if at(path, &["Earthquake", "Hypocenter", "Area", "Name"]) {
            &mut self.area_name
        } else if at(path, &["Hypocenter", "Area", "Coordinate"]) {
            &mut self.coordinate
        } else if at(path, &["Earthquake", "Magnitude"]) {
            &mut self.magnitude
        } else if at(path, &["Forecast", "ForecastInt", "From"]) {
            &mut self.intensity_from
        } else if at(path, &["Forecast", "ForecastInt", "To"]) {
            &mut self.intensity_to
        } else if at(path, &["Body", "NextAdvisory"]) {
            &mut self.next_advisory
        } else {
            return;
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }
}

fn at(path: &[String], tail: &[&str]) -> bool {
    path.len() >= tail.len()
        && path[path.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(a, b)| a == b)
}

impl Advisory {
    /// Parse an EEW telegram.
    ///
    /// A missing body element leaves its field absent; a malformed timestamp
    /// fails the whole telegram. A malformed coordinate string is logged and
    /// treated as absent.
    pub fn from_xml(bytes: &[u8]) -> Result<Self, AdvisoryError> {
        let raw = walk(bytes)?;

        let event_id = raw.event_id.unwrap_or_default();

        let serial = match raw.serial.as_deref() {
            Some(s) => s.parse().unwrap_or_else(|_| {
                warn!(serial = %s, "Failed to parse serial");
                0
            }),
            None => 0,
        };

        let time = match raw.origin_time.or(raw.arrival_time) {
            Some(value) => Some(DateTime::parse_from_rfc3339(&value).map_err(|source| {
                AdvisoryError::Time { value, source }
            })?),
            None => None,
        };

        let (lat_lng, depth) = match raw.coordinate.as_deref() {
            Some(coordinate) => parse_coordinate(coordinate).unwrap_or_else(|err| {
                warn!(%coordinate, error = %err, "Failed to parse coordinate");
                (None, None)
            }),
            None => (None, None),
        };

        let intensity = match (raw.intensity_from, raw.intensity_to) {
            (Some(from), Some(to)) => Some(Intensity { from, to }),
            _ => None,
        };

        let is_last = raw.next_advisory.as_deref() == Some(FINAL_NOTICE);

        let detail_url = NaiveDateTime::parse_from_str(&event_id, "%Y%m%d%H%M%S")
            .ok()
            .map(|t| {
                format!(
                    "https://earthquake.tenki.jp/bousai/earthquake/detail/{}.html",
                    t.format("%Y/%m/%d/%Y-%m-%d-%H-%M-%S")
                )
            });

        Ok(Advisory {
            event_id,
            serial,
            time,
            area_name: raw.area_name.unwrap_or_else(|| "不明".to_string()),
            lat_lng,
            depth,
            magnitude: raw.magnitude,
            intensity,
            is_last,
            detail_url,
        })
    }
}

fn walk(bytes: &[u8]) -> Result<RawReport, AdvisoryError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut raw = RawReport::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(quick_xml::Error::from)?
                    .trim()
                    .to_string();
                if !text.is_empty() {
                    raw.capture(&path, text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(raw)
}

/// Parse a JMA coordinate string such as `+38.1+142.9-10000/`.
///
/// Every `+` or `-` after the first character starts a new token and `/`
/// ends the list. The tokens are latitude, longitude and an optional depth
/// in metres; an empty list is valid and means the position is unknown.
pub fn parse_coordinate(
    coordinate: &str,
) -> Result<(Option<LatLng>, Option<Depth>), AdvisoryError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    for (i, c) in coordinate.chars().enumerate() {
        match c {
            '/' => {
                tokens.push(current);
                current = String::new();
                break;
            }
            '+' | '-' => {
                if i != 0 {
                    tokens.push(std::mem::take(&mut current));
                }
                current.push(c);
            }
            _ => current.push(c),
        }
    }

    if tokens.is_empty() || tokens[0].is_empty() {
        return Ok((None, None));
    }

    let lat = parse_token(&tokens[0])?;
    let lng = parse_token(tokens.get(1).map(String::as_str).unwrap_or_default())?;
    let depth = match tokens.get(2) {
        Some(token) => Some(Depth(parse_token(token)?)),
        None => None,
    };

    Ok((Some(LatLng { lat, lng }), depth))
}

fn parse_token(token: &str) -> Result<f64, AdvisoryError> {
    token.parse().map_err(|_| AdvisoryError::Coordinate {
        value: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn coordinate_with_depth() {
        let (lat_lng, depth) = parse_coordinate("+38.1+142.9-10000/").unwrap();
        assert_eq!(lat_lng, Some(LatLng { lat: 38.1, lng: 142.9 }));
        assert_eq!(depth, Some(Depth(-10000.0)));
    }

    #[test]
    fn coordinate_without_depth() {
        let (lat_lng, depth) = parse_coordinate("+38.1+142.9/").unwrap();
        assert_eq!(lat_lng, Some(LatLng { lat: 38.1, lng: 142.9 }));
        assert_eq!(depth, None);
    }

    #[test]
    fn coordinate_empty_list() {
        let (lat_lng, depth) = parse_coordinate("/").unwrap();
        assert_eq!(lat_lng, None);
        assert_eq!(depth, None);
    }

    #[test]
    fn coordinate_southern_hemisphere() {
        let (lat_lng, _) = parse_coordinate("-12.5-45.0/").unwrap();
        assert_eq!(lat_lng, Some(LatLng { lat: -12.5, lng: -45.0 }));
    }

    #[test]
    fn coordinate_garbage_is_an_error() {
        assert!(parse_coordinate("+abc+142.9/").is_err());
    }

    proptest! {
        #[test]
        fn coordinate_round_trip(
            lat in -90.0f64..90.0,
            lng in -180.0f64..180.0,
            depth in -700_000i64..0,
        ) {
            let lat = (lat * 10.0).round() / 10.0;
            let lng = (lng * 10.0).round() / 10.0;
            let raw = format!("{:+}{:+}{:+}/", lat, lng, depth);
            let (lat_lng, parsed_depth) = parse_coordinate(&raw).unwrap();
            let lat_lng = lat_lng.unwrap();
            prop_assert_eq!(lat_lng.lat, lat);
            prop_assert_eq!(lat_lng.lng, lng);
            prop_assert_eq!(parsed_depth, Some(Depth(depth as f64)));
        }

        #[test]
        fn coordinate_two_values(
            lat in -90.0f64..90.0,
            lng in -180.0f64..180.0,
        ) {
            let lat = (lat * 10.0).round() / 10.0;
            let lng = (lng * 10.0).round() / 10.0;
            let raw = format!("{:+}{:+}/", lat, lng);
            let (lat_lng, parsed_depth) = parse_coordinate(&raw).unwrap();
            prop_assert!(lat_lng.is_some());
            prop_assert_eq!(parsed_depth, None);
        }
    }
}
