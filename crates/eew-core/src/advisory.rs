//! The advisory entity and its Japanese presentation rendering.

use std::fmt;

use chrono::{DateTime, FixedOffset};

/// Hypocentre latitude and longitude in signed degrees.
///
/// Zero is treated as the positive hemisphere, so the equator renders as
/// north and the prime meridian as east.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { "北緯" } else { "南緯" };
        let ew = if self.lng >= 0.0 { "東経" } else { "西経" };
        write!(
            f,
            "{}{}度、{}{}度",
            ns,
            self.lat.abs(),
            ew,
            self.lng.abs()
        )
    }
}

/// Hypocentre depth in metres.
///
/// JMA publishes a very shallow hypocentre as depth 0 and specifies that EEW
/// messages must present it as 10 km, so a raw value of 0 is reinterpreted
/// as 10000 m. The sign is dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Depth(pub f64);

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut v = self.0.abs();
        if v == 0.0 {
            v = 10000.0;
        }
        write!(f, "約{}km", v / 1000.0)
    }
}

/// Forecast JMA seismic intensity range.
///
/// Raw values use `-` and `+` for the weak/strong sub-steps of intensities 5
/// and 6, and the sentinel `over` in `to` when only a lower bound is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intensity {
    pub from: String,
    pub to: String,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.to == "over" {
            write!(f, "震度{}以上", localize_intensity(&self.from))
        } else {
            write!(f, "震度{}", localize_intensity(&self.to))
        }
    }
}

fn localize_intensity(value: &str) -> String {
    value.replace('-', "弱").replace('+', "強")
}

/// A parsed EEW report.
///
/// One advisory corresponds to one telegram. Successive telegrams for the
/// same quake share `event_id` and carry an increasing `serial`.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    /// Upstream-assigned identifier of the seismic event.
    pub event_id: String,
    /// Bulletin index for this event, starting at 1.
    pub serial: i32,
    /// Origin time, or arrival time when the origin is not yet known.
    pub time: Option<DateTime<FixedOffset>>,
    /// Hypocentre region label.
    pub area_name: String,
    /// Hypocentre position, when the telegram carries one.
    pub lat_lng: Option<LatLng>,
    /// Hypocentre depth, when the telegram carries one.
    pub depth: Option<Depth>,
    /// Magnitude as given, e.g. `8.4`.
    pub magnitude: Option<String>,
    /// Forecast intensity range.
    pub intensity: Option<Intensity>,
    /// True when the telegram declares itself the final bulletin.
    pub is_last: bool,
    /// Link to the public detail page, when `event_id` encodes a timestamp.
    pub detail_url: Option<String>,
}

impl Advisory {
    fn render_time(&self) -> String {
        match self.time {
            Some(t) => t.format("%e日%H時%M分").to_string(),
            None => "不明".to_string(),
        }
    }

    fn render_lat_lng(&self) -> String {
        match self.lat_lng {
            Some(l) => l.to_string(),
            None => "経緯不明".to_string(),
        }
    }

    fn render_depth(&self) -> String {
        match self.depth {
            Some(d) => d.to_string(),
            None => "不明".to_string(),
        }
    }

    fn render_magnitude(&self) -> &str {
        match self.magnitude.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => "不明",
        }
    }

    fn render_intensity(&self) -> String {
        match &self.intensity {
            Some(i) => i.to_string(),
            None => "不明".to_string(),
        }
    }

    fn render_last(&self) -> &str {
        if self.is_last {
            " *最終報*"
        } else {
            ""
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "**緊急地震速報（予報）** 第{}報{}\n{}ごろ、地震がありました。\n震源地は{}（{}）で震源の深さは{}、地震の規模（マグニチュード）は{}、この地震による最大震度は{}と推定されます。\n{}",
            self.serial,
            self.render_last(),
            self.render_time(),
            self.area_name,
            self.render_lat_lng(),
            self.render_depth(),
            self.render_magnitude(),
            self.render_intensity(),
            self.detail_url.as_deref().unwrap_or_default(),
        )
    }
}
