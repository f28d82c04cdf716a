use chrono::{DateTime, Utc};
use chrono_tz::{Tz, TZ_VARIANTS};

/// Identifier used when a request names no timezone.
pub const DEFAULT_TIMEZONE: &str = "UTC";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Ordered list of every timezone identifier known to the bundled tz
/// database. The order is the database's own and is never re-sorted.
#[derive(Debug, Clone)]
pub struct TimezoneCatalog {
    names: Vec<&'static str>,
}

impl TimezoneCatalog {
    pub fn load() -> Self {
        Self {
            names: TZ_VARIANTS.iter().map(|tz| tz.name()).collect(),
        }
    }

    pub fn from_names(names: Vec<&'static str>) -> Self {
        Self { names }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Looks `name` up exactly first, then ignoring ASCII case, so that
/// `america/new_york` finds `America/New_York`.
pub fn resolve(name: &str) -> Option<Tz> {
    name.parse::<Tz>()
        .ok()
        .or_else(|| Tz::from_str_insensitive(name).ok())
}

/// Wall-clock rendering of `instant` in `tz`, e.g. `2024-01-01 00:00:00`.
pub fn format_in(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(TIME_FORMAT).to_string()
}
