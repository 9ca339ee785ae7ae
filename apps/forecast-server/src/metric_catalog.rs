//! Fixed catalog of forecast metrics stored per hourly row.
//!
//! Names are the provider's field names and are what the API accepts; columns
//! are the snake_case names in `hourly_weather_forecasts`. Only columns from
//! this table are ever interpolated into SQL.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: MetricKind,
}

const fn numeric(name: &'static str, column: &'static str) -> MetricSpec {
    MetricSpec {
        name,
        column,
        kind: MetricKind::Numeric,
    }
}

/// Identity/key columns that are never exposed as metrics.
pub const KEY_COLUMNS: [&str; 4] = ["id", "timestamp", "latitude", "longitude"];

pub const METRICS: &[MetricSpec] = &[
    numeric("cloudBase", "cloud_base"),
    numeric("cloudCeiling", "cloud_ceiling"),
    numeric("cloudCover", "cloud_cover"),
    numeric("dewPoint", "dew_point"),
    numeric("evapotranspiration", "evapotranspiration"),
    numeric("freezingRainIntensity", "freezing_rain_intensity"),
    numeric("humidity", "humidity"),
    numeric("iceAccumulation", "ice_accumulation"),
    numeric("iceAccumulationLwe", "ice_accumulation_lwe"),
    numeric("precipitationProbability", "precipitation_probability"),
    numeric("pressureSurfaceLevel", "pressure_surface_level"),
    numeric("rainAccumulation", "rain_accumulation"),
    numeric("rainAccumulationLwe", "rain_accumulation_lwe"),
    numeric("rainIntensity", "rain_intensity"),
    numeric("sleetAccumulation", "sleet_accumulation"),
    numeric("sleetAccumulationLwe", "sleet_accumulation_lwe"),
    numeric("sleetIntensity", "sleet_intensity"),
    numeric("snowAccumulation", "snow_accumulation"),
    numeric("snowAccumulationLwe", "snow_accumulation_lwe"),
    numeric("snowDepth", "snow_depth"),
    numeric("snowIntensity", "snow_intensity"),
    numeric("temperature", "temperature"),
    numeric("temperatureApparent", "temperature_apparent"),
    numeric("uvHealthConcern", "uv_health_concern"),
    numeric("uvIndex", "uv_index"),
    numeric("visibility", "visibility"),
    MetricSpec {
        name: "weatherCode",
        column: "weather_code",
        kind: MetricKind::Categorical,
    },
    numeric("windDirection", "wind_direction"),
    numeric("windGust", "wind_gust"),
    numeric("windSpeed", "wind_speed"),
];

pub const DEFAULT_SERIES_METRIC: &str = "temperature";

pub fn lookup(name: &str) -> Option<&'static MetricSpec> {
    METRICS.iter().find(|spec| spec.name == name)
}

pub fn available_metrics() -> Vec<&'static str> {
    METRICS.iter().map(|spec| spec.name).collect()
}
