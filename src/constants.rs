//! Defaults shared by the config layer and the CLI.

pub const DEFAULT_CONFIG_PATH: &str = "importer.toml";
pub const DEFAULT_INPUT_PATH: &str = "storage/app/establishments.json";
pub const DEFAULT_DATABASE_PATH: &str = "storage/app/catalog.db";

pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEOCODER_USER_AGENT: &str =
    "higher-ed-import/0.1 (establishment catalog geocoding)";
/// Nominatim's usage policy allows at most one request per second.
pub const DEFAULT_GEOCODER_DELAY_MS: u64 = 1000;
pub const DEFAULT_COUNTRY: &str = "Madagascar";

/// Accreditations dated within this window of the run date are flagged recent.
pub const RECENT_ACCREDITATION_DAYS: i64 = 365;

// Environment overrides (loaded from .env when present)
pub const ENV_DATABASE_PATH: &str = "IMPORTER_DATABASE";
pub const ENV_GEOCODER_ENDPOINT: &str = "GEOCODER_ENDPOINT";
