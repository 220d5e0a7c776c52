#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and replay CSV parsing for the power monitor.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section except `[pins]` is optional; defaults match the stock
//!   detector tuning (40-sample history, 10-sample warm-up, α = 0.02, 3-tick latch).
//! - The replay loader reads captured `voltage,current` columns from CSV,
//!   ignoring any other columns such as the telemetry log's predictions.
//!   `load_replay_file` also accepts headerless device CSV and JSON lines.
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// BCM GPIO line driving the relay coil.
    pub relay: u8,
    /// Relay board energizes on a low level.
    #[serde(default)]
    pub relay_active_low: bool,
    #[serde(default = "default_i2c_bus")]
    pub sensor_i2c_bus: u8,
    #[serde(default = "default_sensor_addr")]
    pub sensor_addr: u16,
}

const fn default_i2c_bus() -> u8 {
    1
}

const fn default_sensor_addr() -> u16 {
    0x40
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Shunt resistance in ohms used to turn shunt voltage into current.
    pub shunt_ohms: f32,
    /// Max wait for a conversion before the read fails.
    pub read_timeout_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            shunt_ohms: 0.1,
            read_timeout_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingCfg {
    /// Pause between ticks.
    pub period_ms: u64,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self { period_ms: 1000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryCfg {
    /// Ring buffer capacity in samples.
    pub capacity: usize,
    /// Samples averaged for the short-window mean.
    pub short_window: usize,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            capacity: 40,
            short_window: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BaselineCfg {
    pub warmup_samples: u32,
    /// EMA smoothing factor in (0.0, 1.0].
    pub alpha: f32,
}

impl Default for BaselineCfg {
    fn default() -> Self {
        Self {
            warmup_samples: 10,
            alpha: 0.02,
        }
    }
}

/// Relative/absolute threshold pair for one metric.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MetricThreshold {
    /// Fraction of the baseline, e.g. 0.05 for 5 %.
    pub rel_pct: f32,
    /// Absolute floor in the metric's unit.
    pub min_abs: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectorCfg {
    /// Consecutive candidate ticks required to latch.
    pub consecutive: u32,
    /// Detection armed at boot.
    pub armed: bool,
    pub current: MetricThreshold,
    pub power: MetricThreshold,
    pub voltage: MetricThreshold,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            consecutive: 3,
            armed: true,
            current: MetricThreshold {
                rel_pct: 0.05,
                min_abs: 0.0003,
            },
            power: MetricThreshold {
                rel_pct: 0.06,
                min_abs: 0.0008,
            },
            voltage: MetricThreshold {
                rel_pct: 0.01,
                min_abs: 0.01,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommandsCfg {
    /// Longest command line kept; excess characters are dropped.
    pub max_line_len: usize,
}

impl Default for CommandsCfg {
    fn default() -> Self {
        Self { max_line_len: 160 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PredictionCfg {
    /// Bound of the uniform jitter applied to predicted values (fraction).
    pub jitter_pct: f32,
    /// Horizon of the energy projection in seconds.
    pub horizon_s: u64,
    /// Fixed RNG seed; random when absent.
    pub seed: Option<u64>,
}

impl Default for PredictionCfg {
    fn default() -> Self {
        Self {
            jitter_pct: 0.02,
            horizon_s: 3600,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayCfg {
    /// Relay commanded on at boot.
    pub default_on: bool,
}

impl Default for RelayCfg {
    fn default() -> Self {
        Self { default_on: true }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub sampling: SamplingCfg,
    #[serde(default)]
    pub history: HistoryCfg,
    #[serde(default)]
    pub baseline: BaselineCfg,
    #[serde(default)]
    pub detector: DetectorCfg,
    #[serde(default)]
    pub commands: CommandsCfg,
    #[serde(default)]
    pub prediction: PredictionCfg,
    #[serde(default)]
    pub relay: RelayCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn validate_threshold(name: &str, t: &MetricThreshold) -> eyre::Result<()> {
    if !(t.rel_pct.is_finite() && t.rel_pct >= 0.0) {
        eyre::bail!("detector.{name}.rel_pct must be a finite value >= 0.0");
    }
    if !(t.min_abs.is_finite() && t.min_abs > 0.0) {
        eyre::bail!("detector.{name}.min_abs must be > 0.0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if !(self.sensor.shunt_ohms.is_finite() && self.sensor.shunt_ohms > 0.0) {
            eyre::bail!("sensor.shunt_ohms must be > 0.0");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if self.pins.sensor_addr > 0x7F {
            eyre::bail!("pins.sensor_addr must be a 7-bit I2C address");
        }

        // Sampling
        if self.sampling.period_ms == 0 {
            eyre::bail!("sampling.period_ms must be >= 1");
        }
        if self.sampling.period_ms > 60 * 60 * 1000 {
            eyre::bail!("sampling.period_ms is unreasonably large (>1h)");
        }

        // History
        if self.history.capacity == 0 {
            eyre::bail!("history.capacity must be >= 1");
        }
        if self.history.short_window == 0 {
            eyre::bail!("history.short_window must be >= 1");
        }
        if self.history.short_window > self.history.capacity {
            eyre::bail!("history.short_window must not exceed history.capacity");
        }

        // Baseline
        if self.baseline.warmup_samples == 0 {
            eyre::bail!("baseline.warmup_samples must be >= 1");
        }
        if !(self.baseline.alpha > 0.0 && self.baseline.alpha <= 1.0) {
            eyre::bail!("baseline.alpha must be in (0.0, 1.0]");
        }

        // Detector
        if self.detector.consecutive == 0 {
            eyre::bail!("detector.consecutive must be >= 1");
        }
        validate_threshold("current", &self.detector.current)?;
        validate_threshold("power", &self.detector.power)?;
        validate_threshold("voltage", &self.detector.voltage)?;

        // Commands
        if self.commands.max_line_len == 0 {
            eyre::bail!("commands.max_line_len must be >= 1");
        }

        // Prediction
        if !(0.0..=1.0).contains(&self.prediction.jitter_pct) {
            eyre::bail!("prediction.jitter_pct must be in [0.0, 1.0]");
        }

        Ok(())
    }
}

/// One replayed measurement. Other CSV columns are ignored.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ReplayRow {
    pub voltage: f32,
    pub current: f32,
}

/// Load `voltage,current` rows from a CSV with a header line.
///
/// The header must name both columns; additional columns (timestamp, power,
/// predictions, relay state...) are allowed so a captured telemetry log can be
/// fed back in directly.
pub fn load_replay_csv(path: &std::path::Path) -> eyre::Result<Vec<ReplayRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|e| eyre::eyre!("open replay CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    for required in ["voltage", "current"] {
        if !headers.iter().any(|h| h == required) {
            eyre::bail!(
                "replay CSV must have 'voltage' and 'current' headers, got: {}",
                headers.iter().collect::<Vec<_>>().join(",")
            );
        }
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ReplayRow>().enumerate() {
        match rec {
            Ok(row) if row.voltage.is_finite() && row.current.is_finite() => rows.push(row),
            Ok(_) => eyre::bail!("invalid CSV row {}: non-finite value", idx + 2),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    if rows.is_empty() {
        eyre::bail!("replay CSV {:?} has no data rows", path);
    }
    Ok(rows)
}

fn number(s: &str) -> Option<f32> {
    s.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
}

fn row(voltage: f32, current: f32) -> ReplayRow {
    ReplayRow { voltage, current }
}

/// One headerless device line.
///
/// Six or more fields are `ts,voltage,current,power,pred_current,pred_power`;
/// four fields are `voltage,current,power,pred_current`. Otherwise the first
/// two of at least three numeric fields are taken.
fn parse_device_line(line: &str) -> Option<ReplayRow> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return None;
    }
    if parts.len() >= 6 {
        if let (Some(v), Some(i)) = (number(parts[1]), number(parts[2])) {
            return Some(row(v, i));
        }
    }
    if parts.len() == 4 && parts[..3].iter().all(|p| number(p).is_some()) {
        return Some(row(number(parts[0])?, number(parts[1])?));
    }
    let nums: Vec<f32> = parts.iter().filter_map(|p| number(p)).collect();
    (nums.len() >= 3).then(|| row(nums[0], nums[1]))
}

/// One `{...}` record. Keys are matched case-insensitively; objects without
/// both `voltage` and `current` (summaries, responses) yield `None`.
fn parse_json_line(line: &str) -> Option<ReplayRow> {
    let lookup = |fields: &[(String, String)], key: &str| {
        fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| number(v))
    };
    let fields: Vec<(String, String)> = match serde_json::from_str::<serde_json::Value>(line) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k.trim().to_string(), v)
            })
            .collect(),
        Ok(_) => return None,
        // Loose `{voltage: 12.0, current: 0.5}` from serial firmware.
        Err(_) => line
            .trim_matches(|c: char| c == '{' || c == '}' || c.is_whitespace())
            .split(',')
            .filter_map(|kv| kv.split_once(':'))
            .map(|(k, v)| {
                (
                    k.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
                    v.trim().to_string(),
                )
            })
            .collect(),
    };
    Some(row(lookup(&fields, "voltage")?, lookup(&fields, "current")?))
}

/// Load replay readings, picking the format from the first data line.
///
/// - a line starting with `{`: JSON lines, such as the monitor's own `--json`
///   output (non-sample records are skipped)
/// - a line with no numeric field: a CSV header, handled by `load_replay_csv`
/// - otherwise: headerless device CSV; lines that do not parse are skipped
///
/// Blank lines and lines starting with `#` are ignored.
pub fn load_replay_file(path: &std::path::Path) -> eyre::Result<Vec<ReplayRow>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("open replay file {:?}: {}", path, e))?;
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .peekable();

    let first = lines.peek().copied();
    let rows: Vec<ReplayRow> = match first {
        Some(l) if l.starts_with('{') => lines.filter_map(parse_json_line).collect(),
        Some(l) if l.split(',').all(|t| number(t).is_none()) => {
            return load_replay_csv(path);
        }
        _ => lines.filter_map(parse_device_line).collect(),
    };
    if rows.is_empty() {
        eyre::bail!("replay file {:?} has no readable rows", path);
    }
    Ok(rows)
}
