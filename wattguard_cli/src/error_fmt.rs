//! Human-readable error descriptions and structured JSON error formatting.

use wattguard_core::error::{BuildError, GuardError};

/// Sensor initialization failed before sampling began.
fn is_sensor_init(err: &eyre::Report) -> bool {
    err.chain().any(|c| c.to_string() == "sensor init")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No sample source was provided to the monitor.\nLikely causes: The sensor backend failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_source(...).".to_string()
            }
            BuildError::MissingRelay => {
                "What happened: No relay was provided to the monitor.\nLikely causes: The relay driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the relay is created successfully and passed via with_relay(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/wattguard.toml for a sample."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML for this program ({}).\nLikely causes: Missing [pins] section, a typo in a key, or a value of the wrong type.\nHow to fix: Compare the file with etc/wattguard.toml and rerun.",
            te.message()
        );
    }

    if let Some(ge) = err.downcast_ref::<GuardError>() {
        if is_sensor_init(err) {
            return format!(
                "What happened: The power sensor did not answer during startup ({ge}).\nLikely causes: Wrong I2C bus or address, loose wiring, or no sensor power.\nHow to fix: Check [pins].sensor_i2c_bus and [pins].sensor_addr, verify wiring, then run `wattguard self-check`."
            );
        }
        return match ge {
            GuardError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            GuardError::Timeout => "What happened: Sensor read timed out.\nLikely causes: Sensor not converting, bus contention, or sensor.read_timeout_ms too low.\nHow to fix: Verify wiring and raise sensor.read_timeout_ms in the config.".to_string(),
            GuardError::HardwareFault(msg) | GuardError::Hardware(msg) => format!(
                "What happened: Relay or sensor hardware fault ({msg}).\nLikely causes: Wrong relay GPIO pin, insufficient GPIO permissions, or a failed driver.\nHow to fix: Check [pins].relay and permissions; the relay state may not match the interlock until fixed."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("replay csv") || lower.contains("replay file") {
        return format!(
            "What happened: {msg}.\nLikely causes: Missing 'voltage'/'current' headers, a non-numeric row, or no readable records.\nHow to fix: Provide a CSV with a header naming both columns, headerless device CSV, or JSON lines with voltage and current."
        );
    }

    if lower.contains("read config") {
        let cause = err
            .source()
            .map(|s| format!(" Cause: {s}"))
            .unwrap_or_default();
        return format!(
            "What happened: Could not read the config file.{cause}\nHow to fix: Pass an existing file with --config."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes: config 2, sensor init 3, relay/hardware fault 4, other 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<toml::de::Error>().is_some()
    {
        return 2;
    }
    match err.downcast_ref::<GuardError>() {
        Some(GuardError::Config(_)) => 2,
        Some(_) if is_sensor_init(err) => 3,
        Some(GuardError::HardwareFault(_) | GuardError::Hardware(_)) => 4,
        _ => 1,
    }
}

/// Stable reason tag for JSON errors.
fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        2 => "Config",
        3 => "SensorInit",
        4 => "HardwareFault",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "type": "error",
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
