//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use gamalog_core::GamalogError;
    use gamalog_image::ImageError;

    // Typed matches first
    if let Some(ie) = err.downcast_ref::<ImageError>() {
        return match ie {
            ImageError::ToolMissing(tool) => format!(
                "What happened: The image toolset is not installed ({tool} not found).\nLikely causes: mtools is missing, or image.mtype / image.mcopy point to the wrong binary.\nHow to fix: Install mtools (e.g., `apt install mtools`) or fix the [image] tool paths in the config."
            ),
            ImageError::Timeout { tool, after_ms } => format!(
                "What happened: {tool} did not finish within {after_ms} ms.\nLikely causes: The image is busy or on slow storage, or image.timeout_ms is too low.\nHow to fix: Check the storage backing the image and consider raising image.timeout_ms."
            ),
            ImageError::Tool { tool, stderr, .. } => format!(
                "What happened: {tool} could not access the image ({}).\nLikely causes: Wrong image.path, an image that is not FAT formatted, or missing permissions.\nHow to fix: Verify image.path and that the process can read and write the image file.",
                stderr.trim()
            ),
            ImageError::Io(io) => format!(
                "What happened: Image access failed ({io}).\nLikely causes: The image file is missing or unreadable.\nHow to fix: Verify image.path in the config and the file permissions."
            ),
            ImageError::Simulated { .. } => format!("What happened: {ie}."),
        };
    }

    if let Some(ge) = err.downcast_ref::<GamalogError>() {
        return match ge {
            GamalogError::MissingFile(name) => format!(
                "What happened: {name} is not present in the image.\nLikely causes: The machine has not written its log yet, or image.log_file is misspelled.\nHow to fix: Check the file name with `mdir -i <image> ::` and fix image.log_file."
            ),
            GamalogError::NoRecords(name) => format!(
                "What happened: {name} has no data records to continue from.\nLikely causes: The log holds only its header.\nHow to fix: Append at least one record before running the simulator."
            ),
            GamalogError::ToolMissing(tool) => format!(
                "What happened: The image toolset is not installed ({tool} not found).\nLikely causes: mtools is missing, or image.mtype / image.mcopy point to the wrong binary.\nHow to fix: Install mtools (e.g., `apt install mtools`) or fix the [image] tool paths in the config."
            ),
            GamalogError::Image(msg) => format!(
                "What happened: Image access failed ({msg}).\nLikely causes: mtools is missing, image.path is wrong, or the image is not FAT formatted.\nHow to fix: Run `gamalog self-check` to check the toolset and the image."
            ),
            GamalogError::Timeout => "What happened: Timed out waiting for the image toolset.\nLikely causes: The image is busy or image.timeout_ms is too low.\nHow to fix: Raise image.timeout_ms and retry.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: Could not read the config file ({}).\nLikely causes: Wrong --config path.\nHow to fix: Pass --config with an existing TOML file (see etc/gamalog.toml).",
            err.root_cause()
        );
    }

    if lower.starts_with("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for this program.\nLikely causes: {}\nHow to fix: Fix the reported key in the TOML and try again.",
            err.root_cause()
        );
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid ({}).\nLikely causes: Out-of-range or empty values in the TOML.\nHow to fix: Edit the config file, then rerun.",
            err.root_cause()
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable short name for an error, used as the JSON `reason`.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    use gamalog_core::GamalogError;
    use gamalog_image::ImageError;

    if let Some(ie) = err.downcast_ref::<ImageError>() {
        return match ie {
            ImageError::ToolMissing(_) => "ToolMissing",
            ImageError::Timeout { .. } => "Timeout",
            _ => "ImageError",
        };
    }
    if let Some(ge) = err.downcast_ref::<GamalogError>() {
        return match ge {
            GamalogError::MissingFile(_) => "MissingFile",
            GamalogError::NoRecords(_) => "NoRecords",
            GamalogError::Timeout => "Timeout",
            GamalogError::ToolMissing(_) => "ToolMissing",
            GamalogError::Image(_) => "ImageError",
            _ => "Error",
        };
    }
    let lower = err.to_string().to_ascii_lowercase();
    if lower.contains("config") {
        return "Config";
    }
    "Error"
}

/// Exit code for errors that escape a command: 4 when the image toolset is
/// missing, 5 when it timed out, 1 otherwise. Failed rotations do not come
/// through here; `main` maps them to 3 directly.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "ToolMissing" => 4,
        "Timeout" => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
