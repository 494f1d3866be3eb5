//! JSONL audit logging for invoked actions.
//!
//! Every action the resolver invokes is logged as a single line in
//! `{app_config_dir}/action-logs/YYYY-MM-DD.jsonl`. Best-effort; never
//! panics or fails the caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct InvocationAuditEntry<'a> {
    ts: u64,
    strategy: &'a str,
    action_id: &'a str,
    args: &'a [Value],
    ok: bool,
    message: &'a str,
    duration_ms: u64,
}

/// Log a single action invocation to today's JSONL audit file.
pub fn log_invocation(
    app_config_dir: &Path,
    strategy: &str,
    action_id: &str,
    args: &[Value],
    result: Result<&str, &str>,
    duration: Duration,
) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let (ok, message) = match result {
        Ok(msg) => (true, msg),
        Err(e) => (false, e),
    };

    let entry = InvocationAuditEntry {
        ts: now,
        strategy,
        action_id,
        args,
        ok,
        message,
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    };

    let dir = crate::paths::action_logs_dir(app_config_dir);
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let path = dir.join(format!("{}.jsonl", date_from_epoch(now)));
    let Ok(line) = serde_json::to_string(&entry) else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{line}");
    }
}

/// Convert seconds since the Unix epoch to a `YYYY-MM-DD` UTC date string.
fn date_from_epoch(secs: u64) -> String {
    let days = i64::try_from(secs / 86_400).unwrap_or(0);
    // Civil-from-days (Howard Hinnant's algorithm).
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!("{y:04}-{m:02}-{d:02}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_epoch() {
        // 2025-02-24 00:00:00 UTC = 1740355200
        assert_eq!(date_from_epoch(1_740_355_200), "2025-02-24");
        assert_eq!(date_from_epoch(0), "1970-01-01");
        // 2000-01-01 00:00:00 UTC = 946684800
        assert_eq!(date_from_epoch(946_684_800), "2000-01-01");
        assert_eq!(date_from_epoch(1_740_355_200 + 86399), "2025-02-24");
    }

    #[test]
    fn test_log_invocation_appends_lines() {
        let dir = std::env::temp_dir().join("actionmap_test_audit");
        let _ = fs::remove_dir_all(&dir);

        for id in ["action_0", "action_1"] {
            log_invocation(
                &dir,
                "remote",
                id,
                &[Value::from("hello")],
                Ok("executed"),
                Duration::from_millis(3),
            );
        }

        let logs = crate::paths::action_logs_dir(&dir);
        let file = fs::read_dir(&logs).unwrap().next().unwrap().unwrap().path();
        let content = fs::read_to_string(file).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["action_id"], "action_1");
        assert_eq!(lines[0]["args"][0], "hello");
        assert_eq!(lines[0]["ok"], true);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_log_to_unwritable_dir_does_not_panic() {
        let bogus = Path::new("/proc/actionmap-test-nonexistent");
        log_invocation(bogus, "local", "x", &[], Err("failed"), Duration::ZERO);
    }
}
