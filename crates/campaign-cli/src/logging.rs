use std::io::Write;

const RUN_TAG_LEN: usize = 8;

/// Initialise env_logger. `RUST_LOG` wins over the `--debug` flag when set.
///
/// Pipeline lines carry a `[run_id]` prefix; it is lifted into a short
/// `run=` column so interleaved output from one run can be grepped.
pub fn init_logging(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            let message = record.args().to_string();
            writeln!(
                buf,
                "{}",
                format_line(
                    &chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                    record.level(),
                    record.target(),
                    &message,
                )
            )
        })
        .init();
}

fn format_line(timestamp: &str, level: log::Level, target: &str, message: &str) -> String {
    let component = target.strip_prefix("campaign_").unwrap_or(target);
    match split_run_id(message) {
        Some((run_id, rest)) => {
            let tag: String = run_id.chars().take(RUN_TAG_LEN).collect();
            format!("[{timestamp}] {level:<5} [{component}] run={tag} - {rest}")
        }
        None => format!("[{timestamp}] {level:<5} [{component}] - {message}"),
    }
}

fn split_run_id(message: &str) -> Option<(&str, &str)> {
    let inner = message.strip_prefix('[')?;
    let (run_id, rest) = inner.split_once(']')?;
    if run_id.is_empty() || run_id.contains(char::is_whitespace) {
        return None;
    }
    Some((run_id, rest.trim_start()))
}
