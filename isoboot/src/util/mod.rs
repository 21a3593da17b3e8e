use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a subscriber that writes to stderr and to `file_writer`.
pub fn register_to_tracing(file_writer: NonBlocking, env_filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .try_init();
}

/// User and group that launched isoboot, looking through sudo.
///
/// `None` when the invoker is root, since there is nobody to hand
/// ownership to.
pub fn invoking_user() -> Option<(u32, u32)> {
    let from_env = |name: &str| std::env::var(name).ok()?.parse::<u32>().ok();

    if let (Some(uid), Some(gid)) = (from_env("SUDO_UID"), from_env("SUDO_GID")) {
        return (uid != 0).then_some((uid, gid));
    }

    let uid = nix::unistd::getuid();
    if uid.is_root() {
        return None;
    }
    Some((uid.as_raw(), nix::unistd::getgid().as_raw()))
}

/// Binary size with one decimal, e.g. `14.6 GiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(8 * 1024 * 1024 * 1024), "8.0 GiB");
        assert_eq!(human_size(15_728_640_000), "14.6 GiB");
    }
}
