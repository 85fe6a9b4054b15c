use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Initialise logging. In debug mode the default level is `debug`, otherwise
/// `info`. The level can be overridden via the `RUST_LOG` environment variable
/// only when debug logging is enabled.
///
/// When `log_file` is given all output is appended to that file instead of
/// stdout. Calling `init` a second time is a no-op.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // When debug logging is disabled we force `info` level regardless of the
    // `RUST_LOG` environment variable.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file.as_ref().and_then(|p| split_log_path(p)) {
        Some((dir, name)) => {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                eprintln!("failed to create log directory {}: {e}", dir.display());
            }
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name.to_string_lossy().into_owned())
                .build(&dir);
            match appender {
                Ok(appender) => {
                    let _ = builder.with_ansi(false).with_writer(appender).try_init();
                }
                Err(e) => {
                    eprintln!("failed to open log file in {}: {e}", dir.display());
                    let _ = builder.try_init();
                }
            }
        }
        None => {
            let _ = builder.try_init();
        }
    }
}

fn split_log_path(path: &Path) -> Option<(PathBuf, std::ffi::OsString)> {
    let name = path.file_name()?.to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, name))
}
