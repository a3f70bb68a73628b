//! Logging setup: every line goes to stdout and is appended to a log file

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writer that duplicates output to stdout and a file
struct Tee {
    file: File,
}

impl Tee {
    /// Open `path` for appending, creating it if needed
    fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

/// Initialize the global logger.
///
/// Default filter is `info`, overridable with `RUST_LOG`. If the log file
/// cannot be opened, logging continues on stdout only.
pub fn init(log_file: &Path) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {}",
            buf.timestamp_millis(),
            record.level(),
            record.args()
        )
    });

    let file_error = match Tee::open(log_file) {
        Ok(tee) => {
            builder.target(env_logger::Target::Pipe(Box::new(tee)));
            None
        }
        Err(e) => {
            builder.target(env_logger::Target::Stdout);
            Some(e)
        }
    };

    // A second init (e.g. from tests) keeps the first logger
    if builder.try_init().is_err() {
        return;
    }

    if let Some(e) = file_error {
        log::warn!(
            "Failed to open log file {}: {}, logging to stdout only",
            log_file.display(),
            e
        );
    }
}
