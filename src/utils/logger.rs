use anyhow::{Context, Result};
use env_logger::{Builder, Env, Logger, Target, WriteStyle};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::path::Path;

/// Console logger plus an optional debug-level log file
pub struct DualLogger {
    console: Logger,
    file: Option<Logger>,
}

impl DualLogger {
    /// `console` sets the terminal filter; the file always receives `debug`
    pub fn new(console: &mut Builder, log_file: Option<&Path>) -> Result<Self> {
        let file = match log_file {
            Some(path) => {
                let handle = File::create(path)
                    .with_context(|| format!("Failed to create log file {}", path.display()))?;
                Some(
                    Builder::new()
                        .filter_level(LevelFilter::Debug)
                        .write_style(WriteStyle::Never)
                        .target(Target::Pipe(Box::new(handle)))
                        .build(),
                )
            }
            None => None,
        };

        Ok(Self {
            console: console.build(),
            file,
        })
    }

    pub fn max_level(&self) -> LevelFilter {
        let file = self.file.as_ref().map(Logger::filter).unwrap_or(LevelFilter::Off);
        self.console.filter().max(file)
    }
}

impl Log for DualLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata) || self.file.as_ref().is_some_and(|f| f.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        self.console.log(record);
        if let Some(file) = &self.file {
            file.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            file.flush();
        }
    }
}

/// Install the global logger: `RUST_LOG` (default `info`) on the console,
/// everything from `debug` up in `log_file` when given
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let mut console = Builder::from_env(Env::default().default_filter_or("info"));
    let logger = DualLogger::new(&mut console, log_file)?;
    let max_level = logger.max_level();
    log::set_boxed_logger(Box::new(logger)).context("Logger already installed")?;
    log::set_max_level(max_level);
    Ok(())
}
