use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::{env, io};

use colored::{Color, Colorize};
use log::{Level, LevelFilter, Log, Metadata, Record};
use time::macros;

struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
}

impl Logger {
    fn new(filename: Option<&str>) -> io::Result<Self> {
        log::set_max_level(LevelFilter::Debug);

        let file = match filename {
            Some(filename) => Some(Mutex::new(BufWriter::new(File::create(filename)?))),
            None => None,
        };

        Ok(Self { file })
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match metadata.target().split("::").next() {
            Some("freezer_meme") => true,
            _ => metadata.level() <= Level::Info,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let Ok(timestamp) = time::OffsetDateTime::now_utc()
            .format(macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        else {
            return;
        };
        let target = record.target();
        let level = record.level().as_str();
        let args = record.args();

        let color = match record.level() {
            Level::Error => Color::BrightRed,
            Level::Warn => Color::BrightYellow,
            Level::Info => Color::BrightCyan,
            Level::Debug => Color::Magenta,
            Level::Trace => Color::Green,
        };

        println!("{} {} {args}", timestamp.color(Color::BrightBlack), level.color(color));

        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{timestamp} [{target} {level}] {args}");
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Installs the global logger. Lines are mirrored to `LOG_FILE` when it is set.
pub fn init() -> io::Result<()> {
    let filename = env::var("LOG_FILE").ok().filter(|filename| !filename.is_empty());
    let logger = Logger::new(filename.as_deref())?;
    log::set_boxed_logger(Box::new(logger)).map_err(io::Error::other)
}
