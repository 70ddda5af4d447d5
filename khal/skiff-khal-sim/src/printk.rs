use log::{LevelFilter, Log, Metadata, Record};
use std::io::Write;

pub struct Printk {}

impl Log for Printk {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "[{:<5}] {}", record.level(), record.args());
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

static PRINTK: Printk = Printk {};

/// Routes `log` records to stdout. Later calls are no-ops.
pub fn init(level: LevelFilter) {
    if log::set_logger(&PRINTK).is_ok() {
        log::set_max_level(level);
    }
}
