use std::io::Write;

use flexi_logger::{DeferredNow, style};
use log::{Level, Record};

/// `LEVEL message`, colored by level; debug and trace lines also carry the
/// timestamp and target.
pub fn cli_format(w: &mut dyn Write, now: &mut DeferredNow, record: &Record) -> std::io::Result<()> {
    let level = record.level();
    let label = style(level).paint(level.to_string());
    if level >= Level::Debug {
        write!(
            w,
            "{} {label} [{}] {}",
            now.format("%H:%M:%S%.3f"),
            record.target(),
            record.args()
        )
    } else {
        write!(w, "{label} {}", record.args())
    }
}
