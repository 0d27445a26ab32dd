use std::fs::File;

use time::{format_description, OffsetDateTime, UtcOffset};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, FmtSubscriber};

/// Will panic if the log file cannot be created or a global subscriber is
/// already set.
pub fn init_logger() {
    let file = File::create(log_file_name()).expect("could not create log file");
    let writer = BoxMakeWriter::new(file);

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        offset,
        format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]").unwrap(),
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(writer)
        .finish();

    set_global_default(subscriber).expect(
        "Could not set global default tracing subscriber. Consider disabling logs if you are already setting a subscriber.",
    );
}

fn log_file_name() -> String {
    let format =
        format_description::parse("[year]-[month]-[day]_[hour]:[minute]:[second]_match_log.txt")
            .unwrap();
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&format)
        .unwrap_or_else(|_| "match_log.txt".to_owned())
}
