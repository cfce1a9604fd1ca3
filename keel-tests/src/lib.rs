mod joined;
mod readonly;
mod simple;
mod transaction;

use joined::joined;
use keel::{Driver, Group};
use log::LevelFilter;
use readonly::readonly;
use simple::simple;
use std::env;
use transaction::{auto_commit, savepoints};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the whole suite against `group`. The group is expected to have at least one replica
/// pointing to the same database as the writable connection.
pub async fn execute_tests<D: Driver>(group: &Group<D>) {
    simple(group).await;
    joined(group).await;
    savepoints(group).await;
    auto_commit(group).await;
    readonly(group).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
