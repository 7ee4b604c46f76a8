use time::{format_description, UtcOffset};
use tracing_subscriber::{fmt, EnvFilter, FmtSubscriber};

const TRACE_VAR_NAME: &str = "TRACE";

// Sets up tracing. Goes to stderr, filtered by TRACE env var.
// Levels are: trace, debug, info, warn, error
//
// EnvFilter has a standard syntax, but basically can be boiled down to (for example):
//
// All targets, info level:                   info
// All modules under lots::import, debug:     taxlot::lots::import=debug
// Global at warn, matching as debug:         warn,taxlot::lots::import=debug
//
// More generally: target[span{field=value}]=level
// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn setup_tracing() {
    // Define the time format. 5 digits of precision is apparently good enough.
    let time_format =
        format_description::parse("[hour]:[minute]:[second].[subsecond digits:5]")
            .expect("Time format description is invalid");

    let time_offset = crate::util::date::local_utc_offset().unwrap_or(UtcOffset::UTC);
    let timer = fmt::time::OffsetTime::new(time_offset, time_format);

    // Create a subscriber that uses stderr for tracing.
    // It will use the TRACE env var for filtering, and is off by default
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_env(TRACE_VAR_NAME))
        .with_timer(timer) // Use custom time formatting
        .finish();

    // Set the subscriber as the default
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Appends a directive to the TRACE filter. Must be called before
/// setup_tracing to have any effect.
pub fn enable_trace_env(trace_env: &str) {
    if let Ok(existing_env) = std::env::var(TRACE_VAR_NAME) {
        if !existing_env.is_empty() {
            std::env::set_var(TRACE_VAR_NAME, existing_env + "," + trace_env);
            return;
        }
    }
    std::env::set_var(TRACE_VAR_NAME, trace_env);
}

/// What -v turns on: the import summary and unresolved sales.
pub fn enable_verbose() {
    enable_trace_env("taxlot=info");
}
