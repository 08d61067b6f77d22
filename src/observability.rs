//! This module provides observability hooks for the format encoders.
//!
//! The encoders are silent pure functions, so the only window into how a matrix
//! was laid out (how many slots each bucket received, how much padding was
//! inserted) is the structured metric line emitted by `log_metric!`.
//!
//! The macro body is wrapped in `#[cfg(debug_assertions)]`, so release builds
//! compile it out entirely. In debug builds the line is routed through the `log`
//! facade at `debug` level under the `tessera::metric` target.

/// Logs a structured key-value metric line at debug level, only in debug builds.
///
/// # Example
/// ```
/// use tessera::log_metric;
/// let slots = 4;
/// log_metric!("event"="column_part_hyb", "bucket"=0, "slots"=&slots);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::log::debug!(target: "tessera::metric", "TESSERA_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}
