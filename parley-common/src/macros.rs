/// Logs a formatted message at error level. Used for failures that deserve operator attention,
/// such as a command handler returning an error.
#[macro_export]
macro_rules! err {
    ($($t:tt)*) => {{
        let msg = format!($($t)*);
        tracing::error!("{}", &msg);
    }}
}
