use std::time::Duration;

use time::macros::format_description;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

pub mod discord;
pub mod regex;

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over `default_filter` when set.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn tracing_init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let timer = UtcTime::new(format_description!("[hour]:[minute]:[second]"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .try_init();
}

/// Formats a duration the way throttle notices show it, e.g. `4.2 seconds`.
pub fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{secs:.1} seconds")
    }
}

fn normalise_quotes(input: &str, single_quotes: bool) -> String {
    let doubled = input.replace(['\u{201C}', '\u{201D}'], "\"");
    if single_quotes {
        doubled.replace(['\u{2018}', '\u{2019}'], "'")
    } else {
        doubled
    }
}

fn is_quote(c: char, single_quotes: bool) -> bool {
    c == '"' || (single_quotes && c == '\'')
}

fn strip_quotes(input: &str, single_quotes: bool) -> &str {
    let mut chars = input.chars();
    match (chars.next(), chars.next_back()) {
        (Some(a), Some(b)) if a == b && is_quote(a, single_quotes) => &input[1..input.len() - 1],
        _ => input,
    }
}

fn next_token(input: &str, single_quotes: bool) -> (String, &str) {
    if let Some(quote) = input.chars().next().filter(|c| is_quote(*c, single_quotes)) {
        if let Some(end) = input[1..].find(quote) {
            return (input[1..1 + end].to_owned(), &input[end + 2..]);
        }
    }

    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    (input[..end].to_owned(), &input[end..])
}

/// Splits an argument string into at most `count` values.
///
/// Values are separated by whitespace; a value wrapped in double quotes (or single quotes, when
/// `single_quotes` is set) may contain whitespace. Typographic quotes count as plain ones. Once
/// `count - 1` values have been taken, the remainder becomes the last value verbatim (minus one
/// pair of surrounding quotes). `None` means no limit.
pub fn split_args(input: &str, count: Option<usize>, single_quotes: bool) -> Vec<String> {
    let input = normalise_quotes(input, single_quotes);
    let limit = count.filter(|c| *c > 0).unwrap_or(usize::MAX);

    let mut result = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        if result.len() + 1 == limit {
            result.push(strip_quotes(rest.trim_end(), single_quotes).to_owned());
            break;
        }

        let (token, remainder) = next_token(rest, single_quotes);
        result.push(token);
        rest = remainder.trim_start();
    }

    result
}
