use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

pub const DEPTH_INTERVAL_LABEL: &str = "Depth Interval";
pub const EMPTY_INTERVAL: &str = "start: end: ";

// Optional sign, digits with optional comma thousands groups, optional decimal
// part (period or comma), optional exponent.
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d+(?:,\d{3})*(?:[.,]\d+)?|[.,]\d+)(?:[eE][-+]?\d+)?")
        .expect("number pattern is valid")
});

/// Turns free text read from a "Depth Interval" region into `start: X end: Y`.
///
/// A single number is taken as the end depth with an implicit start of `0`.
/// With more numbers the first and last are kept. Text without numbers
/// yields [`EMPTY_INTERVAL`].
pub fn extract_depth_interval(text: &str) -> String {
    let numbers = numbers_from_text(text);
    match numbers.as_slice() {
        [] => {
            info!(
                "no number detected in depth interval text {:?}",
                text
            );
            EMPTY_INTERVAL.to_string()
        }
        [end] => format_interval(None, *end),
        [start, .., end] => format_interval(Some(*start), *end),
    }
}

/// Every number in `text`, commas read as decimal points, signs dropped.
///
/// Matches with thousands groups (`1,000.5`, `1,250,000`) no longer parse once
/// the commas become points and are skipped.
pub fn numbers_from_text(text: &str) -> Vec<f64> {
    NUMBER
        .find_iter(text)
        .filter_map(|found| {
            let normalized = found.as_str().replace(',', ".");
            match normalized.parse::<f64>() {
                Ok(value) => Some(value.abs()),
                Err(err) => {
                    debug!("skipping unparsable number {:?}: {}", found.as_str(), err);
                    None
                }
            }
        })
        .collect()
}

pub fn format_interval(start: Option<f64>, end: f64) -> String {
    let start = match start {
        Some(value) => format_depth(value),
        None => "0".to_string(),
    };
    format!("start: {} end: {}", start, format_depth(end))
}

/// Depth values always print with a fractional part, e.g. `48.0`.
pub fn format_depth(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_number_is_the_end_depth() {
        insta::assert_snapshot!(extract_depth_interval("-- 48"), @"start: 0 end: 48.0");
    }

    #[test]
    fn text_without_digits_gives_empty_interval() {
        assert_eq!(extract_depth_interval("n/a"), "start: end: ");
        assert_eq!(extract_depth_interval(""), EMPTY_INTERVAL);
    }

    #[test]
    fn first_and_last_numbers_win() {
        insta::assert_snapshot!(
            extract_depth_interval("1.20 m\n(approx 3)\n4.75 m"),
            @"start: 1.2 end: 4.75"
        );
    }

    #[test]
    fn signs_are_discarded() {
        assert_eq!(numbers_from_text("10-20"), vec![10.0, 20.0]);
        assert_eq!(extract_depth_interval("-2.5 / -7"), "start: 2.5 end: 7.0");
    }

    #[test]
    fn comma_is_read_as_decimal_point() {
        assert_eq!(numbers_from_text("0,5 m - 2,30 m"), vec![0.5, 2.3]);
        // thousands grouping collapses into a decimal: known limitation
        assert_eq!(extract_depth_interval("12.5\n34,200"), "start: 12.5 end: 34.2");
    }

    #[test]
    fn exponent_and_leading_point_are_numbers() {
        assert_eq!(numbers_from_text("1e2 .5"), vec![100.0, 0.5]);
    }

    #[test]
    fn mixed_separators_are_skipped() {
        assert_eq!(numbers_from_text("1,000.5"), Vec::<f64>::new());
        assert_eq!(numbers_from_text("1,250,000 m"), Vec::<f64>::new());
        assert_eq!(extract_depth_interval("1,250,000"), EMPTY_INTERVAL);
    }

    #[test]
    fn format_depth_keeps_fraction() {
        assert_eq!(format_depth(3.0), "3.0");
        assert_eq!(format_depth(0.25), "0.25");
    }
}
