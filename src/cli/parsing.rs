//! CLI parsing helpers for clap value parsers.

use super::MAX_POLL_INTERVAL_MS;
use crate::progress::MAX_SHARD_COUNT;
use crate::stage::PIPELINE_STAGE_COUNT;

fn parse_in_range<T>(s: &str, min: T, max: T, what: &str) -> Result<T, String>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let value: T = s
        .trim()
        .parse()
        .map_err(|_| format!("{s} is not a valid number"))?;
    if value >= min && value <= max {
        Ok(value)
    } else {
        Err(format!("{what} must be between {min} and {max}"))
    }
}

pub(super) fn parse_shards(s: &str) -> Result<usize, String> {
    parse_in_range(s, 1, MAX_SHARD_COUNT, "shards")
}

pub(super) fn parse_interval(s: &str) -> Result<u64, String> {
    parse_in_range(s, 1, MAX_POLL_INTERVAL_MS, "poll interval")
}

pub(super) fn parse_stage_index(s: &str) -> Result<usize, String> {
    parse_in_range(s, 0, PIPELINE_STAGE_COUNT - 1, "stage index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Ok(1))]
    #[case(" 256 ", Ok(256))]
    #[case("0", Err("shards must be between 1 and 256".to_owned()))]
    #[case("257", Err("shards must be between 1 and 256".to_owned()))]
    #[case("many", Err("many is not a valid number".to_owned()))]
    fn shards_are_range_checked(#[case] raw: &str, #[case] expected: Result<usize, String>) {
        assert_eq!(parse_shards(raw), expected);
    }

    #[rstest]
    #[case("6", Ok(6))]
    #[case("7", Err("stage index must be between 0 and 6".to_owned()))]
    #[case("-1", Err("-1 is not a valid number".to_owned()))]
    fn stage_indices_are_range_checked(
        #[case] raw: &str,
        #[case] expected: Result<usize, String>,
    ) {
        assert_eq!(parse_stage_index(raw), expected);
    }

    #[test]
    fn poll_interval_shares_the_configured_bound() {
        assert!(parse_interval("0").is_err());
        assert_eq!(
            parse_interval(&MAX_POLL_INTERVAL_MS.to_string()),
            Ok(MAX_POLL_INTERVAL_MS)
        );
        assert!(parse_interval(&(MAX_POLL_INTERVAL_MS + 1).to_string()).is_err());
    }
}
