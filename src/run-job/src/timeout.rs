// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parse task timeouts.
//!
//! Timeouts are expressed as a sequence of numbers with units, such as
//! `600s`, `10m`, `1h 30m`, `1.5h`, or `250ms`. A bare `0` is also accepted.
//! Negative values are not.

use google_cloud_wkt::Duration;

/// Indicates a problem parsing a timeout.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum TimeoutError {
    #[error("cannot parse timeout `{input}`: {source}")]
    Parse {
        input: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("timeout `{input}` is out of the supported range: {source}")]
    OutOfRange {
        input: String,
        #[source]
        source: google_cloud_wkt::DurationError,
    },
}

/// Parses `input` into the duration sent to Cloud Run.
///
/// # Example
/// ```
/// # use cloud_run_job::timeout::parse;
/// let timeout = parse("600s")?;
/// assert_eq!(timeout.seconds(), 600);
/// # Ok::<(), cloud_run_job::timeout::TimeoutError>(())
/// ```
pub fn parse(input: &str) -> Result<Duration, TimeoutError> {
    let trimmed = input.trim();
    let std = if trimmed == "0" {
        std::time::Duration::ZERO
    } else {
        humantime::parse_duration(trimmed).map_err(|source| TimeoutError::Parse {
            input: input.to_string(),
            source,
        })?
    };
    Duration::try_from(std).map_err(|source| TimeoutError::OutOfRange {
        input: input.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("600s", 600, 0)]
    #[test_case("10m", 600, 0)]
    #[test_case("1h", 3600, 0)]
    #[test_case("1h 30m", 5400, 0)]
    #[test_case("1h30m", 5400, 0)]
    #[test_case("1.5h", 5400, 0)]
    #[test_case("0.5s", 0, 500_000_000)]
    #[test_case("250ms", 0, 250_000_000)]
    #[test_case(" 42s ", 42, 0)]
    #[test_case("0", 0, 0)]
    fn valid(input: &str, seconds: i64, nanos: i32) -> anyhow::Result<()> {
        let got = parse(input)?;
        assert_eq!(got.seconds(), seconds, "{input}");
        assert_eq!(got.nanos(), nanos, "{input}");
        Ok(())
    }

    #[test_case("6x")]
    #[test_case("")]
    #[test_case("-5s")]
    #[test_case("s")]
    #[test_case("ten minutes")]
    fn invalid(input: &str) {
        let got = parse(input);
        assert!(
            matches!(got, Err(TimeoutError::Parse { .. })),
            "{input} => {got:?}"
        );
    }

    #[test]
    fn out_of_range() {
        let got = parse("20000y");
        assert!(
            matches!(got, Err(TimeoutError::OutOfRange { .. })),
            "{got:?}"
        );
    }

    #[test]
    fn error_names_input() {
        let got = parse("6x").unwrap_err();
        assert!(got.to_string().contains("`6x`"), "{got}");
    }
}
