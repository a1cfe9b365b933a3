// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier parsing helpers.

/// Extract the series segment of a charm URL.
///
/// `cs:trusty/wordpress-3` and `cs:~user/precise/mysql-1` yield the series;
/// URLs without one (`cs:wordpress`) yield `None`.
pub fn series_from_charm_url(url: &str) -> Option<&str> {
    let path = url.split_once(':').map_or(url, |(_, rest)| rest);
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.first().is_some_and(|s| s.starts_with('~')) {
        segments.remove(0);
    }
    match segments.as_slice() {
        [series, _name] if !series.is_empty() => Some(series),
        _ => None,
    }
}

/// The unit number of a unit id (`wordpress/3` yields `3`).
pub fn unit_number(unit_id: &str) -> Option<&str> {
    unit_id.rsplit_once('/').map(|(_, n)| n)
}
