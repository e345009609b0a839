//! Choosing between animated and plain-text progress output.
//!
//! Animated bars redraw lines in place, which screen readers and dumb
//! terminals cannot follow. Plain-text output prints one labelled line per
//! progress change instead.

use std::env;

/// How progress should be drawn on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One static, labelled line per change.
    Accessible,
    /// Redrawn progress bars.
    Standard,
}

/// Pick the output mode from the `accessible` setting and the environment.
///
/// An explicit setting wins. Otherwise `NO_COLOR` (set to anything, even
/// empty) or `TERM=dumb` select accessible output.
///
/// # Examples
///
/// ```
/// use grantscope_progress::output_mode::{OutputMode, resolve};
///
/// assert_eq!(resolve(Some(true)), OutputMode::Accessible);
/// assert_eq!(resolve(Some(false)), OutputMode::Standard);
/// ```
#[must_use]
pub fn resolve(accessible: Option<bool>) -> OutputMode {
    resolve_with(accessible, |name| env::var(name).ok())
}

/// [`resolve`] with an injectable environment lookup.
///
/// ```
/// use grantscope_progress::output_mode::{OutputMode, resolve_with};
///
/// let mode = resolve_with(None, |name| (name == "TERM").then(|| "dumb".to_owned()));
/// assert_eq!(mode, OutputMode::Accessible);
/// ```
#[must_use]
pub fn resolve_with<F>(accessible: Option<bool>, lookup: F) -> OutputMode
where
    F: Fn(&str) -> Option<String>,
{
    match accessible {
        Some(true) => OutputMode::Accessible,
        Some(false) => OutputMode::Standard,
        None if lookup("NO_COLOR").is_some() => OutputMode::Accessible,
        None if lookup("TERM").as_deref() == Some("dumb") => OutputMode::Accessible,
        None => OutputMode::Standard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn env_of<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[rstest]
    #[case::forced_on(Some(true), &[], OutputMode::Accessible)]
    #[case::forced_off_beats_env(Some(false), &[("NO_COLOR", "1"), ("TERM", "dumb")], OutputMode::Standard)]
    #[case::no_color(None, &[("NO_COLOR", "1")], OutputMode::Accessible)]
    #[case::empty_no_color(None, &[("NO_COLOR", "")], OutputMode::Accessible)]
    #[case::dumb_term(None, &[("TERM", "dumb")], OutputMode::Accessible)]
    #[case::capable_term(None, &[("TERM", "xterm-256color")], OutputMode::Standard)]
    #[case::nothing_set(None, &[], OutputMode::Standard)]
    fn output_mode_follows_setting_then_env(
        #[case] accessible: Option<bool>,
        #[case] vars: &[(&str, &str)],
        #[case] expected: OutputMode,
    ) {
        assert_eq!(resolve_with(accessible, env_of(vars)), expected);
    }
}
