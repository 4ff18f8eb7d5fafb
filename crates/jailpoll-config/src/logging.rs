//! Log output format selection.
//!
//! The daemon is usually started from a session autostart entry, where stderr
//! ends up in the journal, but it is also run by hand while debugging. `auto`
//! picks between the two renderings from whether stderr is a terminal.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Configured logging output format.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Compact on a terminal, JSON otherwise.
    #[default]
    Auto,
    /// One JSON object per record, for the journal and log shippers.
    Json,
    /// Single human-readable line per record.
    Compact,
}

impl LogFormat {
    /// Concrete rendering for a stderr that is (or is not) a terminal.
    ///
    /// Never returns [`LogFormat::Auto`].
    #[must_use]
    pub const fn resolve(self, stderr_is_terminal: bool) -> Self {
        match self {
            Self::Auto if stderr_is_terminal => Self::Compact,
            Self::Auto => Self::Json,
            explicit => explicit,
        }
    }
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;
