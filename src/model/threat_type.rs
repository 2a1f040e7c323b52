//! STRIDE category decoding.
//!
//! The game tags each threat with a coded category: either the position in
//! the STRIDE order or the suit letter of the card that raised it.

use super::ThreatCode;

/// Label used when a code does not name a STRIDE category.
pub const UNKNOWN_THREAT_TYPE: &str = "Unknown";

/// The six STRIDE categories, in STRIDE order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrideCategory {
    /// S
    Spoofing,
    /// T
    Tampering,
    /// R
    Repudiation,
    /// I
    InformationDisclosure,
    /// D
    DenialOfService,
    /// E
    ElevationOfPrivilege,
}

impl StrideCategory {
    /// All categories in STRIDE order; the position is the numeric code.
    pub const ALL: [Self; 6] = [
        Self::Spoofing,
        Self::Tampering,
        Self::Repudiation,
        Self::InformationDisclosure,
        Self::DenialOfService,
        Self::ElevationOfPrivilege,
    ];

    /// Human-readable label written into exported threats.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Spoofing => "Spoofing",
            Self::Tampering => "Tampering",
            Self::Repudiation => "Repudiation",
            Self::InformationDisclosure => "Information disclosure",
            Self::DenialOfService => "Denial of service",
            Self::ElevationOfPrivilege => "Elevation of privilege",
        }
    }

    /// Single-letter suit code.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Spoofing => 'S',
            Self::Tampering => 'T',
            Self::Repudiation => 'R',
            Self::InformationDisclosure => 'I',
            Self::DenialOfService => 'D',
            Self::ElevationOfPrivilege => 'E',
        }
    }

    /// Category at a numeric position.
    #[must_use]
    pub fn from_index(index: u64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Category for a letter code, numeric string or full label
    /// (case-insensitive).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        if let Ok(index) = code.parse::<u64>() {
            return Self::from_index(index);
        }
        Self::ALL.into_iter().find(|cat| {
            code.eq_ignore_ascii_case(cat.label())
                || (code.len() == 1
                    && code
                        .chars()
                        .next()
                        .is_some_and(|c| c.eq_ignore_ascii_case(&cat.letter())))
        })
    }

    /// Category for a coded value.
    #[must_use]
    pub fn from_threat_code(code: &ThreatCode) -> Option<Self> {
        match code {
            ThreatCode::Index(i) => Self::from_index(*i),
            ThreatCode::Code(s) => Self::from_code(s),
            ThreatCode::Other(_) => None,
        }
    }
}

/// Decodes a threat's category to its label.
///
/// Never fails: unknown or missing codes decode to [`UNKNOWN_THREAT_TYPE`].
#[must_use]
pub fn decode_threat_type(code: Option<&ThreatCode>) -> &'static str {
    code.and_then(StrideCategory::from_threat_code)
        .map_or(UNKNOWN_THREAT_TYPE, StrideCategory::label)
}
