//! Number and date conventions used by the coercion engine.

const ISO_DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const ISO_DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// A named set of number and date conventions.
///
/// Locales are plain data; the coercion engine never consults the process
/// environment, so the active locale is whatever `CoerceOptions` carries
/// (defaulting to [`Locale::EN_US`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    name: &'static str,
    decimal_separator: char,
    group_separator: char,
    datetime_patterns: &'static [&'static str],
    date_patterns: &'static [&'static str],
    display_pattern: &'static str,
}

impl Locale {
    /// United States English; also the reference locale for date retries.
    pub const EN_US: Locale = Locale {
        name: "en-US",
        decimal_separator: '.',
        group_separator: ',',
        datetime_patterns: &[
            "%m/%d/%Y %H:%M:%S",
            "%m/%d/%Y %I:%M:%S %p",
            "%m/%d/%Y %H:%M",
            "%m/%d/%Y %I:%M %p",
        ],
        date_patterns: &["%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%m-%d-%Y"],
        display_pattern: "%m/%d/%Y %H:%M:%S",
    };

    pub const EN_GB: Locale = Locale {
        name: "en-GB",
        decimal_separator: '.',
        group_separator: ',',
        datetime_patterns: &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"],
        date_patterns: &["%d/%m/%Y", "%d %B %Y", "%d %b %Y"],
        display_pattern: "%d/%m/%Y %H:%M:%S",
    };

    pub const ID_ID: Locale = Locale {
        name: "id-ID",
        decimal_separator: ',',
        group_separator: '.',
        datetime_patterns: &[
            "%d/%m/%Y %H:%M:%S",
            "%d/%m/%Y %H.%M.%S",
            "%d-%m-%Y %H:%M:%S",
            "%d/%m/%Y %H:%M",
        ],
        date_patterns: &["%d/%m/%Y", "%d-%m-%Y"],
        display_pattern: "%d/%m/%Y %H.%M.%S",
    };

    pub const DE_DE: Locale = Locale {
        name: "de-DE",
        decimal_separator: ',',
        group_separator: '.',
        datetime_patterns: &["%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M"],
        date_patterns: &["%d.%m.%Y"],
        display_pattern: "%d.%m.%Y %H:%M:%S",
    };

    /// Culture-neutral conventions: dot decimals, ISO-looking output.
    pub const INVARIANT: Locale = Locale {
        name: "invariant",
        decimal_separator: '.',
        group_separator: ',',
        datetime_patterns: &["%m/%d/%Y %H:%M:%S"],
        date_patterns: &["%m/%d/%Y"],
        display_pattern: "%Y-%m-%d %H:%M:%S",
    };

    const BUILT_IN: &'static [Locale] = &[
        Locale::EN_US,
        Locale::EN_GB,
        Locale::ID_ID,
        Locale::DE_DE,
        Locale::INVARIANT,
    ];

    /// The locale date parsing falls back to when the active one fails.
    #[must_use]
    pub fn reference() -> Locale {
        Locale::EN_US
    }

    /// Look up a built-in locale by tag. Accepts `en-US`, `en_US` and
    /// `en_US.UTF-8` spellings, case-insensitively.
    #[must_use]
    pub fn from_name(tag: &str) -> Option<Locale> {
        let base = tag.split('.').next().unwrap_or(tag).replace('_', "-");
        Self::BUILT_IN
            .iter()
            .find(|locale| locale.name.eq_ignore_ascii_case(&base))
            .copied()
    }

    /// Define a locale that is not built in.
    #[must_use]
    pub const fn custom(
        name: &'static str,
        decimal_separator: char,
        group_separator: char,
        datetime_patterns: &'static [&'static str],
        date_patterns: &'static [&'static str],
        display_pattern: &'static str,
    ) -> Locale {
        Locale {
            name,
            decimal_separator,
            group_separator,
            datetime_patterns,
            date_patterns,
            display_pattern,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    #[must_use]
    pub fn group_separator(&self) -> char {
        self.group_separator
    }

    /// Pattern used when a timestamp is rendered as text without an explicit format.
    #[must_use]
    pub fn display_pattern(&self) -> &'static str {
        self.display_pattern
    }

    /// Date-time patterns tried in order: ISO forms first, then the locale's own.
    pub(crate) fn datetime_patterns(&self) -> impl Iterator<Item = &'static str> + '_ {
        ISO_DATETIME_PATTERNS
            .iter()
            .chain(self.datetime_patterns.iter())
            .copied()
    }

    /// Date-only patterns tried in order: ISO forms first, then the locale's own.
    pub(crate) fn date_patterns(&self) -> impl Iterator<Item = &'static str> + '_ {
        ISO_DATE_PATTERNS
            .iter()
            .chain(self.date_patterns.iter())
            .copied()
    }

    /// Rewrite a number written in this locale into the `.`-decimal form
    /// `str::parse::<f64>` accepts: group separators are dropped and the
    /// decimal separator becomes `.`.
    pub(crate) fn normalize_decimal(&self, digits: &str) -> String {
        digits
            .chars()
            .filter(|c| *c != self.group_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    /// Render a float using this locale's decimal separator.
    pub(crate) fn format_float(&self, value: f64) -> String {
        let text = value.to_string();
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::EN_US
    }
}
