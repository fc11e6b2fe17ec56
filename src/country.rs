/// Label returned when no dialing prefix matches.
pub const UNKNOWN_COUNTRY: &str = "🌍 Unknown";

const COUNTRY_PREFIXES: &[(&str, &str)] = &[
    ("1", "🇺🇸 USA / Canada"),
    ("7", "🇷🇺 Russia / Kazakhstan"),
    ("20", "🇪🇬 Egypt"),
    ("44", "🇬🇧 United Kingdom"),
    ("49", "🇩🇪 Germany"),
    ("62", "🇮🇩 Indonesia"),
    ("63", "🇵🇭 Philippines"),
    ("84", "🇻🇳 Vietnam"),
    ("91", "🇮🇳 India"),
    ("92", "🇵🇰 Pakistan"),
    ("234", "🇳🇬 Nigeria"),
    ("880", "🇧🇩 Bangladesh"),
    ("966", "🇸🇦 Saudi Arabia"),
    ("971", "🇦🇪 United Arab Emirates"),
];

/// Resolves a phone number in international digit form to a display label.
///
/// Uses the longest matching dialing prefix, so `880…` resolves to
/// Bangladesh even though shorter prefixes are also in the table.
#[must_use]
pub fn country_label(number: &str) -> &'static str {
    let digits = number.trim_start_matches('+');
    COUNTRY_PREFIXES
        .iter()
        .filter(|(prefix, _)| digits.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map_or(UNKNOWN_COUNTRY, |(_, label)| *label)
}
