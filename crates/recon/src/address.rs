use crate::config::{AddressConfig, AddressFill};

/// The three address lines written to the output template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressLines {
    pub line1: String,
    pub line2: String,
    pub line3: String,
}

impl AddressLines {
    /// Line `n` (1-based); empty when out of range.
    pub fn line(&self, n: usize) -> &str {
        match n {
            1 => &self.line1,
            2 => &self.line2,
            3 => &self.line3,
            _ => "",
        }
    }
}

/// Split a comma-delimited address into three lines.
///
/// When more than `trailing_segments` segments remain after trimming, the
/// last `trailing_segments` are dropped unconditionally (city, state and
/// pincode already have their own columns). A short address that lacks
/// those trailing parts loses real content here.
pub fn segment_address(raw: &str, config: &AddressConfig) -> AddressLines {
    let mut parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.len() > config.trailing_segments {
        parts.truncate(parts.len() - config.trailing_segments);
    }

    let (line1, line2, line3) = match (parts.as_slice(), config.fill) {
        ([], _) => ("", "", String::new()),
        ([only], AddressFill::Forward) => (*only, *only, only.to_string()),
        ([only], AddressFill::Sparse) => (*only, "", String::new()),
        ([first, second], _) => (*first, *second, second.to_string()),
        ([first, second, rest @ ..], _) => (*first, *second, rest.join(", ")),
    };

    AddressLines {
        line1: line1.to_string(),
        line2: line2.to_string(),
        line3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward() -> AddressConfig {
        AddressConfig::default()
    }

    fn sparse() -> AddressConfig {
        AddressConfig {
            fill: AddressFill::Sparse,
            ..AddressConfig::default()
        }
    }

    fn lines(l1: &str, l2: &str, l3: &str) -> AddressLines {
        AddressLines {
            line1: l1.into(),
            line2: l2.into(),
            line3: l3.into(),
        }
    }

    #[test]
    fn trailing_geography_dropped() {
        let out = segment_address("A, B, C, TN, India, 600001", &forward());
        assert_eq!(out, lines("A", "B", "C"));
    }

    #[test]
    fn long_tail_joined_into_line3() {
        let out = segment_address("12 Car St, Near Temple, Ward 4, Block B, Chennai, TN, 600001", &forward());
        assert_eq!(out, lines("12 Car St", "Near Temple", "Ward 4, Block B"));
    }

    #[test]
    fn single_segment_fills_forward() {
        assert_eq!(segment_address("OnlyOne", &forward()), lines("OnlyOne", "OnlyOne", "OnlyOne"));
    }

    #[test]
    fn single_segment_sparse() {
        assert_eq!(segment_address("OnlyOne", &sparse()), lines("OnlyOne", "", ""));
    }

    #[test]
    fn two_segments_repeat_second() {
        assert_eq!(segment_address("A, B", &forward()), lines("A", "B", "B"));
        assert_eq!(segment_address("A, B", &sparse()), lines("A", "B", "B"));
    }

    #[test]
    fn exactly_three_segments_kept() {
        // Not more than three, so nothing is treated as trailing geography
        assert_eq!(segment_address("A, B, C", &forward()), lines("A", "B", "C"));
    }

    #[test]
    fn four_segments_lose_three() {
        // Documented truncation: only the first segment survives
        assert_eq!(segment_address("Door 5, Street, Town, 600001", &forward()), lines("Door 5", "Door 5", "Door 5"));
    }

    #[test]
    fn empty_and_blank_segments() {
        assert_eq!(segment_address("", &forward()), AddressLines::default());
        assert_eq!(segment_address(" , ,, ", &forward()), AddressLines::default());
        assert_eq!(segment_address("A,,B", &forward()), lines("A", "B", "B"));
    }

    #[test]
    fn custom_trailing_count() {
        let config = AddressConfig {
            trailing_segments: 1,
            ..AddressConfig::default()
        };
        assert_eq!(segment_address("A, B, 600001", &config), lines("A", "B", "B"));
    }

    #[test]
    fn line_accessor() {
        let out = lines("a", "b", "c");
        assert_eq!(out.line(1), "a");
        assert_eq!(out.line(3), "c");
        assert_eq!(out.line(4), "");
    }
}
