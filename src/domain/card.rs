use crate::error::{PaymentError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Card networks the checkout can recognize from a PAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardNetwork {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Jcb,
    DinersClub,
    Maestro,
}

impl CardNetwork {
    pub const ALL: [CardNetwork; 7] = [
        CardNetwork::Visa,
        CardNetwork::Mastercard,
        CardNetwork::Amex,
        CardNetwork::Discover,
        CardNetwork::Jcb,
        CardNetwork::DinersClub,
        CardNetwork::Maestro,
    ];

    /// Slug used in merchant settings.
    pub fn slug(&self) -> &'static str {
        match self {
            CardNetwork::Visa => "visa",
            CardNetwork::Mastercard => "mastercard",
            CardNetwork::Amex => "amex",
            CardNetwork::Discover => "discover",
            CardNetwork::Jcb => "jcb",
            CardNetwork::DinersClub => "diners-club",
            CardNetwork::Maestro => "maestro",
        }
    }

    /// Human readable name, stored on the order as the card type.
    pub fn label(&self) -> &'static str {
        match self {
            CardNetwork::Visa => "Visa",
            CardNetwork::Mastercard => "MasterCard",
            CardNetwork::Amex => "American Express",
            CardNetwork::Discover => "Discover",
            CardNetwork::Jcb => "JCB",
            CardNetwork::DinersClub => "Diners Club",
            CardNetwork::Maestro => "Maestro",
        }
    }

    /// PAN lengths the network issues. Informational; classification only
    /// looks at the prefix.
    pub fn valid_lengths(&self) -> &'static [usize] {
        match self {
            CardNetwork::Amex => &[15],
            CardNetwork::DinersClub => &[14],
            CardNetwork::Maestro => &[12, 13, 14, 15, 16, 17, 18, 19],
            _ => &[16],
        }
    }
}

impl fmt::Display for CardNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CardNetwork {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        CardNetwork::ALL
            .into_iter()
            .find(|network| network.slug() == s.trim())
            .ok_or_else(|| PaymentError::ValidationError(format!("Unknown card network: {s}")))
    }
}

// Evaluated top to bottom; the first matching prefix wins.
const PREFIX_RULES: [(CardNetwork, &str); 7] = [
    (CardNetwork::Amex, r"^3[47]"),
    (CardNetwork::Jcb, r"^35(2[89]|[3-8][0-9])"),
    (
        CardNetwork::Discover,
        r"^(6011|622(12[6-9]|1[3-9][0-9]|[2-8][0-9]{2}|9[0-1][0-9]|92[0-5]|64[4-9])|65)",
    ),
    (CardNetwork::Mastercard, r"^5[1-5]"),
    (CardNetwork::Visa, r"^4"),
    (CardNetwork::Maestro, r"^(5018|5020|5038|6304|6759|676[1-3])"),
    (CardNetwork::DinersClub, r"^3[0689]"),
];

static RULES: LazyLock<Vec<(CardNetwork, Regex)>> = LazyLock::new(|| {
    PREFIX_RULES
        .iter()
        .map(|(network, pattern)| {
            (
                *network,
                Regex::new(pattern).expect("card prefix patterns are valid"),
            )
        })
        .collect()
});

/// Strips the spacing checkout forms insert between digit groups.
pub fn normalize_pan(pan: &str) -> String {
    pan.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Classifies a PAN by its leading digits.
///
/// Returns `None` for numbers no rule recognizes.
pub fn classify(pan: &str) -> Option<CardNetwork> {
    let pan = normalize_pan(pan);
    RULES
        .iter()
        .find(|(_, rule)| rule.is_match(&pan))
        .map(|(network, _)| *network)
}

/// Raw card data as collected by checkout, forwarded once to the processor.
#[derive(Clone, PartialEq)]
pub struct CardDetails {
    pub number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvc: String,
}

impl CardDetails {
    /// Builds card details from checkout field values.
    ///
    /// The expiry arrives as `MM / YY` or `MM / YYYY`; only the last two digits
    /// of the year are kept.
    pub fn from_checkout(number: &str, expiry: &str, cvc: &str) -> Result<Self> {
        let number = normalize_pan(number);
        let expiry = expiry.trim();
        let cvc = cvc.trim();
        if number.is_empty() || expiry.is_empty() || cvc.is_empty() {
            return Err(PaymentError::ValidationError(
                "Credit card details cannot be left incomplete.".to_string(),
            ));
        }

        let (month, year) = expiry
            .split_once('/')
            .map(|(month, year)| (month.trim(), year.trim()))
            .filter(|(month, year)| all_digits(month) && all_digits(year) && year.len() >= 2)
            .ok_or_else(|| {
                PaymentError::ValidationError("Invalid card expiry date.".to_string())
            })?;

        Ok(Self {
            number,
            expiry_month: month.to_string(),
            expiry_year: year[year.len() - 2..].to_string(),
            cvc: cvc.to_string(),
        })
    }

    pub fn network(&self) -> Option<CardNetwork> {
        classify(&self.number)
    }

    /// Expiration in the `MMYY` form the processor expects.
    pub fn expiration(&self) -> String {
        format!("{}{}", self.expiry_month, self.expiry_year)
    }

    pub fn last4(&self) -> &str {
        let start = self
            .number
            .char_indices()
            .rev()
            .nth(3)
            .map_or(0, |(index, _)| index);
        &self.number[start..]
    }
}

fn all_digits(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("****{}", self.last4()))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvc", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_classify_known_test_cards() {
        assert_eq!(classify("4111111111111111"), Some(CardNetwork::Visa));
        assert_eq!(classify("5555555555554444"), Some(CardNetwork::Mastercard));
        assert_eq!(classify("378282246310005"), Some(CardNetwork::Amex));
        assert_eq!(classify("6011000000000004"), Some(CardNetwork::Discover));
        assert_eq!(classify("3530111333300000"), Some(CardNetwork::Jcb));
        assert_eq!(classify("30569309025904"), Some(CardNetwork::DinersClub));
        assert_eq!(classify("6759649826438453"), Some(CardNetwork::Maestro));
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify("9999999999999999"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("1234"), None);
    }

    #[test]
    fn test_classify_ignores_spacing() {
        assert_eq!(classify("4111 1111 1111 1111"), Some(CardNetwork::Visa));
    }

    #[test]
    fn test_first_match_wins() {
        // 35 followed by 28 matches JCB before the broader diners/amex rules are tried.
        assert_eq!(classify("3528000000000000"), Some(CardNetwork::Jcb));
        // 3500 is not a JCB range and no rule covers it.
        assert_eq!(classify("3500000000000000"), None);
        // 5018 is Maestro; 51-55 would be Mastercard, but 50 is outside that range.
        assert_eq!(classify("5018000000000000"), Some(CardNetwork::Maestro));
        // 6011 hits the Discover alternative before the 622 sub-patterns are considered.
        assert_eq!(classify("6011222000000000"), Some(CardNetwork::Discover));
        assert_eq!(classify("6221260000000000"), Some(CardNetwork::Discover));
        assert_eq!(classify("6221250000000000"), None);
        assert_eq!(classify("6500000000000000"), Some(CardNetwork::Discover));
    }

    #[test]
    fn test_classify_ignores_length() {
        assert_eq!(classify("4"), Some(CardNetwork::Visa));
        assert_eq!(classify("34"), Some(CardNetwork::Amex));
    }

    #[test]
    fn test_prefix_rule_holds_for_random_suffixes() {
        let mut rng = rand::thread_rng();
        let prefixes = [
            ("4", CardNetwork::Visa),
            ("51", CardNetwork::Mastercard),
            ("55", CardNetwork::Mastercard),
            ("37", CardNetwork::Amex),
            ("6011", CardNetwork::Discover),
            ("3589", CardNetwork::Jcb),
            ("36", CardNetwork::DinersClub),
            ("6763", CardNetwork::Maestro),
        ];
        for (prefix, expected) in prefixes {
            for _ in 0..50 {
                let suffix: String = (0..12)
                    .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
                    .collect();
                let pan = format!("{prefix}{suffix}");
                assert_eq!(classify(&pan), Some(expected), "pan {pan}");
            }
        }
    }

    #[test]
    fn test_network_slug_round_trip() {
        for network in CardNetwork::ALL {
            assert_eq!(network.slug().parse::<CardNetwork>().unwrap(), network);
        }
        assert!("unionpay".parse::<CardNetwork>().is_err());
        assert_eq!(
            serde_json::to_string(&CardNetwork::DinersClub).unwrap(),
            "\"diners-club\""
        );
    }

    #[test]
    fn test_card_details_from_checkout() {
        let card = CardDetails::from_checkout("4111 1111 1111 1111", "09 / 2031", "123").unwrap();
        assert_eq!(card.number, "4111111111111111");
        assert_eq!(card.expiration(), "0931");
        assert_eq!(card.last4(), "1111");
        assert_eq!(card.network(), Some(CardNetwork::Visa));

        let short_year = CardDetails::from_checkout("4111111111111111", "12 / 28", "999").unwrap();
        assert_eq!(short_year.expiration(), "1228");
    }

    #[test]
    fn test_card_details_incomplete() {
        let err = CardDetails::from_checkout("", "09 / 31", "123").unwrap_err();
        assert_eq!(err.to_string(), "Credit card details cannot be left incomplete.");
        assert!(CardDetails::from_checkout("4111111111111111", "", "123").is_err());
        assert!(CardDetails::from_checkout("4111111111111111", "09 / 31", " ").is_err());
        assert!(matches!(
            CardDetails::from_checkout("4111111111111111", "0931", "123"),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_card_details_rejects_non_numeric_expiry() {
        for expiry in ["12 / é1", "12 / 2é", "ab / 31", "09 / 3x", "09 / ３１"] {
            assert!(
                matches!(
                    CardDetails::from_checkout("4111111111111111", expiry, "123"),
                    Err(PaymentError::ValidationError(_))
                ),
                "{expiry}"
            );
        }

        let card = CardDetails::from_checkout("41111111111111é1", "09 / 31", "123").unwrap();
        assert_eq!(card.last4(), "11é1");
    }

    #[test]
    fn test_card_details_debug_masks_pan() {
        let card = CardDetails::from_checkout("4111111111111111", "09 / 31", "123").unwrap();
        let debug = format!("{card:?}");
        assert!(debug.contains("****1111"));
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("123"));
    }
}
