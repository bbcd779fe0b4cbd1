use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const REGISTRY_ID_LEN: usize = 14;
const FIRST_CHECK_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_CHECK_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Validated 14-digit business registry identifier (CNPJ), stored digits-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryId(String);

impl RegistryId {
    /// Strips every non-digit character from `raw`.
    pub fn clean(raw: &str) -> String {
        raw.chars().filter(char::is_ascii_digit).collect()
    }

    /// Structural check only: exactly 14 digits after cleaning and not all identical.
    pub fn has_valid_structure(raw: &str) -> bool {
        let digits = Self::clean(raw);
        digits.len() == REGISTRY_ID_LEN && !all_same(digits.as_bytes())
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// Cleans and validates `raw`, including both mod-11 check digits.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let digits = Self::clean(raw);
        if digits.len() != REGISTRY_ID_LEN {
            return Err(ValidationError::RegistryIdLength { len: digits.len() });
        }

        let values = digits
            .bytes()
            .map(|byte| u32::from(byte - b'0'))
            .collect::<Vec<_>>();
        if all_same(digits.as_bytes()) {
            return Err(ValidationError::RegistryIdRepeatedDigits);
        }

        let first = check_digit(&values[..12], &FIRST_CHECK_WEIGHTS);
        let second = check_digit(&values[..13], &SECOND_CHECK_WEIGHTS);
        if values[12] != first || values[13] != second {
            return Err(ValidationError::RegistryIdCheckDigit {
                expected: format!("{first}{second}"),
                found: digits[12..].to_owned(),
            });
        }

        Ok(Self(digits))
    }

    /// Digits-only form, as sent to providers and used as the cache key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Punctuated form `NN.NNN.NNN/NNNN-NN`.
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!(
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        )
    }
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

fn all_same(bytes: &[u8]) -> bool {
    bytes.windows(2).all(|pair| pair[0] == pair[1])
}

impl Display for RegistryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl TryFrom<String> for RegistryId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for RegistryId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RegistryId> for String {
    fn from(value: RegistryId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_punctuation() {
        assert_eq!(RegistryId::clean("11.222.333/0001-81"), "11222333000181");
        assert_eq!(RegistryId::clean(" 11 222 333 0001 81 "), "11222333000181");
    }

    #[test]
    fn formatted_input_passes_structure_then_check_digits() {
        let raw = "11.222.333/0001-81";
        assert!(RegistryId::has_valid_structure(raw));

        let parsed = RegistryId::parse(raw).expect("known-good registry id");
        assert_eq!(parsed.as_str(), "11222333000181");
        assert_eq!(parsed.to_string(), "11.222.333/0001-81");
    }

    #[test]
    fn accepts_known_good_identifiers() {
        for raw in ["11222333000181", "33.000.167/0001-01", "00.000.000/0001-91"] {
            assert!(RegistryId::is_valid(raw), "{raw} should be valid");
        }
    }

    #[test]
    fn rejects_altered_check_digits() {
        assert!(!RegistryId::is_valid("11222333000191"));
        assert!(!RegistryId::is_valid("11222333000182"));

        let err = RegistryId::parse("11222333000182").expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::RegistryIdCheckDigit {
                expected: String::from("81"),
                found: String::from("82"),
            }
        );
    }

    #[test]
    fn rejects_every_repeated_digit_identifier() {
        for digit in '0'..='9' {
            let raw = digit.to_string().repeat(14);
            assert!(!RegistryId::is_valid(&raw), "{raw} should be invalid");
            assert!(!RegistryId::has_valid_structure(&raw));
            assert_eq!(
                RegistryId::parse(&raw),
                Err(ValidationError::RegistryIdRepeatedDigits)
            );
        }
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            RegistryId::parse("1122233300018"),
            Err(ValidationError::RegistryIdLength { len: 13 })
        );
        assert_eq!(
            RegistryId::parse(""),
            Err(ValidationError::RegistryIdLength { len: 0 })
        );
        assert!(!RegistryId::is_valid("112223330001810"));
    }

    #[test]
    fn serde_round_trips_through_digits() {
        let id = RegistryId::parse("11.222.333/0001-81").expect("valid");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"11222333000181\"");

        let rejected = serde_json::from_str::<RegistryId>("\"11222333000180\"");
        assert!(rejected.is_err());
    }
}
