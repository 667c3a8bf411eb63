//! Clinical record: the seven model inputs in training order

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Number of model input features
pub const FEATURE_COUNT: usize = 7;

/// Feature names exactly as the classifier was trained with, in column order.
///
/// Artifacts are checked against this list at load time.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "WBC>6.2 & NLR>1.95",
    "IL-6",
    "DDI",
    "CRP>42.5 & LDH>325",
    "Tracheal stenosis",
    "Cavity",
];

/// Human-readable labels used by the input form
pub const FEATURE_LABELS: [&str; FEATURE_COUNT] = [
    "Age",
    "WBC > 6.2 and NLR > 1.95",
    "IL-6",
    "D-dimer (DDI)",
    "CRP > 42.5 and LDH > 325",
    "Tracheal stenosis",
    "Pulmonary cavity",
];

/// A binary clinical indicator, encoded as 0/1 for the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BinaryFlag {
    #[default]
    Absent,
    Present,
}

impl BinaryFlag {
    pub fn as_f64(self) -> f64 {
        match self {
            BinaryFlag::Absent => 0.0,
            BinaryFlag::Present => 1.0,
        }
    }
}

/// A flag encoding other than 0 or 1
///
/// Raised during deserialization, where the field name is not known; the
/// deserializer reports the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a valid flag value (expected 0 or 1)")]
pub struct FlagValueError(pub u8);

impl TryFrom<u8> for BinaryFlag {
    type Error = FlagValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BinaryFlag::Absent),
            1 => Ok(BinaryFlag::Present),
            other => Err(FlagValueError(other)),
        }
    }
}

impl From<BinaryFlag> for u8 {
    fn from(flag: BinaryFlag) -> Self {
        match flag {
            BinaryFlag::Absent => 0,
            BinaryFlag::Present => 1,
        }
    }
}

/// Errors raised while building a clinical record from user input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("{field}: value is required")]
    Missing { field: &'static str },

    #[error("{field}: '{value}' is not a number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field}: value must be finite")]
    NonFinite { field: &'static str },

    #[error("{field}: '{value}' is not a valid choice (expected 0 or 1)")]
    InvalidFlag { field: &'static str, value: String },
}

/// One patient's inputs, in the classifier's feature order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClinicalRecord {
    /// Age in years
    #[schema(example = 5.0)]
    pub age: f64,
    /// WBC > 6.2 and NLR > 1.95 (0 or 1)
    #[schema(value_type = u8, example = 0)]
    pub wbc_nlr: BinaryFlag,
    /// Interleukin-6
    #[schema(example = 15.0)]
    pub il6: f64,
    /// D-dimer
    #[schema(example = 0.5)]
    pub ddi: f64,
    /// CRP > 42.5 and LDH > 325 (0 or 1)
    #[schema(value_type = u8, example = 0)]
    pub crp_ldh: BinaryFlag,
    /// Tracheal stenosis present (0 or 1)
    #[schema(value_type = u8, example = 0)]
    pub tracheal_stenosis: BinaryFlag,
    /// Pulmonary cavity present (0 or 1)
    #[schema(value_type = u8, example = 0)]
    pub cavity: BinaryFlag,
}

impl Default for ClinicalRecord {
    fn default() -> Self {
        Self {
            age: 5.0,
            wbc_nlr: BinaryFlag::Absent,
            il6: 15.0,
            ddi: 0.5,
            crp_ldh: BinaryFlag::Absent,
            tracheal_stenosis: BinaryFlag::Absent,
            cavity: BinaryFlag::Absent,
        }
    }
}

impl ClinicalRecord {
    /// Feature vector in `FEATURE_NAMES` order
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.wbc_nlr.as_f64(),
            self.il6,
            self.ddi,
            self.crp_ldh.as_f64(),
            self.tracheal_stenosis.as_f64(),
            self.cavity.as_f64(),
        ]
    }

    /// Reject values the classifier cannot route (NaN, infinities)
    pub fn validate(&self) -> Result<(), RecordError> {
        let numeric = [("Age", self.age), ("IL-6", self.il6), ("DDI", self.ddi)];
        for (field, value) in numeric {
            if !value.is_finite() {
                return Err(RecordError::NonFinite { field });
            }
        }
        Ok(())
    }
}

/// Parse a free-text numeric form field
pub fn parse_number(field: &'static str, raw: Option<&str>) -> Result<f64, RecordError> {
    let raw = raw.ok_or(RecordError::Missing { field })?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })?;
    if !value.is_finite() {
        return Err(RecordError::NonFinite { field });
    }
    Ok(value)
}

/// Parse a 0/1 select form field
pub fn parse_flag(field: &'static str, raw: Option<&str>) -> Result<BinaryFlag, RecordError> {
    match raw.ok_or(RecordError::Missing { field })?.trim() {
        "0" => Ok(BinaryFlag::Absent),
        "1" => Ok(BinaryFlag::Present),
        other => Err(RecordError::InvalidFlag {
            field,
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order_matches_names() {
        let record = ClinicalRecord {
            age: 1.0,
            wbc_nlr: BinaryFlag::Present,
            il6: 3.0,
            ddi: 4.0,
            crp_ldh: BinaryFlag::Absent,
            tracheal_stenosis: BinaryFlag::Present,
            cavity: BinaryFlag::Absent,
        };
        assert_eq!(record.to_features(), [1.0, 1.0, 3.0, 4.0, 0.0, 1.0, 0.0]);
        assert_eq!(FEATURE_NAMES[0], "Age");
        assert_eq!(FEATURE_NAMES[6], "Cavity");
    }

    #[test]
    fn test_default_record_matches_form_defaults() {
        let record = ClinicalRecord::default();
        assert_eq!(record.to_features(), [5.0, 0.0, 15.0, 0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_flag_json_encoding() {
        let record: ClinicalRecord = serde_json::from_str(
            r#"{"age":5.0,"wbc_nlr":1,"il6":15.0,"ddi":0.5,"crp_ldh":0,"tracheal_stenosis":0,"cavity":1}"#,
        )
        .unwrap();
        assert_eq!(record.wbc_nlr, BinaryFlag::Present);
        assert_eq!(record.cavity, BinaryFlag::Present);

        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["cavity"], 1);
    }

    #[test]
    fn test_flag_json_rejects_other_values() {
        let result: Result<ClinicalRecord, _> = serde_json::from_str(
            r#"{"age":5.0,"wbc_nlr":2,"il6":15.0,"ddi":0.5,"crp_ldh":0,"tracheal_stenosis":0,"cavity":0}"#,
        );
        let message = result.unwrap_err().to_string();
        assert!(message.contains("2 is not a valid flag value"), "{message}");
        assert!(!message.contains("flag:"), "{message}");
    }

    #[test]
    fn test_flag_try_from() {
        assert_eq!(BinaryFlag::try_from(1), Ok(BinaryFlag::Present));
        assert_eq!(BinaryFlag::try_from(7), Err(FlagValueError(7)));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("Age", Some(" 7.5 ")).unwrap(), 7.5);
        assert!(matches!(
            parse_number("Age", Some("abc")),
            Err(RecordError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_number("Age", Some("NaN")),
            Err(RecordError::NonFinite { .. })
        ));
        assert!(matches!(
            parse_number("Age", Some("inf")),
            Err(RecordError::NonFinite { .. })
        ));
        assert_eq!(
            parse_number("Age", None),
            Err(RecordError::Missing { field: "Age" })
        );
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("Cavity", Some("1")).unwrap(), BinaryFlag::Present);
        assert_eq!(parse_flag("Cavity", Some("0")).unwrap(), BinaryFlag::Absent);
        assert!(matches!(
            parse_flag("Cavity", Some("yes")),
            Err(RecordError::InvalidFlag { .. })
        ));
        assert_eq!(
            parse_flag("Cavity", None),
            Err(RecordError::Missing { field: "Cavity" })
        );
    }

    #[test]
    fn test_validate_rejects_nan() {
        let record = ClinicalRecord {
            il6: f64::NAN,
            ..ClinicalRecord::default()
        };
        assert_eq!(
            record.validate(),
            Err(RecordError::NonFinite { field: "IL-6" })
        );
    }
}
