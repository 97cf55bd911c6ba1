//! Field declarations and per-kind validation.
//!
//! A record type declares its attributes as fields of one of five kinds (boolean, text,
//! integer, long, float). Each kind has its own constraint set and its own `validate` routine,
//! which either coerces a candidate value into the field's native BSON representation or
//! rejects it with a [`ValidationError`].
//!
//! # Example
//!
//! ```ignore
//! use recordlayer::fields::{TextField, IntegerField};
//!
//! let title = TextField::new().max_length(50);
//! let age = IntegerField::new().positive_only().max_digits(3).required(false);
//! ```

use bson::Bson;
use std::fmt;

use crate::error::{Sign, ValidationError};

const PREVIEW_CHARS: usize = 20;

/// The kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindName {
    Boolean,
    Text,
    Integer,
    Long,
    Float,
}

impl fmt::Display for KindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KindName::Boolean => "boolean",
            KindName::Text => "text",
            KindName::Integer => "integer",
            KindName::Long => "long",
            KindName::Float => "float",
        })
    }
}

/// Identifies a field in diagnostics: its bound name and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLabel {
    pub name: String,
    pub kind: KindName,
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// Options shared by every field kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOptions {
    /// Whether a null or absent value is an error when no default is configured.
    pub required: bool,
    /// `None` means no default is configured; `Some(Bson::Null)` is a literal null default.
    pub default: Option<Bson>,
    /// Whether incoming values are coerced to the field's kind instead of type-checked.
    pub convert_type: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            required: true,
            default: None,
            convert_type: true,
        }
    }
}

/// Sign and magnitude constraints shared by the numeric kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberRules {
    pub positive_only: bool,
    pub negative_only: bool,
    /// Only enforced when greater than zero.
    pub max_digits: Option<u32>,
}

/// A boolean field. Coercion accepts only integer-equivalent 0 and 1.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanField {
    options: FieldOptions,
}

/// A text field with optional length bounds, measured in UTF-8 bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    options: FieldOptions,
    min_length: Option<usize>,
    max_length: Option<usize>,
    utf8: bool,
}

/// A 32-bit integer field.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerField {
    options: FieldOptions,
    rules: NumberRules,
}

/// A 64-bit integer field.
#[derive(Debug, Clone, PartialEq)]
pub struct LongField {
    options: FieldOptions,
    rules: NumberRules,
}

/// A double precision field with optional decimal constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatField {
    options: FieldOptions,
    rules: NumberRules,
    max_decimals: Option<u32>,
    round_decimals: bool,
}

macro_rules! field_options {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $ty {
                /// Marks the field as required (the default) or optional.
                pub fn required(mut self, required: bool) -> Self {
                    self.options.required = required;
                    self
                }

                /// Sets the value a null or absent input resolves to.
                pub fn with_default(mut self, value: impl Into<Bson>) -> Self {
                    self.options.default = Some(value.into());
                    self
                }

                /// Coerce incoming values (the default) or reject type mismatches.
                pub fn convert_type(mut self, convert: bool) -> Self {
                    self.options.convert_type = convert;
                    self
                }
            }
        )+
    };
}

macro_rules! number_rules {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $ty {
                /// Rejects values that are not strictly greater than zero.
                pub fn positive_only(mut self) -> Self {
                    self.rules.positive_only = true;
                    self
                }

                /// Rejects values that are not strictly less than zero.
                pub fn negative_only(mut self) -> Self {
                    self.rules.negative_only = true;
                    self
                }

                /// Requires `-10^digits < value < 10^digits`.
                pub fn max_digits(mut self, digits: u32) -> Self {
                    self.rules.max_digits = Some(digits);
                    self
                }
            }
        )+
    };
}

field_options!(BooleanField, TextField, IntegerField, LongField, FloatField);
number_rules!(IntegerField, LongField, FloatField);

impl BooleanField {
    pub fn new() -> Self {
        Self { options: FieldOptions::default() }
    }

    fn check(&self, label: &FieldLabel, value: &Bson) -> Result<Bson, ValidationError> {
        if !self.options.convert_type {
            return match value {
                Bson::Boolean(_) => Ok(value.clone()),
                _ => Err(wrong_type(label, "boolean", value)),
            };
        }

        match integer_equivalent(value) {
            Some(0) => Ok(Bson::Boolean(false)),
            Some(1) => Ok(Bson::Boolean(true)),
            _ => Err(ValidationError::NotBoolean {
                field: label.clone(),
                value: value.to_string(),
            }),
        }
    }
}

impl TextField {
    pub fn new() -> Self {
        Self {
            options: FieldOptions::default(),
            min_length: None,
            max_length: None,
            utf8: true,
        }
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// When disabled, only ASCII text is accepted.
    pub fn utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    fn check(&self, label: &FieldLabel, value: &Bson) -> Result<Bson, ValidationError> {
        let text = if self.options.convert_type {
            match value {
                Bson::String(s) => s.clone(),
                Bson::Int32(v) => v.to_string(),
                Bson::Int64(v) => v.to_string(),
                Bson::Double(v) => format_float(*v),
                Bson::Boolean(v) => v.to_string(),
                _ => return Err(wrong_type(label, "text", value)),
            }
        } else {
            match value {
                Bson::String(s) => s.clone(),
                _ => return Err(wrong_type(label, "text", value)),
            }
        };

        if !self.utf8 && !text.is_ascii() {
            return Err(wrong_type(label, "ascii text", value));
        }

        let length = text.len();
        if let Some(min) = self.min_length {
            if length < min {
                return Err(ValidationError::TooShort {
                    field: label.clone(),
                    min,
                    length,
                    preview: preview(&text),
                });
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return Err(ValidationError::TooLong {
                    field: label.clone(),
                    max,
                    length,
                    preview: preview(&text),
                });
            }
        }

        Ok(Bson::String(text))
    }
}

impl IntegerField {
    pub fn new() -> Self {
        Self {
            options: FieldOptions::default(),
            rules: NumberRules::default(),
        }
    }

    fn check(&self, label: &FieldLabel, value: &Bson) -> Result<Bson, ValidationError> {
        let coerced = if self.options.convert_type {
            to_i64(value)
        } else {
            match value {
                Bson::Int32(v) => Some(*v as i64),
                Bson::Int64(v) => Some(*v),
                _ => None,
            }
        };
        let value = coerced
            .and_then(|v| i32::try_from(v).ok())
            .map(Bson::Int32)
            .ok_or_else(|| wrong_type(label, "integer", value))?;

        self.rules.check(label, &value)?;
        Ok(value)
    }
}

impl LongField {
    pub fn new() -> Self {
        Self {
            options: FieldOptions::default(),
            rules: NumberRules::default(),
        }
    }

    fn check(&self, label: &FieldLabel, value: &Bson) -> Result<Bson, ValidationError> {
        let coerced = if self.options.convert_type {
            to_i64(value)
        } else {
            match value {
                Bson::Int32(v) => Some(*v as i64),
                Bson::Int64(v) => Some(*v),
                _ => None,
            }
        };
        let value = coerced
            .map(Bson::Int64)
            .ok_or_else(|| wrong_type(label, "long", value))?;

        self.rules.check(label, &value)?;
        Ok(value)
    }
}

impl FloatField {
    pub fn new() -> Self {
        Self {
            options: FieldOptions::default(),
            rules: NumberRules::default(),
            max_decimals: None,
            round_decimals: false,
        }
    }

    pub fn max_decimals(mut self, decimals: u32) -> Self {
        self.max_decimals = Some(decimals);
        self
    }

    /// Round to `max_decimals` instead of rejecting values with more decimals.
    pub fn round_decimals(mut self, round: bool) -> Self {
        self.round_decimals = round;
        self
    }

    fn check(&self, label: &FieldLabel, value: &Bson) -> Result<Bson, ValidationError> {
        let coerced = if self.options.convert_type {
            to_f64(value)
        } else {
            match value {
                Bson::Double(v) => Some(*v),
                _ => None,
            }
        };
        let number = coerced.ok_or_else(|| wrong_type(label, "float", value))?;

        self.rules.check(label, &Bson::Double(number))?;

        let number = match self.max_decimals {
            Some(decimals) if self.round_decimals => round_to(number, decimals),
            Some(decimals) if fractional_digits(number) > decimals as usize => {
                return Err(ValidationError::TooManyDecimals {
                    field: label.clone(),
                    max_decimals: decimals,
                    value: number.to_string(),
                });
            }
            _ => number,
        };

        Ok(Bson::Double(number))
    }
}

impl NumberRules {
    fn check(&self, label: &FieldLabel, value: &Bson) -> Result<(), ValidationError> {
        if self.negative_only || self.positive_only {
            let number = as_number(value).ok_or_else(|| wrong_type(label, "number", value))?;

            if self.negative_only && !(number < 0.0) {
                return Err(ValidationError::WrongSign {
                    field: label.clone(),
                    expected: Sign::Negative,
                    value: value.to_string(),
                });
            }
            if self.positive_only && !(number > 0.0) {
                return Err(ValidationError::WrongSign {
                    field: label.clone(),
                    expected: Sign::Positive,
                    value: value.to_string(),
                });
            }
        }

        let Some(max_digits) = self.max_digits.filter(|digits| *digits > 0) else {
            return Ok(());
        };

        let within = match value {
            Bson::Int32(v) => integer_within(*v as i64, max_digits),
            Bson::Int64(v) => integer_within(*v, max_digits),
            _ => match as_number(value) {
                Some(number) => {
                    let bound = 10f64.powi(exponent(max_digits));
                    number > -bound && number < bound
                }
                None => return Err(wrong_type(label, "number", value)),
            },
        };

        if within {
            Ok(())
        } else {
            Err(ValidationError::TooManyDigits {
                field: label.clone(),
                max_digits,
                value: value.to_string(),
            })
        }
    }
}

impl Default for BooleanField {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for TextField {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for IntegerField {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for LongField {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for FloatField {
    fn default() -> Self {
        Self::new()
    }
}

/// A field's kind together with its kind-specific constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Boolean(BooleanField),
    Text(TextField),
    Integer(IntegerField),
    Long(LongField),
    Float(FloatField),
}

impl FieldKind {
    /// Returns the options shared by every kind.
    pub fn options(&self) -> &FieldOptions {
        match self {
            FieldKind::Boolean(f) => &f.options,
            FieldKind::Text(f) => &f.options,
            FieldKind::Integer(f) => &f.options,
            FieldKind::Long(f) => &f.options,
            FieldKind::Float(f) => &f.options,
        }
    }

    fn options_mut(&mut self) -> &mut FieldOptions {
        match self {
            FieldKind::Boolean(f) => &mut f.options,
            FieldKind::Text(f) => &mut f.options,
            FieldKind::Integer(f) => &mut f.options,
            FieldKind::Long(f) => &mut f.options,
            FieldKind::Float(f) => &mut f.options,
        }
    }

    /// Converts `value` to this kind's native representation without applying any constraint.
    ///
    /// Returns `None` for null and for values the kind cannot represent.
    fn coerce(&self, value: &Bson) -> Option<Bson> {
        match self {
            FieldKind::Boolean(_) => match value {
                Bson::Boolean(_) => Some(value.clone()),
                _ => match integer_equivalent(value)? {
                    0 => Some(Bson::Boolean(false)),
                    1 => Some(Bson::Boolean(true)),
                    _ => None,
                },
            },
            FieldKind::Text(_) => match value {
                Bson::String(_) => Some(value.clone()),
                Bson::Int32(v) => Some(Bson::String(v.to_string())),
                Bson::Int64(v) => Some(Bson::String(v.to_string())),
                Bson::Double(v) => Some(Bson::String(format_float(*v))),
                Bson::Boolean(v) => Some(Bson::String(v.to_string())),
                _ => None,
            },
            FieldKind::Integer(_) => to_i64(value)
                .and_then(|v| i32::try_from(v).ok())
                .map(Bson::Int32),
            FieldKind::Long(_) => to_i64(value).map(Bson::Int64),
            FieldKind::Float(_) => to_f64(value).map(Bson::Double),
        }
    }

    /// Stores the configured default in the kind's native representation, so that it compares
    /// equal to the values `validate` produces. Defaults the kind cannot represent are kept as
    /// declared.
    fn normalize_default(&mut self) {
        let coerced = self
            .options()
            .default
            .as_ref()
            .and_then(|default| self.coerce(default));

        if let Some(default) = coerced {
            self.options_mut().default = Some(default);
        }
    }

    pub fn name(&self) -> KindName {
        match self {
            FieldKind::Boolean(_) => KindName::Boolean,
            FieldKind::Text(_) => KindName::Text,
            FieldKind::Integer(_) => KindName::Integer,
            FieldKind::Long(_) => KindName::Long,
            FieldKind::Float(_) => KindName::Float,
        }
    }
}

impl From<BooleanField> for FieldKind {
    fn from(field: BooleanField) -> Self {
        FieldKind::Boolean(field)
    }
}

impl From<TextField> for FieldKind {
    fn from(field: TextField) -> Self {
        FieldKind::Text(field)
    }
}

impl From<IntegerField> for FieldKind {
    fn from(field: IntegerField) -> Self {
        FieldKind::Integer(field)
    }
}

impl From<LongField> for FieldKind {
    fn from(field: LongField) -> Self {
        FieldKind::Long(field)
    }
}

impl From<FloatField> for FieldKind {
    fn from(field: FloatField) -> Self {
        FieldKind::Float(field)
    }
}

/// A field declaration bound to the attribute name it was registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    label: FieldLabel,
    kind: FieldKind,
}

impl Field {
    /// Binds a field declaration to an attribute name.
    ///
    /// The default, if any, is converted to the kind's native type here; constraint rules are
    /// not applied to it.
    pub fn new(name: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        let mut kind = kind.into();
        kind.normalize_default();

        Self {
            label: FieldLabel {
                name: name.into(),
                kind: kind.name(),
            },
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.label.name
    }

    pub fn label(&self) -> &FieldLabel {
        &self.label
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.kind.options().required
    }

    /// Returns the configured default, or `None` when no default is configured.
    pub fn default_value(&self) -> Option<&Bson> {
        self.kind.options().default.as_ref()
    }

    /// Returns the value a freshly constructed record starts with: the default, or null.
    pub fn initial_value(&self) -> Bson {
        self.default_value().cloned().unwrap_or(Bson::Null)
    }

    /// Returns `true` if `value` equals the configured default.
    pub fn is_default(&self, value: &Bson) -> bool {
        self.default_value() == Some(value)
    }

    /// Validates a candidate value, returning it coerced to the field's kind.
    ///
    /// Null and absent values resolve to the default when one is configured, fail when the
    /// field is required, and pass through as null otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming this field when a type or constraint check fails.
    pub fn validate(&self, value: Option<&Bson>) -> Result<Bson, ValidationError> {
        let options = self.kind.options();

        let value = match value {
            None | Some(Bson::Null) => {
                return match (&options.default, options.required) {
                    (Some(default), _) => Ok(default.clone()),
                    (None, true) => Err(ValidationError::MissingRequired {
                        field: self.label.clone(),
                    }),
                    (None, false) => Ok(Bson::Null),
                };
            }
            Some(value) => value,
        };

        match &self.kind {
            FieldKind::Boolean(f) => f.check(&self.label, value),
            FieldKind::Text(f) => f.check(&self.label, value),
            FieldKind::Integer(f) => f.check(&self.label, value),
            FieldKind::Long(f) => f.check(&self.label, value),
            FieldKind::Float(f) => f.check(&self.label, value),
        }
    }
}

fn wrong_type(label: &FieldLabel, expected: &'static str, value: &Bson) -> ValidationError {
    ValidationError::WrongType {
        field: label.clone(),
        expected,
        value: value.to_string(),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{} [...]", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Counts the digits after the decimal point in the shortest representation of `value`.
fn fractional_digits(value: f64) -> usize {
    value
        .to_string()
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.len())
}

fn exponent(digits: u32) -> i32 {
    i32::try_from(digits).unwrap_or(i32::MAX)
}

/// Rounds `value` half away from zero to `decimals` places. Values too large to scale are
/// already integral and come back unchanged.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(exponent(decimals));
    let scaled = value * factor;

    if !scaled.is_finite() {
        return value;
    }

    scaled.round() / factor
}

fn integer_within(value: i64, max_digits: u32) -> bool {
    match 10i128.checked_pow(max_digits) {
        Some(bound) => (value as i128).abs() < bound,
        None => true,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn float_to_i64(value: f64) -> Option<i64> {
    let truncated = value.trunc();

    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

fn to_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(*v as i64),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) => float_to_i64(*v),
        Bson::Boolean(v) => Some(*v as i64),
        Bson::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        Bson::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
        Bson::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Like [`to_i64`], but floats only count when they are integral.
fn integer_equivalent(value: &Bson) -> Option<i64> {
    match value {
        Bson::Double(v) if v.fract() != 0.0 => None,
        _ => to_i64(value),
    }
}
