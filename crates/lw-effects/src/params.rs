use lw_core::error::CoreError;
use lw_core::tunables::TunableValue;

/// Descripteur statique d'un paramètre d'effet.
///
/// Le kind est porté par la valeur par défaut ; min/max/step partagent ce
/// kind. Les quatre kinds sont ceux du tunable store.
///
/// # Example
/// ```
/// use lw_effects::params::ParamDescriptor;
/// use lw_core::tunables::TunableValue;
/// const SPEED: ParamDescriptor = ParamDescriptor {
///     name: "speed",
///     default: TunableValue::F32(1.0),
///     min: Some(TunableValue::F32(0.0)),
///     max: Some(TunableValue::F32(8.0)),
///     step: Some(TunableValue::F32(0.05)),
///     group: "motion",
///     advanced: false,
/// };
/// assert_eq!(SPEED.kind_name(), "f32");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ParamDescriptor {
    /// Parameter name, stable ASCII.
    pub name: &'static str,
    /// Default value; defines the kind.
    pub default: TunableValue,
    /// Optional lower bound.
    pub min: Option<TunableValue>,
    /// Optional upper bound.
    pub max: Option<TunableValue>,
    /// Optional UI step hint.
    pub step: Option<TunableValue>,
    /// Grouping label for UIs.
    pub group: &'static str,
    /// Hidden behind the "advanced" fold in UIs.
    pub advanced: bool,
}

impl ParamDescriptor {
    /// Kind name of this parameter.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.default.kind_name()
    }

    /// Validate a candidate value against kind and range.
    ///
    /// # Errors
    /// `TypeMismatch` when the kinds differ, `OutOfRange` when the value
    /// leaves the declared bounds.
    pub fn validate(&self, value: TunableValue) -> Result<(), CoreError> {
        if value.kind_name() != self.default.kind_name() {
            return Err(CoreError::TypeMismatch {
                name: self.name.to_string(),
                expected: self.default.kind_name(),
                got: value.kind_name(),
            });
        }
        if let Some(v) = value.as_f64() {
            let min = self.min.as_ref().and_then(TunableValue::as_f64);
            let max = self.max.as_ref().and_then(TunableValue::as_f64);
            if min.is_some_and(|m| v < m) || max.is_some_and(|m| v > m) {
                return Err(CoreError::OutOfRange {
                    name: self.name.to_string(),
                    value: format!("{v}"),
                    min: min.map_or_else(|| "-inf".into(), |m| format!("{m}")),
                    max: max.map_or_else(|| "+inf".into(), |m| format!("{m}")),
                });
            }
        }
        Ok(())
    }
}

/// Shorthand for an f32 parameter with bounds, the common case.
#[must_use]
pub const fn f32_param(
    name: &'static str,
    default: f32,
    min: f32,
    max: f32,
    group: &'static str,
) -> ParamDescriptor {
    ParamDescriptor {
        name,
        default: TunableValue::F32(default),
        min: Some(TunableValue::F32(min)),
        max: Some(TunableValue::F32(max)),
        step: None,
        group,
        advanced: false,
    }
}

/// Shorthand for a u8 parameter with the full byte range.
#[must_use]
pub const fn u8_param(name: &'static str, default: u8, group: &'static str) -> ParamDescriptor {
    ParamDescriptor {
        name,
        default: TunableValue::U8(default),
        min: Some(TunableValue::U8(0)),
        max: Some(TunableValue::U8(255)),
        step: None,
        group,
        advanced: false,
    }
}

/// Look up a descriptor by name in an effect's static table.
#[must_use]
pub fn find<'a>(table: &'a [ParamDescriptor], name: &str) -> Option<&'a ParamDescriptor> {
    table.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[ParamDescriptor] = &[f32_param("gain", 1.0, 0.0, 2.0, "level")];

    #[test]
    fn validate_rejects_wrong_kind() {
        let d = find(TABLE, "gain").unwrap();
        assert_eq!(
            d.validate(TunableValue::Bool(true)).unwrap_err().code(),
            "TypeMismatch"
        );
    }

    #[test]
    fn validate_rejects_one_ulp_above_max() {
        let d = find(TABLE, "gain").unwrap();
        let above = f32::from_bits(2.0f32.to_bits() + 1);
        assert_eq!(
            d.validate(TunableValue::F32(above)).unwrap_err().code(),
            "OutOfRange"
        );
        assert!(d.validate(TunableValue::F32(2.0)).is_ok());
    }
}
