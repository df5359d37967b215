use serde::{Deserialize, Serialize};

use crate::{ElementDef, PlyError, ScalarType};

/// One value of some PLY scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
}

impl ScalarValue {
    /// Stores `value` as `ty`, with `as`-cast semantics.
    pub fn from_f64(ty: ScalarType, value: f64) -> Self {
        match ty {
            ScalarType::I8 => ScalarValue::I8(value as i8),
            ScalarType::U8 => ScalarValue::U8(value as u8),
            ScalarType::I16 => ScalarValue::I16(value as i16),
            ScalarType::U16 => ScalarValue::U16(value as u16),
            ScalarType::I32 => ScalarValue::I32(value as i32),
            ScalarType::U32 => ScalarValue::U32(value as u32),
            ScalarType::F32 => ScalarValue::F32(value as f32),
            ScalarType::F64 => ScalarValue::F64(value),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarValue::I8(_) => ScalarType::I8,
            ScalarValue::U8(_) => ScalarType::U8,
            ScalarValue::I16(_) => ScalarType::I16,
            ScalarValue::U16(_) => ScalarType::U16,
            ScalarValue::I32(_) => ScalarType::I32,
            ScalarValue::U32(_) => ScalarType::U32,
            ScalarValue::F32(_) => ScalarType::F32,
            ScalarValue::F64(_) => ScalarType::F64,
        }
    }

    /// Returns the value as integer, or `None` for floating point values.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            ScalarValue::I8(v) => Some(v.into()),
            ScalarValue::U8(v) => Some(v.into()),
            ScalarValue::I16(v) => Some(v.into()),
            ScalarValue::U16(v) => Some(v.into()),
            ScalarValue::I32(v) => Some(v.into()),
            ScalarValue::U32(v) => Some(v.into()),
            ScalarValue::F32(_) | ScalarValue::F64(_) => None,
        }
    }

    /// Every PLY scalar fits an `f64` exactly.
    pub fn as_f64(&self) -> f64 {
        match *self {
            ScalarValue::I8(v) => v.into(),
            ScalarValue::U8(v) => v.into(),
            ScalarValue::I16(v) => v.into(),
            ScalarValue::U16(v) => v.into(),
            ScalarValue::I32(v) => v.into(),
            ScalarValue::U32(v) => v.into(),
            ScalarValue::F32(v) => v.into(),
            ScalarValue::F64(v) => v,
        }
    }

    pub fn cast(&self, ty: ScalarType) -> ScalarValue {
        if self.scalar_type() == ty {
            *self
        } else {
            ScalarValue::from_f64(ty, self.as_f64())
        }
    }
}

/// The value of one property in one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<ScalarValue> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ScalarValue]> {
        match self {
            Value::Scalar(_) => None,
            Value::List(items) => Some(items),
        }
    }
}

/// One decoded row of an element, positionally matching its properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the property called `name` in `def`.
    pub fn get(&self, def: &ElementDef, name: &str) -> Option<&Value> {
        self.values.get(def.property_index(name)?)
    }

    /// Map this record onto a serde type, fields matched by property name.
    pub fn deserialize_as<T>(&self, def: &ElementDef) -> Result<T, PlyError>
    where
        T: for<'de> Deserialize<'de>,
    {
        T::deserialize(crate::de::RecordDeserializer::new(def, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_access() {
        assert_eq!(ScalarValue::U32(u32::MAX).as_integer(), Some(u32::MAX as i64));
        assert_eq!(ScalarValue::I8(-3).as_integer(), Some(-3));
        assert_eq!(ScalarValue::F32(1.0).as_integer(), None);
    }

    #[test]
    fn test_cast() {
        assert_eq!(ScalarValue::F64(2.0).cast(ScalarType::U8), ScalarValue::U8(2));
        assert_eq!(ScalarValue::I16(-1).cast(ScalarType::F32), ScalarValue::F32(-1.0));
        assert_eq!(ScalarValue::U8(7).cast(ScalarType::U8), ScalarValue::U8(7));
    }

    #[test]
    fn test_get_by_name() {
        let def = ElementDef::new("vertex", 1)
            .with_property(crate::PlyProperty::scalar("x", ScalarType::F32))
            .with_property(crate::PlyProperty::scalar("y", ScalarType::F32));
        let record = Record::new(vec![
            Value::Scalar(ScalarValue::F32(1.0)),
            Value::Scalar(ScalarValue::F32(2.0)),
        ]);
        assert_eq!(
            record.get(&def, "y"),
            Some(&Value::Scalar(ScalarValue::F32(2.0)))
        );
        assert_eq!(record.get(&def, "z"), None);
    }
}
