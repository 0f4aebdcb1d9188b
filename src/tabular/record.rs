use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransformError;

/// Which request fields feed the model, split by kind, in model order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSchema {
    pub numerical_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        let owned = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect();
        Self {
            numerical_columns: owned(&[
                "Medida_Pecho_cm",
                "Medida_Cintura_cm",
                "Medida_Cadera_cm",
                "Altura_cm",
                "Peso_kg",
                "Edad",
            ]),
            categorical_columns: owned(&[
                "Tipo_Prenda",
                "Talla_Ropa_General",
                "Talla_Zapatillas",
                "Talla_Pantalones",
            ]),
        }
    }
}

/// One input row, split into numeric and categorical parts.
/// `None` marks a value to be imputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub numeric: Vec<Option<f64>>,
    pub categorical: Vec<Option<String>>,
}

impl Record {
    /// Pick the schema's columns out of a JSON object. Absent keys, `null`
    /// and `""` are all treated as missing.
    pub fn from_json(value: &Value, schema: &FeatureSchema) -> Result<Self, TransformError> {
        let object = value.as_object().ok_or_else(|| TransformError::InvalidField {
            field: "body".to_string(),
            message: "expected a JSON object".to_string(),
        })?;

        let numeric = schema
            .numerical_columns
            .iter()
            .map(|col| parse_numeric(col, object.get(col)))
            .collect::<Result<_, _>>()?;
        let categorical = schema
            .categorical_columns
            .iter()
            .map(|col| parse_categorical(col, object.get(col)))
            .collect::<Result<_, _>>()?;

        Ok(Self { numeric, categorical })
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

pub fn parse_numeric(field: &str, value: Option<&Value>) -> Result<Option<f64>, TransformError> {
    if is_missing(value) {
        return Ok(None);
    }
    match value {
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| TransformError::InvalidField {
            field: field.to_string(),
            message: format!("{} is out of range", n),
        }),
        Some(Value::Bool(b)) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| TransformError::NotANumber(s.clone())),
        _ => Err(TransformError::InvalidField {
            field: field.to_string(),
            message: "expected a number or a numeric string".to_string(),
        }),
    }
}

pub fn parse_categorical(field: &str, value: Option<&Value>) -> Result<Option<String>, TransformError> {
    if is_missing(value) {
        return Ok(None);
    }
    match value {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        _ => Err(TransformError::InvalidField {
            field: field.to_string(),
            message: "expected a string, number or boolean".to_string(),
        }),
    }
}
