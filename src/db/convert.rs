use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Convert a PgRow to a JSON object by inspecting column type info names.
///
/// NUMERIC is decoded through `rust_decimal` and kept as an
/// arbitrary-precision JSON number: it never round-trips through f64 and it
/// never degrades to a string the sanitizer could rewrite.
pub fn row_to_json(row: &PgRow) -> Value {
    let mut obj = Map::new();

    for col in row.columns() {
        let name = col.name().to_string();
        let ordinal = col.ordinal();
        let type_name = col.type_info().name().to_uppercase();

        let value = decode_column(row, ordinal, &type_name);
        obj.insert(name, value);
    }

    Value::Object(obj)
}

pub fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn decode_column(row: &PgRow, ordinal: usize, type_name: &str) -> Value {
    // Try NULL first
    if let Ok(v) = row.try_get_raw(ordinal) {
        if v.is_null() {
            return Value::Null;
        }
    }

    match type_name {
        "BOOL" => {
            if let Ok(v) = row.try_get::<bool, _>(ordinal) {
                return Value::Bool(v);
            }
        }

        "INT2" | "SMALLINT" | "SMALLSERIAL" => {
            if let Ok(v) = row.try_get::<i16, _>(ordinal) {
                return Value::Number(v.into());
            }
        }
        "INT4" | "INT" | "SERIAL" => {
            if let Ok(v) = row.try_get::<i32, _>(ordinal) {
                return Value::Number(v.into());
            }
        }
        "INT8" | "BIGINT" | "BIGSERIAL" | "OID" => {
            if let Ok(v) = row.try_get::<i64, _>(ordinal) {
                return Value::Number(v.into());
            }
        }

        "FLOAT4" | "REAL" => {
            if let Ok(v) = row.try_get::<f32, _>(ordinal) {
                return Number::from_f64(f64::from(v))
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
            }
        }
        "FLOAT8" | "DOUBLE PRECISION" => {
            if let Ok(v) = row.try_get::<f64, _>(ordinal) {
                return Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null);
            }
        }

        "NUMERIC" | "DECIMAL" => {
            if let Ok(v) = row.try_get::<rust_decimal::Decimal, _>(ordinal) {
                // Arbitrary-precision round-trip through the JSON number
                // grammar; the value never touches f64.
                if let Ok(n) = serde_json::from_str::<Number>(&v.to_string()) {
                    return Value::Number(n);
                }
            }
        }

        "TEXT" | "VARCHAR" | "NAME" | "BPCHAR" | "CHAR" | "CITEXT" => {
            if let Ok(v) = row.try_get::<String, _>(ordinal) {
                return Value::String(v);
            }
        }

        "UUID" => {
            if let Ok(v) = row.try_get::<uuid::Uuid, _>(ordinal) {
                return Value::String(v.to_string());
            }
        }

        "TIMESTAMPTZ" => {
            if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(ordinal) {
                return Value::String(v.to_rfc3339());
            }
        }
        "TIMESTAMP" => {
            if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(ordinal) {
                return Value::String(v.to_string());
            }
        }
        "DATE" => {
            if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(ordinal) {
                return Value::String(v.to_string());
            }
        }
        "TIME" => {
            if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(ordinal) {
                return Value::String(v.to_string());
            }
        }

        // JSON columns keep their structure so the sanitizer can recurse.
        "JSON" | "JSONB" => {
            if let Ok(v) = row.try_get::<Value, _>(ordinal) {
                return v;
            }
        }

        "INET" | "CIDR" => {
            if let Ok(v) = row.try_get::<std::net::IpAddr, _>(ordinal) {
                return Value::String(v.to_string());
            }
        }

        "BYTEA" => {
            if let Ok(v) = row.try_get::<Vec<u8>, _>(ordinal) {
                return Value::String(format!("(bytea: {} bytes)", v.len()));
            }
        }

        "TEXT[]" | "VARCHAR[]" | "NAME[]" => {
            if let Ok(v) = row.try_get::<Vec<String>, _>(ordinal) {
                return Value::Array(v.into_iter().map(Value::String).collect());
            }
        }
        "INT2[]" => {
            if let Ok(v) = row.try_get::<Vec<i16>, _>(ordinal) {
                return Value::Array(v.into_iter().map(|n| Value::Number(n.into())).collect());
            }
        }
        "INT4[]" => {
            if let Ok(v) = row.try_get::<Vec<i32>, _>(ordinal) {
                return Value::Array(v.into_iter().map(|n| Value::Number(n.into())).collect());
            }
        }
        "INT8[]" => {
            if let Ok(v) = row.try_get::<Vec<i64>, _>(ordinal) {
                return Value::Array(v.into_iter().map(|n| Value::Number(n.into())).collect());
            }
        }
        "FLOAT8[]" => {
            if let Ok(v) = row.try_get::<Vec<f64>, _>(ordinal) {
                return Value::Array(
                    v.into_iter()
                        .map(|n| Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null))
                        .collect(),
                );
            }
        }
        "NUMERIC[]" => {
            if let Ok(v) = row.try_get::<Vec<rust_decimal::Decimal>, _>(ordinal) {
                return Value::Array(
                    v.into_iter()
                        .map(|n| {
                            serde_json::from_str::<Number>(&n.to_string())
                                .map(Value::Number)
                                .unwrap_or(Value::Null)
                        })
                        .collect(),
                );
            }
        }
        "BOOL[]" => {
            if let Ok(v) = row.try_get::<Vec<bool>, _>(ordinal) {
                return Value::Array(v.into_iter().map(Value::Bool).collect());
            }
        }
        "UUID[]" => {
            if let Ok(v) = row.try_get::<Vec<uuid::Uuid>, _>(ordinal) {
                return Value::Array(
                    v.into_iter().map(|u| Value::String(u.to_string())).collect(),
                );
            }
        }
        "JSON[]" | "JSONB[]" => {
            if let Ok(v) = row.try_get::<Vec<Value>, _>(ordinal) {
                return Value::Array(v);
            }
        }

        _ => {}
    }

    // Fallback chain: try integer, float, bool, then string
    if let Ok(v) = row.try_get::<i64, _>(ordinal) {
        return Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<f64, _>(ordinal) {
        if let Some(n) = Number::from_f64(v) {
            return Value::Number(n);
        }
    }
    if let Ok(v) = row.try_get::<bool, _>(ordinal) {
        return Value::Bool(v);
    }
    if let Ok(v) = row.try_get::<String, _>(ordinal) {
        return Value::String(v);
    }

    Value::Null
}
