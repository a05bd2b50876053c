#[cfg(test)]
mod tests {
    use crate::catalog::schema::SchemaBuilder;
    use crate::db_types::value::{DataType, Value};
    use crate::errors::RecordError;
    use crate::storage::tuple;

    fn people_schema() -> crate::catalog::schema::Schema {
        SchemaBuilder::new()
            .add_varchar("name", 32)
            .add_int("age")
            .add_real("height")
            .build()
    }

    fn peter() -> Vec<Value> {
        vec![
            Value::Varchar("Peter".to_string()),
            Value::Int(24),
            Value::Real(1.92),
        ]
    }

    #[test]
    fn round_trip() {
        let schema = people_schema();
        let values = peter();
        let data = tuple::encode_values(&schema, &values).unwrap();

        // varchar prefix + 5 bytes, then two 4-byte fields
        assert_eq!(data.len(), 4 + 5 + 4 + 4);
        assert_eq!(tuple::wire_size(&schema, &data).unwrap(), data.len());

        let decoded = tuple::decode_values(&schema, &data).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0], Value::Varchar("Peter".to_string()));
        assert_eq!(decoded[1], Value::Int(24));
        assert_eq!(decoded[2], Value::Real(1.92));
    }

    #[test]
    fn varchar_is_variable_length_on_the_wire() {
        let schema = people_schema();
        let short = tuple::encode_values(
            &schema,
            &[Value::Varchar("x".to_string()), Value::Int(1), Value::Real(0.0)],
        )
        .unwrap();
        let long = tuple::encode_values(
            &schema,
            &[
                Value::Varchar("x".repeat(32)),
                Value::Int(1),
                Value::Real(0.0),
            ],
        )
        .unwrap();
        assert_eq!(long.len() - short.len(), 31);
    }

    #[test]
    fn read_single_fields() {
        let schema = people_schema();
        let data = tuple::encode_values(&schema, &peter()).unwrap();
        assert_eq!(
            tuple::read_field(&schema, &data, 0).unwrap(),
            Value::Varchar("Peter".to_string())
        );
        assert_eq!(tuple::read_field(&schema, &data, 1).unwrap(), Value::Int(24));
        assert_eq!(
            tuple::read_field(&schema, &data, 2).unwrap(),
            Value::Real(1.92)
        );
        assert!(matches!(
            tuple::read_field(&schema, &data, 3),
            Err(RecordError::MalformedTuple)
        ));
    }

    #[test]
    fn encode_rejects_bad_tuples() {
        let schema = people_schema();
        assert!(matches!(
            tuple::encode_values(&schema, &[Value::Int(1)]),
            Err(RecordError::MalformedTuple)
        ));
        assert!(matches!(
            tuple::encode_values(
                &schema,
                &[Value::Int(1), Value::Int(2), Value::Real(3.0)]
            ),
            Err(RecordError::TypeMismatch(_))
        ));
        assert!(matches!(
            tuple::encode_values(
                &schema,
                &[
                    Value::Varchar("y".repeat(33)),
                    Value::Int(1),
                    Value::Real(0.0)
                ]
            ),
            Err(RecordError::TypeMismatch(_))
        ));
    }

    #[test]
    fn decode_rejects_truncated_data() {
        let schema = people_schema();
        let data = tuple::encode_values(&schema, &peter()).unwrap();
        assert!(matches!(
            tuple::decode_values(&schema, &data[..data.len() - 1]),
            Err(RecordError::MalformedTuple)
        ));
        let mut padded = data.clone();
        padded.push(0);
        assert!(matches!(
            tuple::decode_values(&schema, &padded),
            Err(RecordError::MalformedTuple)
        ));
    }

    #[test]
    fn value_comparison() {
        use std::cmp::Ordering;
        assert_eq!(
            Value::Int(3).compare(&Value::Int(5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Real(2.5).compare(&Value::Real(2.5)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Varchar("b".to_string()).compare(&Value::Varchar("a".to_string())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(3).compare(&Value::Real(3.0)), None);
        assert_eq!(Value::Int(3).data_type(), DataType::Int);
    }

    #[test]
    fn format_record_names_fields() {
        let schema = people_schema();
        let data = tuple::encode_values(&schema, &peter()).unwrap();
        let text = tuple::format_record(&schema, &data).unwrap();
        assert_eq!(text, "name: Peter, age: 24, height: 1.92");
    }
}
