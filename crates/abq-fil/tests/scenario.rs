//! Unknown-key policy and the three-record synthetic scenario.

mod common;

use abq_fil::{
    DecodeError, DecoderOptions, FieldSpec, RecordBody, RepeatGroup, Schema, SchemaRegistry, Value,
};
use common::{Cell, FilWriter, decode_all, record};

fn scenario_registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .schema(Schema::fixed(
            1,
            "HEADER",
            vec![FieldSpec::int("major"), FieldSpec::int("minor")],
        ))
        .schema(Schema::repeating(
            101,
            "SERIES",
            vec![FieldSpec::int("id"), FieldSpec::int("count")],
            RepeatGroup::new(vec![FieldSpec::float("value")]),
        ))
        .build()
}

fn scenario_records() -> Vec<Vec<Cell>> {
    vec![
        record(1, &[Cell::Int(7), Cell::Int(42)]),
        record(
            101,
            &[
                Cell::Int(3),
                Cell::Int(9),
                Cell::Float(1.0),
                Cell::Float(2.0),
                Cell::Float(3.0),
            ],
        ),
        record(9999, &[Cell::Int(-5), Cell::Float(0.125)]),
    ]
}

#[test]
fn lenient_scenario_yields_three_records_in_order() {
    let registry = scenario_registry();
    let writer = FilWriter::default();
    let (records, err) = decode_all(
        writer.encode(&scenario_records()),
        DecoderOptions::lenient(),
        &registry,
    );
    assert!(err.is_none(), "unexpected error: {err:?}");
    assert_eq!(records.len(), 3);

    let header = &records[0];
    assert_eq!((header.key, header.offset), (1, 0));
    assert_eq!(header.field("major"), Some(&Value::Int(7)));
    assert_eq!(header.field("minor"), Some(&Value::Int(42)));

    let series = &records[1];
    assert_eq!((series.key, series.offset), (101, 4));
    assert_eq!(series.field("id"), Some(&Value::Int(3)));
    assert_eq!(series.field("count"), Some(&Value::Int(9)));
    let values: Vec<f64> = series.column("value").filter_map(Value::as_float).collect();
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
    assert_eq!(series.groups().len(), 3);

    let unknown = &records[2];
    assert_eq!((unknown.key, unknown.offset), (9999, 11));
    assert!(unknown.is_unknown());
    assert_eq!(unknown.name, None);
    assert_eq!(
        unknown.body,
        RecordBody::Unknown {
            words: vec![writer.word(Cell::Int(-5)), writer.word(Cell::Float(0.125))],
        }
    );
}

#[test]
fn strict_scenario_fails_at_the_unknown_record() {
    let registry = scenario_registry();
    let (records, err) = decode_all(
        FilWriter::default().encode(&scenario_records()),
        DecoderOptions::default(),
        &registry,
    );
    assert_eq!(records.len(), 2, "records before the unknown key still arrive");
    let err = err.expect("strict mode fails");
    assert_eq!(
        err.as_decode(),
        Some(&DecodeError::UnknownKey {
            key: 9999,
            offset: 11,
        })
    );
}

#[test]
fn unknown_record_mid_stream_leaves_neighbours_intact() {
    let registry = scenario_registry();
    let records = vec![
        record(1, &[Cell::Int(1), Cell::Int(2)]),
        record(4242, &[Cell::Float(9.5)]),
        record(101, &[Cell::Int(8), Cell::Int(0)]),
    ];
    let bytes = FilWriter::default().encode(&records);

    let (lenient, err) = decode_all(bytes.clone(), DecoderOptions::lenient(), &registry);
    assert!(err.is_none());
    let keys: Vec<i64> = lenient.iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![1, 4242, 101]);
    assert!(lenient[1].is_unknown());
    assert_eq!(lenient[1].raw_words().map(<[_]>::len), Some(1));
    assert!(lenient[2].groups().is_empty());
    assert_eq!(lenient[2].field("id"), Some(&Value::Int(8)));

    let (strict, err) = decode_all(bytes, DecoderOptions::default(), &registry);
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0], lenient[0]);
    assert!(matches!(
        err.as_ref().and_then(|e| e.as_decode()),
        Some(DecodeError::UnknownKey { key: 4242, offset: 4 })
    ));
}

#[test]
fn schema_mismatch_on_known_key_is_fatal_by_default() {
    let registry = scenario_registry();
    let records = vec![record(1, &[Cell::Int(1), Cell::Int(2), Cell::Int(3)])];
    let (decoded, err) = decode_all(
        FilWriter::default().encode(&records),
        DecoderOptions::lenient(),
        &registry,
    );
    assert!(decoded.is_empty());
    assert_eq!(
        err.as_ref().and_then(|e| e.as_decode()),
        Some(&DecodeError::SchemaMismatch { key: 1, length: 5 })
    );
}

#[test]
fn downgraded_mismatch_is_yielded_as_skipped() {
    let registry = scenario_registry();
    let records = vec![
        record(1, &[Cell::Int(1)]),
        record(1, &[Cell::Int(7), Cell::Int(42)]),
    ];
    let (decoded, err) = decode_all(
        FilWriter::default().encode(&records),
        DecoderOptions::lenient().with_downgrade_schema_mismatch(true),
        &registry,
    );
    assert!(err.is_none());
    assert_eq!(decoded.len(), 2);
    assert!(decoded[0].is_skipped());
    assert_eq!(decoded[0].raw_words().map(<[_]>::len), Some(1));
    assert_eq!(decoded[1].field("minor"), Some(&Value::Int(42)));
}

#[test]
fn downgrade_flag_alone_does_not_relax_strict_mode() {
    let registry = scenario_registry();
    let records = vec![
        record(1, &[Cell::Int(1)]),
        record(1, &[Cell::Int(7), Cell::Int(42)]),
    ];
    let (decoded, err) = decode_all(
        FilWriter::default().encode(&records),
        DecoderOptions::default().with_downgrade_schema_mismatch(true),
        &registry,
    );
    assert!(decoded.is_empty());
    assert_eq!(
        err.as_ref().and_then(|e| e.as_decode()),
        Some(&DecodeError::SchemaMismatch { key: 1, length: 3 })
    );
}
