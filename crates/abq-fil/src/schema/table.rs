use super::{FieldSpec as F, RepeatGroup, Schema, SchemaRegistry};

/// Key codes of the standard table.
pub mod keys {
    pub const ELEMENT_HEADER: i64 = 1;
    pub const SDV: i64 = 5;
    pub const STRESS: i64 = 11;
    pub const STRESS_INVARIANTS: i64 = 12;
    pub const STRAIN: i64 = 21;
    pub const PLASTIC_STRAIN: i64 = 22;
    pub const CREEP_STRAIN: i64 = 23;
    pub const INELASTIC_STRAIN: i64 = 24;
    pub const ELASTIC_STRAIN: i64 = 25;
    pub const LOG_STRAIN: i64 = 89;
    pub const DISPLACEMENT: i64 = 101;
    pub const VELOCITY: i64 = 102;
    pub const ACCELERATION: i64 = 103;
    pub const REACTION_FORCE: i64 = 104;
    pub const ELECTRIC_POTENTIAL: i64 = 105;
    pub const CONCENTRATED_FORCE: i64 = 106;
    pub const NODAL_COORDINATES: i64 = 107;
    pub const NODAL_TEMPERATURE: i64 = 201;
    pub const SURFACE: i64 = 1501;
    pub const SURFACE_FACET: i64 = 1502;
    pub const ELEMENT: i64 = 1900;
    pub const NODE: i64 = 1901;
    pub const ACTIVE_DOF: i64 = 1902;
    pub const OUTPUT_REQUEST: i64 = 1911;
    pub const GENERAL_INFO: i64 = 1921;
    pub const HEADING: i64 = 1922;
    pub const NODE_SET: i64 = 1931;
    pub const NODE_SET_CONTINUATION: i64 = 1932;
    pub const ELEMENT_SET: i64 = 1933;
    pub const ELEMENT_SET_CONTINUATION: i64 = 1934;
    pub const LABEL: i64 = 1940;
    pub const ELEMENT_CONTINUATION: i64 = 1990;
    pub const INCREMENT_START: i64 = 2000;
    pub const INCREMENT_END: i64 = 2001;
}

fn repeat_of(field: F) -> RepeatGroup {
    RepeatGroup::new(vec![field])
}

/// Integration-point quantities: components only, the element identity
/// comes from the preceding element header.
fn element_result(key: i64, name: &'static str) -> Schema {
    Schema::repeating(key, name, Vec::new(), repeat_of(F::float("component")).at_least(1))
}

fn nodal_result(key: i64, name: &'static str) -> Schema {
    Schema::repeating(
        key,
        name,
        vec![F::int("node")],
        repeat_of(F::float("component")).at_least(1),
    )
}

fn model_records() -> Vec<Schema> {
    vec![
        Schema::fixed(
            keys::GENERAL_INFO,
            "INFO",
            vec![
                F::text("ver"),
                F::long_text("date", 2),
                F::text("time"),
                F::int("nelm"),
                F::int("nnod"),
                F::float("elsiz"),
            ],
        ),
        Schema::repeating(keys::HEADING, "HEADING", Vec::new(), repeat_of(F::text("text"))),
        Schema::repeating(
            keys::ELEMENT,
            "ELEMENT",
            vec![F::int("elnum"), F::text("eltyp")],
            repeat_of(F::int("node")).at_least(1),
        ),
        Schema::repeating(
            keys::ELEMENT_CONTINUATION,
            "ELEMENT_CONT",
            Vec::new(),
            repeat_of(F::int("node")),
        ),
        Schema::repeating(
            keys::NODE,
            "NODE",
            vec![F::int("nnum")],
            repeat_of(F::float("coord")).at_least(1),
        ),
        Schema::repeating(keys::ACTIVE_DOF, "DOF", Vec::new(), repeat_of(F::int("dof"))),
        Schema::repeating(
            keys::NODE_SET,
            "NSET",
            vec![F::text("label")],
            repeat_of(F::int("node")),
        ),
        Schema::repeating(
            keys::NODE_SET_CONTINUATION,
            "NSET_CONT",
            Vec::new(),
            repeat_of(F::int("node")),
        ),
        Schema::repeating(
            keys::ELEMENT_SET,
            "ELSET",
            vec![F::text("label")],
            repeat_of(F::int("element")),
        ),
        Schema::repeating(
            keys::ELEMENT_SET_CONTINUATION,
            "ELSET_CONT",
            Vec::new(),
            repeat_of(F::int("element")),
        ),
        Schema::repeating(
            keys::LABEL,
            "LABEL",
            vec![F::int("key")],
            repeat_of(F::text("label")).at_least(1),
        ),
        // For rigid surfaces `nmaster` holds the reference node and no
        // master surface names follow.
        Schema::repeating(
            keys::SURFACE,
            "SURFACE",
            vec![
                F::text("name"),
                F::int("sdim"),
                F::int("stype"),
                F::int("nfacet"),
                F::int("nmaster"),
            ],
            repeat_of(F::text("msurf")),
        ),
        Schema::repeating(
            keys::SURFACE_FACET,
            "FACET",
            vec![F::int("elnum"), F::int("face"), F::int("nnodes")],
            repeat_of(F::int("node")).at_least(1),
        ),
        Schema::fixed(
            keys::OUTPUT_REQUEST,
            "OUTPUT",
            vec![F::int("out_type"), F::text("out_set"), F::text("out_element")],
        ),
    ]
}

fn history_records() -> Vec<Schema> {
    vec![
        Schema::fixed(
            keys::INCREMENT_START,
            "INC_START",
            vec![
                F::float("ttime"),
                F::float("stime"),
                F::float("cratio"),
                F::float("sampl"),
                F::int("procid"),
                F::int("step"),
                F::int("incr"),
                F::int("lpert"),
                F::float("lpf"),
                F::float("freq"),
                F::float("tinc"),
                F::long_text("subheading", 10),
            ],
        ),
        // Sized by the writer so the next record starts on a block boundary.
        Schema::repeating(keys::INCREMENT_END, "INC_END", Vec::new(), repeat_of(F::int("pad"))),
    ]
}

fn result_records() -> Vec<Schema> {
    vec![
        Schema::fixed(
            keys::ELEMENT_HEADER,
            "ELHEAD",
            vec![
                F::int("num"),
                F::int("ipnum"),
                F::int("spnum"),
                F::int("loc"),
                F::text("rebarname"),
                F::int("ndi"),
                F::int("nshr"),
                F::int("ndir"),
                F::int("nsfc"),
            ],
        ),
        element_result(keys::SDV, "SDV"),
        element_result(keys::STRESS, "S"),
        element_result(keys::STRESS_INVARIANTS, "SINV"),
        element_result(keys::STRAIN, "E"),
        element_result(keys::PLASTIC_STRAIN, "PE"),
        element_result(keys::CREEP_STRAIN, "CE"),
        element_result(keys::INELASTIC_STRAIN, "IE"),
        element_result(keys::ELASTIC_STRAIN, "EE"),
        element_result(keys::LOG_STRAIN, "LE"),
        nodal_result(keys::DISPLACEMENT, "U"),
        nodal_result(keys::VELOCITY, "V"),
        nodal_result(keys::ACCELERATION, "A"),
        nodal_result(keys::REACTION_FORCE, "RF"),
        nodal_result(keys::ELECTRIC_POTENTIAL, "EPOT"),
        nodal_result(keys::CONCENTRATED_FORCE, "CF"),
        nodal_result(keys::NODAL_COORDINATES, "COORD"),
        nodal_result(keys::NODAL_TEMPERATURE, "NT"),
    ]
}

pub(super) fn standard() -> SchemaRegistry {
    model_records()
        .into_iter()
        .chain(history_records())
        .chain(result_records())
        .fold(SchemaRegistry::builder(), |builder, schema| builder.schema(schema))
        .build()
}
