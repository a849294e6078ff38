//! Tests for loading flows from JSON definitions.
use asakusa_flow::prelude::*;

const JOBFLOW_JSON: &str = r#"
{
    "batchId": "daily",
    "flowId": "summarize",
    "options": "+enableCombiner",
    "graph": {
        "name": "summarize",
        "models": [
            {
                "name": "Ex1",
                "properties": [
                    { "name": "sid", "type": "long" },
                    { "name": "value", "type": "int" },
                    { "name": "string", "type": "text" }
                ]
            }
        ],
        "inputs": [ { "name": "in", "model": "Ex1", "exchange": "file" } ],
        "outputs": [ { "name": "out", "model": "Ex1" } ],
        "operators": [
            {
                "name": "fold",
                "kind": { "type": "fold" },
                "declaringClass": "com.example.ExOperator",
                "method": "fold",
                "inputs": [ { "name": "in", "model": "Ex1", "key": { "group": ["value"] } } ],
                "outputs": [ { "name": "out", "model": "Ex1" } ]
            }
        ],
        "flowParts": [
            {
                "name": "clean",
                "graph": {
                    "name": "cleaning",
                    "inputs": [ { "name": "in", "model": "Ex1" } ],
                    "outputs": [ { "name": "out", "model": "Ex1" } ],
                    "operators": [
                        {
                            "name": "filter",
                            "kind": { "type": "branch" },
                            "class": "com.example.ExOperator",
                            "method": "filter",
                            "inputs": [ { "name": "in", "model": "Ex1" } ],
                            "outputs": [
                                { "name": "keep", "model": "Ex1" },
                                { "name": "drop", "model": "Ex1" }
                            ],
                            "connectivity": "optional"
                        }
                    ],
                    "connections": [
                        { "from": "in", "to": "filter" },
                        { "from": "filter.keep", "to": "out" }
                    ]
                }
            },
            { "name": "clean_again", "reuses": "clean" }
        ],
        "connections": [
            { "from": "in", "to": "clean" },
            { "from": "clean", "to": "clean_again" },
            { "from": "clean_again", "to": "fold" },
            { "from": "fold", "to": "out" }
        ]
    }
}
"#;

struct NoopIo;

impl ExternalIoProcessor for NoopIo {
    fn kind(&self) -> &str {
        "file"
    }
}

#[test]
fn test_jobflow_definition_compiles() {
    let definition = JobflowDefinition::from_json(JOBFLOW_JSON).expect("Failed to parse");
    assert_eq!(definition.batch_id, "daily");
    let options = definition.compiler_options().unwrap();
    assert!(options.enable_combiner);

    let graph = definition.graph.into_flow_graph().expect("Failed to convert");
    assert_eq!(graph.name(), "summarize");

    let jobflow = FlowCompiler::builder("daily", "summarize", graph)
        .with_options(options)
        .with_io_processor(Box::new(NoopIo))
        .build()
        .compile()
        .expect("Failed to compile");
    assert_eq!(jobflow.stages().len(), 1);
    // fold declares the default partial aggregation and combiners are enabled
    let shuffle = jobflow.stages()[0].shuffle.as_ref().unwrap();
    assert!(shuffle.combiner_class.is_some());
    assert!(jobflow.prologues().is_empty());
}

#[test]
fn test_operator_kinds_carry_metadata() {
    let definition = JobflowDefinition::from_json(JOBFLOW_JSON).unwrap();
    let fold = &definition.graph.operators[0];
    assert_eq!(
        fold.kind,
        OperatorKind::Fold {
            partial: PartialAggregation::Default
        }
    );

    let kind: OperatorKind =
        serde_json::from_str(r#"{ "type": "co_group", "buffer": "escape" }"#).unwrap();
    assert_eq!(kind.input_buffer(), Some(InputBuffer::Escape));
    assert!(kind.is_shuffle());
}

#[test]
fn test_unknown_model_is_reported() {
    let json = r#"
    {
        "name": "flow",
        "inputs": [ { "name": "in", "model": "Missing" } ]
    }
    "#;
    let definition = FlowDefinition::from_json(json).unwrap();
    assert_eq!(
        definition.into_flow_graph().unwrap_err(),
        DefinitionError::ModelNotFound {
            model: "Missing".to_string(),
            element: "in".to_string(),
        }
    );
}

#[test]
fn test_flow_part_without_body_is_reported() {
    let json = r#"
    {
        "name": "flow",
        "flowParts": [ { "name": "ghost" } ]
    }
    "#;
    let definition = FlowDefinition::from_json(json).unwrap();
    assert_eq!(
        definition.into_flow_graph().unwrap_err(),
        DefinitionError::FlowPartNotFound("ghost".to_string())
    );
}

#[test]
fn test_invalid_json_is_reported() {
    let result = JobflowDefinition::from_json("{ not json");
    assert!(matches!(result, Err(DefinitionError::JsonParseError(_))));
}
