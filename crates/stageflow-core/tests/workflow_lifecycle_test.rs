//! End-to-end engine scenarios over the in-memory persistence layer:
//! template materialization, data flow between stages, failure handling,
//! and the run-to-completion driver.

use std::sync::Arc;

use serde_json::json;

use stageflow_core::api::{
    AdvanceWorkflowRequest, ExecuteActivityRequest, GetWorkflowStatusRequest,
    RunToCompletionRequest, StartWorkflowRequest,
};
use stageflow_core::error::EngineError;
use stageflow_core::executor::ExecutorRegistry;
use stageflow_core::models::{ActivityStatus, StageStatus, WorkflowStatus};
use stageflow_core::testing::mocks::{EchoExecutor, FailingExecutor, StaticExecutor};
use stageflow_core::testing::{fixtures, TestBed};

/// Template with stages S1(order=1)/A1 and S2(order=2)/A2 where A1's output
/// feeds A2's input through the context tree.
fn seed_two_stage_pipeline(bed: &TestBed) -> uuid::Uuid {
    let template = fixtures::workflow_template("greeting_pipeline");
    let s1 = fixtures::stage_template(&template, 1, "produce");
    let s2 = fixtures::stage_template(&template, 2, "consume");
    let a1 = fixtures::mapped_activity_template(
        &s1,
        0,
        "emit_greeting",
        "echo",
        Some(json!({"message": {"source": "$.input.message", "default": "hello"}})),
        Some(json!({"greeting": "$.activity_output.message"})),
    );
    let a2 = fixtures::mapped_activity_template(
        &s2,
        0,
        "relay_greeting",
        "echo",
        Some(json!({"prefix": "$.stage.1.activity.0.output.greeting"})),
        None,
    );
    bed.workflow_templates.insert(template.clone());
    bed.stage_templates.insert(s1);
    bed.stage_templates.insert(s2);
    bed.activity_templates.insert(a1);
    bed.activity_templates.insert(a2);
    template.id
}

fn echo_registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    registry.register("echo", Arc::new(EchoExecutor)).unwrap();
    registry
}

#[tokio::test]
async fn linear_two_stage_pipeline_completes_with_data_flow() {
    let bed = TestBed::new();
    let template_id = seed_two_stage_pipeline(&bed);
    let engine = bed.engine(echo_registry());

    let response = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap();

    assert_eq!(response.workflow.status, WorkflowStatus::Completed);

    // The output mapping folded A1's message into the context, and A2's
    // input mapping read it back out of stage 1's slot.
    let context = &response.output;
    assert_eq!(
        context["stage"]["1"]["activity"]["0"]["output"]["greeting"],
        "hello"
    );
    assert_eq!(
        context["stage"]["2"]["activity"]["0"]["input"]["prefix"],
        "hello"
    );

    // Exactly one stage per order index, all completed.
    let mut stages = bed.stages.all();
    stages.sort_by_key(|s| s.order_index);
    let orders: Vec<u32> = stages.iter().map(|s| s.order_index).collect();
    assert_eq!(orders, vec![1, 2]);
    assert!(stages.iter().all(|s| s.status == StageStatus::Completed));

    // Both activities terminal, with their payloads persisted.
    let activities = bed.activities.all();
    assert_eq!(activities.len(), 2);
    assert!(activities
        .iter()
        .all(|a| a.status == ActivityStatus::Completed));
    assert!(activities.iter().all(|a| a.output_data_json.is_some()));
}

#[tokio::test]
async fn workflow_output_mapping_shapes_the_result() {
    let bed = TestBed::new();
    let template_id = seed_two_stage_pipeline(&bed);
    let mut template = bed.workflow_templates.get(template_id).unwrap();
    template.output_mapping = Some(json!({
        "greeting": "$.stage.1.activity.0.output.greeting",
    }));
    bed.workflow_templates.insert(template);
    let engine = bed.engine(echo_registry());

    let response = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap();

    assert_eq!(response.output, json!({"greeting": "hello"}));
}

#[tokio::test]
async fn output_mapping_merges_next_to_raw_executor_output() {
    let bed = TestBed::new();
    let template = fixtures::workflow_template("notify");
    let stage = fixtures::stage_template(&template, 1, "emit");
    let activity = fixtures::mapped_activity_template(
        &stage,
        0,
        "emit_message",
        "emit",
        None,
        Some(json!({"greeting": "$.activity_output.message"})),
    );
    bed.workflow_templates.insert(template.clone());
    bed.stage_templates.insert(stage);
    bed.activity_templates.insert(activity);

    let mut registry = ExecutorRegistry::new();
    registry
        .register(
            "emit",
            Arc::new(StaticExecutor::new(json!({"message": "hello"}))),
        )
        .unwrap();
    let engine = bed.engine(registry);

    let response = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template.id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap();

    // The raw output and the mapped field share the canonical output slot.
    let slot = &response.output["stage"]["1"]["activity"]["0"]["output"];
    assert_eq!(slot["message"], "hello");
    assert_eq!(slot["greeting"], "hello");
}

#[tokio::test]
async fn start_rejects_invalid_input_without_persisting() {
    let bed = TestBed::new();
    let mut template = fixtures::workflow_template("strict");
    template.input_schema = Some(json!({
        "type": "object",
        "properties": {"user_id": {"type": "string"}},
        "required": ["user_id"],
    }));
    let stage = fixtures::stage_template(&template, 1, "only");
    bed.workflow_templates.insert(template.clone());
    bed.stage_templates.insert(stage);
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .start_workflow(StartWorkflowRequest {
            workflow_template_id: template.id,
            input_json: "{}".to_string(),
            workspace_id: None,
        })
        .await
        .unwrap_err();

    match err {
        EngineError::ValidationFailed { message } => {
            assert!(message.contains("user_id"), "{}", message)
        }
        other => panic!("expected ValidationFailed, got {:?}", other),
    }
    assert!(bed.workflows.is_empty());
    assert!(bed.stages.is_empty());
}

#[tokio::test]
async fn start_requires_at_least_one_stage_template() {
    let bed = TestBed::new();
    let template = fixtures::workflow_template("empty");
    bed.workflow_templates.insert(template.clone());
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .start_workflow(StartWorkflowRequest {
            workflow_template_id: template.id,
            input_json: "{}".to_string(),
            workspace_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TemplateIncomplete { .. }));
}

#[tokio::test]
async fn executor_failure_marks_activity_failed_and_pins_the_stage() {
    let bed = TestBed::new();
    let template = fixtures::workflow_template("fragile");
    let stage = fixtures::stage_template(&template, 1, "only");
    let activity = fixtures::activity_template(&stage, 0, "detonate", "explode");
    bed.workflow_templates.insert(template.clone());
    bed.stage_templates.insert(stage);
    bed.activity_templates.insert(activity);

    let mut registry = ExecutorRegistry::new();
    registry
        .register("explode", Arc::new(FailingExecutor::new("boom")))
        .unwrap();
    let engine = bed.engine(registry);

    let started = engine
        .start_workflow(StartWorkflowRequest {
            workflow_template_id: template.id,
            input_json: "{}".to_string(),
            workspace_id: None,
        })
        .await
        .unwrap();
    let workflow_id = started.workflow.id;

    // First advance materializes the activity.
    let advanced = engine
        .advance_workflow(AdvanceWorkflowRequest { workflow_id })
        .await
        .unwrap();
    assert_eq!(advanced.next_stage_id, Some(started.first_stage_id));
    assert!(!advanced.stage_advanced);

    let status = engine
        .workflow_status(GetWorkflowStatusRequest { workflow_id })
        .await
        .unwrap();
    let activity_id = status.pending_activity_id.unwrap();

    let err = engine
        .execute_activity(ExecuteActivityRequest {
            activity_id,
            workflow_id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExecutorFailed { .. }));

    let failed = bed.activities.get(activity_id).unwrap();
    assert_eq!(failed.status, ActivityStatus::Failed);
    assert!(failed.error_message.as_deref().unwrap_or("").contains("boom"));

    // A failed activity is terminal but not completed: the stage stays put.
    let advanced = engine
        .advance_workflow(AdvanceWorkflowRequest { workflow_id })
        .await
        .unwrap();
    assert_eq!(advanced.next_stage_id, Some(started.first_stage_id));
    assert!(!advanced.stage_advanced);
    assert!(!advanced.workflow_completed);
    let stage = bed.stages.get(started.first_stage_id).unwrap();
    assert_ne!(stage.status, StageStatus::Completed);
}

#[tokio::test]
async fn executing_a_terminal_activity_is_illegal() {
    let bed = TestBed::new();
    let template_id = seed_two_stage_pipeline(&bed);
    let engine = bed.engine(echo_registry());

    engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap();

    let workflow = bed.workflows.all().pop().unwrap();
    let done = bed.activities.all().pop().unwrap();
    let err = engine
        .execute_activity(ExecuteActivityRequest {
            activity_id: done.id,
            workflow_id: workflow.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalState { .. }));
}

#[tokio::test]
async fn missing_executor_surfaces_executor_not_found() {
    let bed = TestBed::new();
    let template = fixtures::workflow_template("untagged");
    let stage = fixtures::stage_template(&template, 1, "only");
    let activity = fixtures::activity_template(&stage, 0, "step", "unregistered_tag");
    bed.workflow_templates.insert(template.clone());
    bed.stage_templates.insert(stage);
    bed.activity_templates.insert(activity);
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template.id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::ExecutorNotFound { activity_type } if activity_type == "unregistered_tag"
    ));
}

#[tokio::test]
async fn iteration_budget_is_enforced() {
    let bed = TestBed::new();
    let template_id = seed_two_stage_pipeline(&bed);
    let engine = bed.engine(echo_registry());

    let err = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: Some(2),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::IterationLimitExceeded { limit: 2 }
    ));
}

#[tokio::test]
async fn workspace_id_is_stamped_onto_the_workflow() {
    let bed = TestBed::new();
    let template_id = seed_two_stage_pipeline(&bed);
    let engine = bed.engine(echo_registry());

    let response = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: Some("tenant-7".to_string()),
            max_iterations: None,
        })
        .await
        .unwrap();
    assert_eq!(response.workflow.workspace_id.as_deref(), Some("tenant-7"));
}
