//! Manual-class activities: suspension of the driver, human continuation,
//! and the validation rules around resuming.

use serde_json::json;

use stageflow_core::api::{
    AdvanceWorkflowRequest, ContinueWorkflowRequest, GetWorkflowStatusRequest,
    RunToCompletionRequest,
};
use stageflow_core::error::EngineError;
use stageflow_core::executor::ExecutorRegistry;
use stageflow_core::models::{ActivityStatus, WorkflowStatus};
use stageflow_core::testing::{fixtures, TestBed};

fn seed_single_approval(bed: &TestBed) -> uuid::Uuid {
    let template = fixtures::workflow_template("contract_signoff");
    let stage = fixtures::stage_template(&template, 1, "signoff");
    let mut activity = fixtures::activity_template(&stage, 0, "approve_contract", "human_task");
    activity.default_assignee_id = Some("legal-team".to_string());
    bed.workflow_templates.insert(template.clone());
    bed.stage_templates.insert(stage);
    bed.activity_templates.insert(activity);
    template.id
}

#[tokio::test]
async fn manual_activity_suspends_and_continuation_completes() {
    let bed = TestBed::new();
    let template_id = seed_single_approval(&bed);
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap_err();
    let activity_id = match err {
        EngineError::SuspensionRequired { activity_id } => activity_id,
        other => panic!("expected SuspensionRequired, got {:?}", other),
    };

    // The workflow survived the suspension, still running, with the manual
    // step assigned from the template default.
    let workflow = bed.workflows.all().pop().unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Running);
    let suspended = bed.activities.get(activity_id).unwrap();
    assert_eq!(suspended.status, ActivityStatus::Pending);
    assert_eq!(suspended.assigned_to.as_deref(), Some("legal-team"));
    assert!(suspended.date_assigned.is_some());

    // A human supplies the output; driving resumes and completes.
    engine
        .continue_workflow(ContinueWorkflowRequest {
            workflow_id: workflow.id,
            activity_id,
            output_json: r#"{"approved": true}"#.to_string(),
        })
        .await
        .unwrap();

    let advanced = engine
        .advance_workflow(AdvanceWorkflowRequest {
            workflow_id: workflow.id,
        })
        .await
        .unwrap();
    assert!(advanced.workflow_completed);

    let workflow = bed.workflows.get(workflow.id).unwrap();
    assert_eq!(workflow.status, WorkflowStatus::Completed);

    // The continuation output landed at the canonical context slot.
    let context: serde_json::Value = serde_json::from_str(&workflow.context_json).unwrap();
    assert_eq!(
        context["stage"]["1"]["activity"]["0"]["output"]["approved"],
        json!(true)
    );
}

#[tokio::test]
async fn continuation_validates_workflow_membership() {
    let bed = TestBed::new();
    let template_id = seed_single_approval(&bed);
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap_err();
    let activity_id = match err {
        EngineError::SuspensionRequired { activity_id } => activity_id,
        other => panic!("expected SuspensionRequired, got {:?}", other),
    };

    let err = engine
        .continue_workflow(ContinueWorkflowRequest {
            workflow_id: uuid::Uuid::new_v4(),
            activity_id,
            output_json: "{}".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalState { .. }));
}

#[tokio::test]
async fn continuation_rejects_terminal_activities() {
    let bed = TestBed::new();
    let template_id = seed_single_approval(&bed);
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap_err();
    let activity_id = match err {
        EngineError::SuspensionRequired { activity_id } => activity_id,
        other => panic!("expected SuspensionRequired, got {:?}", other),
    };
    let workflow = bed.workflows.all().pop().unwrap();

    engine
        .continue_workflow(ContinueWorkflowRequest {
            workflow_id: workflow.id,
            activity_id,
            output_json: r#"{"approved": false}"#.to_string(),
        })
        .await
        .unwrap();

    // Second continuation hits a terminal activity.
    let err = engine
        .continue_workflow(ContinueWorkflowRequest {
            workflow_id: workflow.id,
            activity_id,
            output_json: r#"{"approved": true}"#.to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalState { .. }));
}

#[tokio::test]
async fn continuation_rejects_malformed_output() {
    let bed = TestBed::new();
    let template_id = seed_single_approval(&bed);
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap_err();
    let activity_id = match err {
        EngineError::SuspensionRequired { activity_id } => activity_id,
        other => panic!("expected SuspensionRequired, got {:?}", other),
    };
    let workflow = bed.workflows.all().pop().unwrap();

    let err = engine
        .continue_workflow(ContinueWorkflowRequest {
            workflow_id: workflow.id,
            activity_id,
            output_json: "{broken".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ValidationFailed { .. }));

    // The failed continuation left the activity untouched.
    let activity = bed.activities.get(activity_id).unwrap();
    assert_eq!(activity.status, ActivityStatus::Pending);
}

#[tokio::test]
async fn status_reports_the_suspended_activity_as_pending() {
    let bed = TestBed::new();
    let template_id = seed_single_approval(&bed);
    let engine = bed.engine(ExecutorRegistry::new());

    let err = engine
        .run_to_completion(RunToCompletionRequest {
            workflow_template_id: template_id,
            input_json: "{}".to_string(),
            workspace_id: None,
            max_iterations: None,
        })
        .await
        .unwrap_err();
    let activity_id = match err {
        EngineError::SuspensionRequired { activity_id } => activity_id,
        other => panic!("expected SuspensionRequired, got {:?}", other),
    };
    let workflow = bed.workflows.all().pop().unwrap();

    let status = engine
        .workflow_status(GetWorkflowStatusRequest {
            workflow_id: workflow.id,
        })
        .await
        .unwrap();
    assert_eq!(status.pending_activity_id, Some(activity_id));
    assert_eq!(status.stages.len(), 1);
    assert_eq!(status.activities.len(), 1);
}
