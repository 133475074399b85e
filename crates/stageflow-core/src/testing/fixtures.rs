//! Entity fixtures for engine and cache tests.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    Activity, ActivityStatus, ActivityTemplate, Stage, StageStatus, StageTemplate,
    WorkflowTemplate,
};

pub fn workflow_template(name: &str) -> WorkflowTemplate {
    let now = Utc::now();
    WorkflowTemplate {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        input_schema: None,
        output_mapping: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn stage_template(workflow: &WorkflowTemplate, order: u32, name: &str) -> StageTemplate {
    StageTemplate {
        id: Uuid::new_v4(),
        workflow_template_id: workflow.id,
        name: name.to_string(),
        order_index: Some(order),
        created_at: Utc::now(),
    }
}

pub fn activity_template(
    stage: &StageTemplate,
    order: u32,
    name: &str,
    activity_type: &str,
) -> ActivityTemplate {
    ActivityTemplate {
        id: Uuid::new_v4(),
        stage_template_id: stage.id,
        order_index: order,
        activity_type: activity_type.into(),
        name: name.to_string(),
        description: None,
        input_mapping: None,
        output_mapping: None,
        input_schema: None,
        estimated_duration_minutes: None,
        default_assignee_id: None,
        created_at: Utc::now(),
    }
}

/// An activity template with mappings, for data-flow scenarios.
pub fn mapped_activity_template(
    stage: &StageTemplate,
    order: u32,
    name: &str,
    activity_type: &str,
    input_mapping: Option<Value>,
    output_mapping: Option<Value>,
) -> ActivityTemplate {
    let mut template = activity_template(stage, order, name, activity_type);
    template.input_mapping = input_mapping;
    template.output_mapping = output_mapping;
    template
}

/// A standalone pending activity, unattached to stored stages.
pub fn pending_activity(stage_order: u32, order: u32) -> Activity {
    Activity {
        id: Uuid::new_v4(),
        stage_id: Uuid::new_v4(),
        activity_template_id: Uuid::new_v4(),
        status: ActivityStatus::Pending,
        order_index: order,
        stage_order_index: stage_order,
        active: true,
        input_data_json: None,
        output_data_json: None,
        assigned_to: None,
        date_assigned: None,
        error_message: None,
        created_at: Utc::now(),
    }
}

/// A standalone pending stage instance with the given order index.
pub fn stage_instance(order: u32) -> Stage {
    Stage {
        id: Uuid::new_v4(),
        workflow_id: Uuid::new_v4(),
        stage_template_id: Uuid::new_v4(),
        order_index: order,
        status: StageStatus::Pending,
        created_at: Utc::now(),
    }
}

/// An activity attached to the given stage instance.
pub fn activity_in_stage(stage: &Stage, order: u32, status: ActivityStatus) -> Activity {
    let mut activity = pending_activity(stage.order_index, order);
    activity.stage_id = stage.id;
    activity.status = status;
    activity
}
