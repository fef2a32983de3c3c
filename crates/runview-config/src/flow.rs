use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::step::StepDef;
use crate::trigger::Trigger;

/// A published or draft version of a flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowVersion {
  pub flow_version_id: String,
  pub flow_id: String,
  pub display_name: String,
  pub trigger: Trigger,
  #[serde(default)]
  pub steps: Vec<StepDef>,
}

impl FlowVersion {
  /// Check that step names are non-empty and unique across the whole tree,
  /// trigger included.
  pub fn validate(&self) -> Result<(), FlowError> {
    let mut seen = HashSet::new();
    if self.trigger.name.is_empty() {
      return Err(FlowError::EmptyStepName);
    }
    seen.insert(self.trigger.name.as_str());

    let mut stack: Vec<&StepDef> = self.steps.iter().collect();
    while let Some(step) = stack.pop() {
      if step.name.is_empty() {
        return Err(FlowError::EmptyStepName);
      }
      if !seen.insert(step.name.as_str()) {
        return Err(FlowError::DuplicateStepName(step.name.clone()));
      }
      stack.extend(step.children());
    }

    Ok(())
  }

  /// Get a step definition by name, searching nested steps.
  pub fn get_step(&self, name: &str) -> Option<&StepDef> {
    self
      .path_to(name)
      .and_then(|path| path.last().copied())
  }

  /// Whether `name` is a loop step in this flow.
  pub fn is_loop_step(&self, name: &str) -> bool {
    self.get_step(name).is_some_and(StepDef::is_loop)
  }

  /// The chain of step definitions from the top level down to `name`,
  /// ending with the step itself. Returns `None` if the step is unknown or
  /// is the trigger.
  pub fn path_to(&self, name: &str) -> Option<Vec<&StepDef>> {
    let mut path = Vec::new();
    if find_path(&self.steps, name, &mut path) {
      Some(path)
    } else {
      None
    }
  }

  /// Names of the loop steps enclosing `name`, outermost first.
  pub fn enclosing_loops(&self, name: &str) -> Vec<&str> {
    let Some(path) = self.path_to(name) else {
      return Vec::new();
    };
    let ancestors = &path[..path.len().saturating_sub(1)];
    ancestors
      .iter()
      .filter(|step| step.is_loop())
      .map(|step| step.name.as_str())
      .collect()
  }
}

fn find_path<'a>(steps: &'a [StepDef], name: &str, path: &mut Vec<&'a StepDef>) -> bool {
  for step in steps {
    path.push(step);
    if step.name == name {
      return true;
    }
    let children = step.children();
    for child in children {
      if find_path(std::slice::from_ref(child), name, path) {
        return true;
      }
    }
    path.pop();
  }
  false
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::enums::TriggerKind;
  use crate::step::StepKind;

  fn piece(name: &str) -> StepDef {
    StepDef {
      name: name.to_string(),
      display_name: name.to_string(),
      kind: StepKind::Piece {
        piece_name: "http".to_string(),
        action_name: "send_request".to_string(),
      },
    }
  }

  fn looped(name: &str, steps: Vec<StepDef>) -> StepDef {
    StepDef {
      name: name.to_string(),
      display_name: name.to_string(),
      kind: StepKind::Loop {
        items: "{{trigger.items}}".to_string(),
        steps,
      },
    }
  }

  fn flow(steps: Vec<StepDef>) -> FlowVersion {
    FlowVersion {
      flow_version_id: "fv-1".to_string(),
      flow_id: "flow-1".to_string(),
      display_name: "Test Flow".to_string(),
      trigger: Trigger {
        name: "trigger".to_string(),
        display_name: "Webhook".to_string(),
        kind: TriggerKind::Webhook,
        sample_data: None,
        settings: None,
      },
      steps,
    }
  }

  #[test]
  fn test_enclosing_loops_nested() {
    let flow = flow(vec![
      piece("step_1"),
      looped(
        "outer",
        vec![looped("inner", vec![piece("deep")]), piece("sibling")],
      ),
    ]);

    assert_eq!(flow.enclosing_loops("deep"), vec!["outer", "inner"]);
    assert_eq!(flow.enclosing_loops("sibling"), vec!["outer"]);
    assert_eq!(flow.enclosing_loops("inner"), vec!["outer"]);
    assert!(flow.enclosing_loops("step_1").is_empty());
    assert!(flow.enclosing_loops("missing").is_empty());
  }

  #[test]
  fn test_branch_children_are_not_loops() {
    let flow = flow(vec![StepDef {
      name: "branch".to_string(),
      display_name: "Branch".to_string(),
      kind: StepKind::Branch {
        on_success: vec![looped("loop", vec![piece("inside")])],
        on_failure: vec![piece("fallback")],
      },
    }]);

    assert_eq!(flow.enclosing_loops("inside"), vec!["loop"]);
    assert!(flow.enclosing_loops("fallback").is_empty());
    assert!(flow.is_loop_step("loop"));
    assert!(!flow.is_loop_step("branch"));
    assert!(!flow.is_loop_step("trigger"));
  }

  #[test]
  fn test_validate_rejects_duplicates() {
    let flow = flow(vec![piece("a"), looped("loop", vec![piece("a")])]);
    assert!(matches!(
      flow.validate(),
      Err(FlowError::DuplicateStepName(name)) if name == "a"
    ));
  }

  #[test]
  fn test_validate_rejects_step_named_like_trigger() {
    let flow = flow(vec![piece("trigger")]);
    assert!(matches!(
      flow.validate(),
      Err(FlowError::DuplicateStepName(_))
    ));
  }

  #[test]
  fn test_deserialize_flow_version() {
    let json = serde_json::json!({
      "flow_version_id": "fv-1",
      "flow_id": "flow-1",
      "display_name": "Orders",
      "trigger": {
        "name": "trigger",
        "display_name": "New order",
        "kind": "webhook",
        "sample_data": {"order": 7}
      },
      "steps": [
        {"name": "each_item", "display_name": "Each item", "type": "loop",
         "items": "{{trigger.items}}",
         "steps": [{"name": "notify", "display_name": "Notify", "type": "code"}]}
      ]
    });

    let flow: FlowVersion = serde_json::from_value(json).unwrap();
    assert_eq!(flow.trigger.sample_data, Some(serde_json::json!({"order": 7})));
    assert!(flow.is_loop_step("each_item"));
    assert_eq!(flow.get_step("notify").unwrap().display_name, "Notify");
    assert!(flow.validate().is_ok());
  }
}
