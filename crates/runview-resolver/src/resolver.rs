use runview_config::{FlowVersion, StepType, Trigger};
use runview_run::{LoopIndexMap, StepExecution, StepMap, StepOutput, StepStatus};
use tracing::trace;

/// Resolve the output to display for `step_name`.
///
/// The trigger resolves to its definition-derived output. Any other step is
/// looked up in `run_steps`, descending through the selected iteration of
/// every loop that encloses it. Returns `None` when a step on the path has
/// not executed yet or a selected iteration does not exist.
pub fn resolve_step_output(
  step_name: &str,
  loop_indexes: &LoopIndexMap,
  run_steps: &StepMap,
  flow: &FlowVersion,
) -> Option<StepOutput> {
  if step_name == flow.trigger.name {
    return Some(trigger_output(&flow.trigger));
  }

  let steps = descend(flow.enclosing_loops(step_name), loop_indexes, run_steps)?;
  steps
    .get(step_name)
    .map(|execution| StepOutput::from_execution(step_name, execution))
}

/// Number of iterations recorded for `loop_name` under the current
/// selection of its enclosing loops.
pub fn loop_iteration_count(
  loop_name: &str,
  loop_indexes: &LoopIndexMap,
  run_steps: &StepMap,
  flow: &FlowVersion,
) -> Option<usize> {
  if !flow.is_loop_step(loop_name) {
    return None;
  }
  let steps = descend(flow.enclosing_loops(loop_name), loop_indexes, run_steps)?;
  steps.get(loop_name).map(|execution| execution.iterations.len())
}

/// Output of the trigger, taken from the flow definition.
pub fn trigger_output(trigger: &Trigger) -> StepOutput {
  StepOutput {
    step_name: trigger.name.clone(),
    step_type: StepType::Trigger,
    status: StepStatus::Succeeded,
    input: trigger
      .settings
      .clone()
      .unwrap_or(serde_json::Value::Null),
    output: trigger.sample_data.clone(),
    error_message: None,
    duration_ms: None,
  }
}

/// Walk down through the selected iteration of each loop, outermost first.
fn descend<'a>(
  loops: Vec<&str>,
  loop_indexes: &LoopIndexMap,
  run_steps: &'a StepMap,
) -> Option<&'a StepMap> {
  let mut steps = run_steps;
  for loop_name in loops {
    let Some(execution) = steps.get(loop_name) else {
      trace!(loop_name, "enclosing loop has not executed yet");
      return None;
    };
    steps = selected_iteration(loop_name, execution, loop_indexes)?;
  }
  Some(steps)
}

fn selected_iteration<'a>(
  loop_name: &str,
  execution: &'a StepExecution,
  loop_indexes: &LoopIndexMap,
) -> Option<&'a StepMap> {
  let index = match loop_indexes.get(loop_name) {
    Some(index) => *index,
    None => execution.iterations.len().checked_sub(1)?,
  };
  let iteration = execution.iterations.get(index);
  if iteration.is_none() {
    trace!(loop_name, index, "selected loop iteration does not exist");
  }
  iteration
}

#[cfg(test)]
mod tests {
  use super::*;
  use runview_config::{StepDef, StepKind, TriggerKind};
  use serde_json::json;

  fn code(name: &str) -> StepDef {
    StepDef {
      name: name.to_string(),
      display_name: name.to_string(),
      kind: StepKind::Code {
        source: String::new(),
      },
    }
  }

  fn looped(name: &str, steps: Vec<StepDef>) -> StepDef {
    StepDef {
      name: name.to_string(),
      display_name: name.to_string(),
      kind: StepKind::Loop {
        items: "{{items}}".to_string(),
        steps,
      },
    }
  }

  fn flow(trigger_name: &str, steps: Vec<StepDef>) -> FlowVersion {
    FlowVersion {
      flow_version_id: "fv-1".to_string(),
      flow_id: "flow-1".to_string(),
      display_name: "Flow".to_string(),
      trigger: Trigger {
        name: trigger_name.to_string(),
        display_name: "Trigger".to_string(),
        kind: TriggerKind::Webhook,
        sample_data: Some(json!({"from": "trigger"})),
        settings: None,
      },
      steps,
    }
  }

  fn done(output: serde_json::Value) -> StepExecution {
    StepExecution::new(StepType::Code, StepStatus::Succeeded).with_output(output)
  }

  fn steps(entries: Vec<(&str, StepExecution)>) -> StepMap {
    entries
      .into_iter()
      .map(|(name, execution)| (name.to_string(), execution))
      .collect()
  }

  fn loop_exec(iterations: Vec<StepMap>) -> StepExecution {
    StepExecution::new(StepType::Loop, StepStatus::Succeeded).with_iterations(iterations)
  }

  /// trigger -> outer(loop) { inner(loop) { deep }, sibling } -> after
  fn nested_fixture() -> (FlowVersion, StepMap) {
    let flow = flow(
      "trigger",
      vec![
        looped("outer", vec![looped("inner", vec![code("deep")]), code("sibling")]),
        code("after"),
      ],
    );

    let outer_iteration = |o: i64| {
      steps(vec![
        (
          "inner",
          loop_exec(vec![
            steps(vec![("deep", done(json!([o, 0])))]),
            steps(vec![("deep", done(json!([o, 1])))]),
            steps(vec![("deep", done(json!([o, 2])))]),
          ]),
        ),
        ("sibling", done(json!({"outer": o}))),
      ])
    };

    let run_steps = steps(vec![
      ("outer", loop_exec(vec![outer_iteration(0), outer_iteration(1)])),
      ("after", done(json!("after"))),
    ]);

    (flow, run_steps)
  }

  #[test]
  fn test_trigger_uses_definition_output() {
    let flow = flow("A", vec![]);
    let run_steps = steps(vec![("A", done(json!(1)))]);

    let output = resolve_step_output("A", &LoopIndexMap::new(), &run_steps, &flow).unwrap();

    assert_eq!(output.step_type, StepType::Trigger);
    assert_eq!(output.output, Some(json!({"from": "trigger"})));
    assert_ne!(output.output, Some(json!(1)));
  }

  #[test]
  fn test_top_level_step() {
    let (flow, run_steps) = nested_fixture();
    let output = resolve_step_output("after", &LoopIndexMap::new(), &run_steps, &flow).unwrap();
    assert_eq!(output.step_name, "after");
    assert_eq!(output.output, Some(json!("after")));
  }

  #[test]
  fn test_defaults_to_last_iteration() {
    let (flow, run_steps) = nested_fixture();
    let output = resolve_step_output("deep", &LoopIndexMap::new(), &run_steps, &flow).unwrap();
    assert_eq!(output.output, Some(json!([1, 2])));
  }

  #[test]
  fn test_selected_indexes_are_followed() {
    let (flow, run_steps) = nested_fixture();
    let indexes = LoopIndexMap::from([("outer".to_string(), 0), ("inner".to_string(), 1)]);
    let output = resolve_step_output("deep", &indexes, &run_steps, &flow).unwrap();
    assert_eq!(output.output, Some(json!([0, 1])));
  }

  #[test]
  fn test_inner_index_change_leaves_siblings_alone() {
    let (flow, run_steps) = nested_fixture();
    let before = LoopIndexMap::from([("outer".to_string(), 1), ("inner".to_string(), 0)]);
    let after = LoopIndexMap::from([("outer".to_string(), 1), ("inner".to_string(), 2)]);

    let deep_before = resolve_step_output("deep", &before, &run_steps, &flow);
    let deep_after = resolve_step_output("deep", &after, &run_steps, &flow);
    assert_ne!(deep_before, deep_after);

    for name in ["sibling", "after", "outer", "inner"] {
      assert_eq!(
        resolve_step_output(name, &before, &run_steps, &flow),
        resolve_step_output(name, &after, &run_steps, &flow),
        "resolution of {name} changed"
      );
    }
  }

  #[test]
  fn test_resolution_is_idempotent() {
    let (flow, run_steps) = nested_fixture();
    let indexes = LoopIndexMap::from([("outer".to_string(), 0)]);
    let first = resolve_step_output("deep", &indexes, &run_steps, &flow);
    let second = resolve_step_output("deep", &indexes, &run_steps, &flow);
    assert_eq!(first, second);
  }

  #[test]
  fn test_missing_steps_resolve_to_none() {
    let (flow, run_steps) = nested_fixture();
    let out_of_range = LoopIndexMap::from([("outer".to_string(), 5)]);

    assert!(resolve_step_output("deep", &out_of_range, &run_steps, &flow).is_none());
    assert!(resolve_step_output("unknown", &LoopIndexMap::new(), &run_steps, &flow).is_none());
    assert!(resolve_step_output("deep", &LoopIndexMap::new(), &StepMap::new(), &flow).is_none());
  }

  #[test]
  fn test_loop_without_iterations_resolves_children_to_none() {
    let (flow, _) = nested_fixture();
    let run_steps = steps(vec![("outer", loop_exec(vec![]))]);
    assert!(resolve_step_output("sibling", &LoopIndexMap::new(), &run_steps, &flow).is_none());
    assert!(resolve_step_output("outer", &LoopIndexMap::new(), &run_steps, &flow).is_some());
  }

  #[test]
  fn test_loop_iteration_count() {
    let (flow, run_steps) = nested_fixture();
    let indexes = LoopIndexMap::new();
    assert_eq!(loop_iteration_count("outer", &indexes, &run_steps, &flow), Some(2));
    assert_eq!(loop_iteration_count("inner", &indexes, &run_steps, &flow), Some(3));
    assert_eq!(loop_iteration_count("after", &indexes, &run_steps, &flow), None);
  }
}
