//! Post-build steps and their translation into executable shell steps.

use crate::prelude::*;

/// A named shell command template declared in the configuration.
///
/// Environment values and command arguments are [`StepValue`]s, so any of
/// them may defer to a build property instead of a fixed string.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PostBuildStep {
    /// Step name, shown in the build log.
    pub name: String,
    /// Extra environment variables for the command.
    pub environment: HashMap<String, StepValue>,
    /// The command and its arguments.
    pub command: Vec<StepValue>,
}

impl PostBuildStep {
    /// Translate into the execution engine's shell-step descriptor.
    ///
    /// Pure: literals map to themselves, interpolations carry their
    /// expression into the engine's interpolation primitive. No secret is
    /// read here.
    pub fn to_shell_step(&self) -> ShellStep {
        ShellStep {
            name: self.name.clone(),
            environment: self
                .environment
                .iter()
                .map(|(name, value)| (name.clone(), to_argument(value)))
                .collect(),
            command: self.command.iter().map(to_argument).collect(),
        }
    }
}

fn to_argument(value: &StepValue) -> StepArgument {
    match value {
        StepValue::Literal(literal) => StepArgument::Literal(literal.clone()),
        StepValue::Interpolate(interpolate) => {
            StepArgument::Interpolate(interpolate.value.clone())
        }
    }
}

/// An argument or environment value of a [`ShellStep`], as understood by
/// the execution engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StepArgument {
    /// Use the string as-is.
    Literal(String),
    /// Substitute the expression when the step runs.
    Interpolate(String),
}

/// A fully translated shell step, ready to hand to the execution engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShellStep {
    /// Step name, shown in the build log.
    pub name: String,
    /// Environment variables, values possibly deferred.
    pub environment: HashMap<String, StepArgument>,
    /// Command and arguments, entries possibly deferred.
    pub command: Vec<StepArgument>,
}

#[test]
fn translate_mixed_command() {
    let json = r#"
{
  "name": "notify",
  "environment": {},
  "command": ["echo", { "_type": "Interpolate", "value": "prop:revision" }]
}"#;
    let step: PostBuildStep = serde_json::from_str(json).expect("parse error");
    let shell = step.to_shell_step();
    assert_eq!(shell.name, "notify");
    assert_eq!(
        shell.command,
        vec![
            StepArgument::Literal("echo".to_owned()),
            StepArgument::Interpolate("prop:revision".to_owned()),
        ]
    );
}

#[test]
fn translate_environment_values() {
    let json = r#"
{
  "name": "upload",
  "environment": {
    "TARGET": "production",
    "REVISION": { "_type": "Interpolate", "value": "prop:revision" }
  },
  "command": ["upload.sh"]
}"#;
    let step: PostBuildStep = serde_json::from_str(json).expect("parse error");
    let shell = step.to_shell_step();
    assert_eq!(
        shell.environment.get("TARGET"),
        Some(&StepArgument::Literal("production".to_owned()))
    );
    assert_eq!(
        shell.environment.get("REVISION"),
        Some(&StepArgument::Interpolate("prop:revision".to_owned()))
    );
}
