//! In-memory fakes for the host and process seams (testing only)
//!
//! Provides `RecordingAnnotator` and `ScriptedRunner`, which satisfy the
//! [`Annotator`] and [`ProcessRunner`] contracts without touching stdout or
//! spawning anything.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::annotate::{trace_annotation, AnnotationProperties, Annotator, Level};
use crate::error::{ActionError, Result};
use crate::process::{CommandOutput, CommandSpec, ProcessRunner};

// ---------------------------------------------------------------------------
// RecordingAnnotator
// ---------------------------------------------------------------------------

/// One call made on a [`RecordingAnnotator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Annotation {
        level: Level,
        message: String,
        props: AnnotationProperties,
    },
    GroupStart(String),
    GroupEnd,
}

/// Annotator keeping every call in memory.
#[derive(Debug, Default)]
pub struct RecordingAnnotator {
    records: Mutex<Vec<Recorded>>,
}

impl RecordingAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Recorded> {
        self.records.lock().unwrap().clone()
    }

    /// Annotations emitted at `level`, in order.
    pub fn at(&self, level: Level) -> Vec<(String, AnnotationProperties)> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| match r {
                Recorded::Annotation {
                    level: l,
                    message,
                    props,
                } if *l == level => Some((message.clone(), props.clone())),
                _ => None,
            })
            .collect()
    }

    /// Messages emitted at `level`, in order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.at(level).into_iter().map(|(m, _)| m).collect()
    }

    /// Names of the groups that were opened, in order.
    pub fn groups(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| match r {
                Recorded::GroupStart(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether every opened group was closed.
    pub fn groups_balanced(&self) -> bool {
        let mut depth = 0i32;
        for record in self.records.lock().unwrap().iter() {
            match record {
                Recorded::GroupStart(_) => depth += 1,
                Recorded::GroupEnd => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                Recorded::Annotation { .. } => {}
            }
        }
        depth == 0
    }
}

impl Annotator for RecordingAnnotator {
    fn annotate(&self, level: Level, message: &str, props: &AnnotationProperties) {
        trace_annotation(level, message, props);
        self.records.lock().unwrap().push(Recorded::Annotation {
            level,
            message: message.to_string(),
            props: props.clone(),
        });
    }

    fn start_group(&self, name: &str) {
        self.records
            .lock()
            .unwrap()
            .push(Recorded::GroupStart(name.to_string()));
    }

    fn end_group(&self) {
        self.records.lock().unwrap().push(Recorded::GroupEnd);
    }
}

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

/// Process runner answering from canned outputs keyed by command line.
///
/// Several outputs registered for the same command line are returned in
/// order; the last one repeats. An unscripted command fails to spawn, like a
/// missing program would.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    calls: Mutex<Vec<CommandSpec>>,
    spawned: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output of `command_line` (e.g. `"yarn -s eslint . -f json"`).
    pub fn on(self, command_line: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines run so far, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::command_line).collect()
    }

    /// Every command started with `spawn_detached`.
    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.spawned.lock().unwrap().clone()
    }

    fn next_response(&self, spec: &CommandSpec) -> Option<CommandOutput> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&spec.command_line())?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        self.next_response(spec).ok_or_else(|| ActionError::Spawn {
            program: spec.program.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("unscripted command `{spec}`"),
            ),
        })
    }

    async fn spawn_detached(&self, spec: &CommandSpec) -> Result<u32> {
        let mut spawned = self.spawned.lock().unwrap();
        spawned.push(spec.clone());
        Ok(4000 + spawned.len() as u32)
    }
}
