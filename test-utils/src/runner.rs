use isoboot::tools::{CommandRunner, ToolCommand, ToolOutput};
use isoboot_shared::errors::IsobootResult;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Records every command and answers from canned outputs.
///
/// Commands succeed with empty output unless a failure pattern or a
/// canned response matches.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<ToolCommand>>,
    failures: Vec<(String, ToolOutput)>,
    responses: HashMap<String, String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any command whose rendered line contains `pattern`.
    pub fn fail_when(mut self, pattern: &str, status: i32, stderr: &str) -> Self {
        self.failures
            .push((pattern.to_string(), ToolOutput::failure(status, stderr)));
        self
    }

    /// Canned stdout for every invocation of `program`.
    pub fn respond(mut self, program: &str, stdout: &str) -> Self {
        self.responses
            .insert(program.to_string(), stdout.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().clone()
    }

    /// Command lines in execution order.
    pub fn transcript(&self) -> Vec<String> {
        self.calls.lock().iter().map(ToString::to_string).collect()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.program.clone()).collect()
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program)
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &ToolCommand) -> IsobootResult<ToolOutput> {
        self.calls.lock().push(command.clone());

        let line = command.to_string();
        if let Some((_, output)) = self.failures.iter().find(|(p, _)| line.contains(p.as_str())) {
            return Ok(output.clone());
        }
        Ok(ToolOutput::success(
            self.responses
                .get(&command.program)
                .cloned()
                .unwrap_or_default(),
        ))
    }
}
