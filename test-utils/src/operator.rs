use isoboot::operator::{Operator, Prompt, Response};
use isoboot_shared::errors::{IsobootError, IsobootResult};
use std::collections::VecDeque;

/// Answers prompts from a fixed queue and records what was asked.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<Response>,
    prompts: Vec<String>,
    notifications: Vec<String>,
}

impl ScriptedOperator {
    pub fn new(answers: impl IntoIterator<Item = Response>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Names of the prompts asked so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Operator for ScriptedOperator {
    fn ask(&mut self, prompt: &Prompt) -> IsobootResult<Response> {
        self.prompts.push(prompt.name().to_string());
        self.answers.pop_front().ok_or_else(|| {
            IsobootError::InvalidState(format!("no scripted answer for {}", prompt.name()))
        })
    }

    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }
}
