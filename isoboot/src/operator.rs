//! Human checkpoints as a prompt/response protocol.
//!
//! The provisioning pipeline suspends only at these prompts. Declining any
//! of them cancels the whole run before the next destructive step.

use isoboot_shared::errors::{IsobootError, IsobootResult};

use crate::device::BlockDevice;
use crate::partition::PartitionPlan;
use crate::tools::Credential;

#[derive(Debug, Clone)]
pub enum Prompt {
    /// Plug in the target device now.
    AttachDevice,
    /// Is this the device to provision?
    ConfirmDevice { device: BlockDevice },
    /// Size of the data partition, in MiB.
    DataPartitionSize {
        min_mib: u64,
        max_mib: u64,
        default_mib: u64,
    },
    /// Credential for privileged commands.
    Credential,
    /// Last chance before the device is wiped.
    ConfirmDestructive {
        device: BlockDevice,
        plan: PartitionPlan,
    },
}

impl Prompt {
    pub fn name(&self) -> &'static str {
        match self {
            Prompt::AttachDevice => "attach-device",
            Prompt::ConfirmDevice { .. } => "confirm-device",
            Prompt::DataPartitionSize { .. } => "data-partition-size",
            Prompt::Credential => "credential",
            Prompt::ConfirmDestructive { .. } => "confirm-destructive",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Response {
    Confirmed,
    Declined,
    SizeMib(u64),
    Secret(Credential),
}

/// Answers checkpoints (a terminal, a dialog, or a script).
pub trait Operator {
    fn ask(&mut self, prompt: &Prompt) -> IsobootResult<Response>;

    /// Non-blocking message, e.g. why an answer was rejected.
    fn notify(&mut self, message: &str);

    /// Whether a rejected answer can be asked for again. Unattended
    /// operators answer with fixed values and return `false`.
    fn can_reprompt(&self) -> bool {
        true
    }
}

/// Ask a yes/no prompt; declining cancels.
pub fn confirm(operator: &mut dyn Operator, prompt: &Prompt) -> IsobootResult<()> {
    match operator.ask(prompt)? {
        Response::Confirmed => Ok(()),
        Response::Declined => Err(IsobootError::Cancelled(prompt.name().to_string())),
        other => Err(unexpected(prompt, &other)),
    }
}

/// Ask for a size; declining cancels.
pub fn ask_size(operator: &mut dyn Operator, prompt: &Prompt) -> IsobootResult<u64> {
    match operator.ask(prompt)? {
        Response::SizeMib(size) => Ok(size),
        Response::Declined => Err(IsobootError::Cancelled(prompt.name().to_string())),
        other => Err(unexpected(prompt, &other)),
    }
}

/// Ask for the credential; declining cancels.
pub fn ask_credential(operator: &mut dyn Operator) -> IsobootResult<Credential> {
    let prompt = Prompt::Credential;
    match operator.ask(&prompt)? {
        Response::Secret(credential) => Ok(credential),
        Response::Declined => Err(IsobootError::Cancelled(prompt.name().to_string())),
        other => Err(unexpected(&prompt, &other)),
    }
}

fn unexpected(prompt: &Prompt, response: &Response) -> IsobootError {
    let kind = match response {
        Response::Confirmed => "confirmation",
        Response::Declined => "decline",
        Response::SizeMib(_) => "size",
        Response::Secret(_) => "secret",
    };
    IsobootError::InvalidState(format!(
        "unexpected {} in answer to {} prompt",
        kind,
        prompt.name()
    ))
}
