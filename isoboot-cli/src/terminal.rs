//! Operator that answers checkpoints on the controlling terminal.

use std::io::{self, BufRead, IsTerminal, Write};

use isoboot::IsobootResult;
use isoboot::operator::{Operator, Prompt, Response};
use isoboot::partition::parse_size_mib;
use isoboot::tools::Credential;
use isoboot::util::human_size;
use isoboot_shared::IsobootError;
use nix::sys::termios::{self, LocalFlags, SetArg};

pub struct TerminalOperator<R = io::StdinLock<'static>, W = io::Stderr> {
    input: R,
    output: W,
    /// Answer confirmations without reading input. The attach prompt
    /// still waits, and an out-of-range size is not asked again.
    assume_yes: bool,
    /// Turn off echo while the credential is typed.
    hide_secret: bool,
}

impl TerminalOperator {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stderr(),
            assume_yes,
            hide_secret: io::stdin().is_terminal(),
        }
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn with_io(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
            hide_secret: false,
        }
    }

    /// `None` at end of input.
    fn read_line(&mut self) -> IsobootResult<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn read_secret(&mut self) -> IsobootResult<Option<String>> {
        if !self.hide_secret {
            return self.read_line();
        }

        let stdin = io::stdin();
        let saved = termios::tcgetattr(&stdin)
            .map_err(|e| IsobootError::Internal(format!("Failed to read terminal mode: {}", e)))?;
        let mut silent = saved.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &silent)
            .map_err(|e| IsobootError::Internal(format!("Failed to disable echo: {}", e)))?;

        let line = self.read_line();

        if let Err(e) = termios::tcsetattr(&stdin, SetArg::TCSANOW, &saved) {
            tracing::warn!(error = %e, "Failed to restore terminal echo");
        }
        writeln!(self.output)?;
        line
    }

    fn show(&mut self, text: &str) -> IsobootResult<()> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        Ok(())
    }

    fn yes_no(&mut self, question: &str, empty_confirms: bool) -> IsobootResult<Response> {
        let hint = if empty_confirms { "[Y/n]" } else { "[y/N]" };
        self.show(&format!("{} {} ", question, hint))?;
        if self.assume_yes {
            writeln!(self.output, "y")?;
            return Ok(Response::Confirmed);
        }
        self.read_yes_no(empty_confirms)
    }

    fn read_yes_no(&mut self, empty_confirms: bool) -> IsobootResult<Response> {
        let Some(answer) = self.read_line()? else {
            return Ok(Response::Declined);
        };
        let confirmed = match answer.to_ascii_lowercase().as_str() {
            "" => empty_confirms,
            "y" | "yes" => true,
            _ => false,
        };
        Ok(if confirmed {
            Response::Confirmed
        } else {
            Response::Declined
        })
    }

    fn size(&mut self, min_mib: u64, max_mib: u64, default_mib: u64) -> IsobootResult<Response> {
        let question = format!(
            "Data partition size, {} - {} MiB (e.g. 4G) [{}]: ",
            min_mib, max_mib, default_mib
        );
        if self.assume_yes {
            self.show(&question)?;
            writeln!(self.output, "{}", default_mib)?;
            return Ok(Response::SizeMib(default_mib));
        }

        loop {
            self.show(&question)?;
            let Some(answer) = self.read_line()? else {
                return Ok(Response::Declined);
            };
            if answer.is_empty() {
                return Ok(Response::SizeMib(default_mib));
            }
            match parse_size_mib(&answer) {
                Ok(size) => return Ok(Response::SizeMib(size)),
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn ask(&mut self, prompt: &Prompt) -> IsobootResult<Response> {
        match prompt {
            // Always waits: the second snapshot must follow the plug-in.
            Prompt::AttachDevice => {
                self.show("Attach the target drive now, then press Enter [Y/n] ")?;
                self.read_yes_no(true)
            }
            Prompt::ConfirmDevice { device } => {
                let question = format!("Use {}?", device);
                self.yes_no(&question, false)
            }
            Prompt::DataPartitionSize {
                min_mib,
                max_mib,
                default_mib,
            } => self.size(*min_mib, *max_mib, *default_mib),
            Prompt::Credential => {
                self.show("Password for sudo: ")?;
                Ok(match self.read_secret()? {
                    Some(secret) => Response::Secret(Credential::new(secret)),
                    None => Response::Declined,
                })
            }
            Prompt::ConfirmDestructive { device, plan } => {
                let summary = format!(
                    "\nAbout to partition {} ({}):\n{}\nALL DATA ON {} WILL BE LOST.",
                    device.path.display(),
                    human_size(device.size),
                    plan,
                    device.path.display()
                );
                writeln!(self.output, "{}", summary)?;
                self.yes_no("Proceed?", false)
            }
        }
    }

    fn notify(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }

    fn can_reprompt(&self) -> bool {
        !self.assume_yes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoboot::device::{BlockDevice, DeviceKind};
    use isoboot::partition::PartitionPlanner;
    use isoboot::provision::prepare_plan;

    fn operator(input: &str, assume_yes: bool) -> TerminalOperator<&[u8], Vec<u8>> {
        TerminalOperator::with_io(input.as_bytes(), Vec::new(), assume_yes)
    }

    fn usb() -> BlockDevice {
        BlockDevice::new("/dev/sdb", 8 << 30, true, DeviceKind::Disk)
    }

    fn size_prompt() -> Prompt {
        Prompt::DataPartitionSize {
            min_mib: 256,
            max_mib: 8000,
            default_mib: 8000,
        }
    }

    #[test]
    fn test_confirm_device_requires_explicit_yes() {
        let prompt = Prompt::ConfirmDevice { device: usb() };

        let mut op = operator("\n", false);
        assert!(matches!(op.ask(&prompt).unwrap(), Response::Declined));

        let mut op = operator("YES\n", false);
        assert!(matches!(op.ask(&prompt).unwrap(), Response::Confirmed));
    }

    #[test]
    fn test_attach_device_defaults_to_yes() {
        let mut op = operator("\n", false);
        assert!(matches!(
            op.ask(&Prompt::AttachDevice).unwrap(),
            Response::Confirmed
        ));
    }

    #[test]
    fn test_end_of_input_declines() {
        let mut op = operator("", false);
        assert!(matches!(
            op.ask(&Prompt::AttachDevice).unwrap(),
            Response::Declined
        ));
        assert!(matches!(op.ask(&size_prompt()).unwrap(), Response::Declined));
    }

    #[test]
    fn test_size_reasks_on_parse_error() {
        let mut op = operator("lots\n2G\n", false);
        assert!(matches!(
            op.ask(&size_prompt()).unwrap(),
            Response::SizeMib(2048)
        ));
        let shown = String::from_utf8(op.output).unwrap();
        assert!(shown.contains("invalid number"));
    }

    #[test]
    fn test_empty_size_takes_default() {
        let mut op = operator("\n", false);
        assert!(matches!(
            op.ask(&size_prompt()).unwrap(),
            Response::SizeMib(8000)
        ));
    }

    #[test]
    fn test_assume_yes_skips_input_for_confirmations() {
        let mut op = operator("", true);
        assert!(matches!(
            op.ask(&Prompt::ConfirmDevice { device: usb() }).unwrap(),
            Response::Confirmed
        ));
        assert!(matches!(
            op.ask(&size_prompt()).unwrap(),
            Response::SizeMib(8000)
        ));
    }

    #[test]
    fn test_attach_device_waits_even_with_assume_yes() {
        let mut op = operator("", true);
        assert!(matches!(
            op.ask(&Prompt::AttachDevice).unwrap(),
            Response::Declined
        ));

        let mut op = operator("\n", true);
        assert!(matches!(
            op.ask(&Prompt::AttachDevice).unwrap(),
            Response::Confirmed
        ));
    }

    #[test]
    fn test_assume_yes_rejects_out_of_range_size() {
        let mut op = operator("", true);
        let err =
            prepare_plan(&PartitionPlanner::default(), &usb(), &mut op, Some(100)).unwrap_err();
        assert!(matches!(
            err,
            IsobootError::SizeOutOfRange {
                requested: 100,
                ..
            }
        ));
    }

    #[test]
    fn test_interactive_out_of_range_size_is_asked_again() {
        let mut op = operator("2G\n", false);
        let plan =
            prepare_plan(&PartitionPlanner::default(), &usb(), &mut op, Some(100)).unwrap();
        assert_eq!(plan.data().size_mib(), 2048);
        let shown = String::from_utf8(op.output).unwrap();
        assert!(shown.contains("out of range"));
    }

    #[test]
    fn test_credential_is_read_even_with_assume_yes() {
        let mut op = operator("hunter2\n", true);
        match op.ask(&Prompt::Credential).unwrap() {
            Response::Secret(credential) => assert_eq!(credential, Credential::new("hunter2")),
            other => panic!("unexpected response: {other:?}"),
        }
        let shown = String::from_utf8(op.output).unwrap();
        assert!(!shown.contains("hunter2"));
    }
}
