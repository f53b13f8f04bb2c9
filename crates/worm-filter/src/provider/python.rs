//! Provider backed by a long-lived `isi.fs.domain` helper interpreter.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, warn};
use worm_protocol::{DomainInfo, ObjectHandle, ProviderError};

use super::{DomainProvider, ProviderReply};

const PYTHON_TARGET: &str = "worm_filter::provider::python";

const HELPER_SCRIPT: &str = concat!(
    "import json,sys\n",
    "import isi.fs.domain as domain\n",
    "for line in iter(sys.stdin.readline, ''):\n",
    "    try:\n",
    "        reply = {'ok': domain.get_domain_info_by_lin(int(line), -1)}\n",
    "    except ValueError as e:\n",
    "        reply = {'value_error': {'errno': getattr(e, 'errno', None), 'message': str(e)}}\n",
    "    except (OSError, IOError) as e:\n",
    "        reply = {'os_error': {'errno': e.errno, 'message': e.strerror or str(e)}}\n",
    "    sys.stdout.write(json.dumps(reply, default=str) + '\\n')\n",
    "    sys.stdout.flush()\n",
);

/// Looks up domain info through a Python helper process.
///
/// The helper is spawned on the first lookup and reused for every later
/// one: the walker feeds millions of handles, so per-lookup interpreter
/// start-up is not an option. A helper that dies or stops answering is
/// discarded and the failing lookup reports `EIO`; the next lookup spawns
/// a fresh helper.
pub struct PythonDomainProvider {
    program: String,
    args: Vec<String>,
    helper: Option<Helper>,
}

impl PythonDomainProvider {
    /// Creates a provider that runs the helper script with `python_binary`.
    #[must_use]
    pub fn new(python_binary: impl Into<String>) -> Self {
        Self {
            program: python_binary.into(),
            args: vec![
                String::from("-u"),
                String::from("-c"),
                String::from(HELPER_SCRIPT),
            ],
            helper: None,
        }
    }

    /// Creates a provider speaking the helper protocol through an arbitrary
    /// command.
    #[cfg(test)]
    pub(crate) fn from_command(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            helper: None,
        }
    }

    /// Returns true while a helper process is running.
    #[must_use]
    pub const fn has_helper(&self) -> bool {
        self.helper.is_some()
    }
}

impl DomainProvider for PythonDomainProvider {
    fn domain_info(&mut self, handle: ObjectHandle) -> Result<DomainInfo, ProviderError> {
        let mut helper = match self.helper.take() {
            Some(helper) => helper,
            None => Helper::spawn(&self.program, &self.args)?,
        };

        match helper.exchange(handle) {
            Ok(line) => {
                self.helper = Some(helper);
                parse_reply(&line)
            }
            Err(error) => {
                warn!(
                    target: PYTHON_TARGET,
                    %handle,
                    %error,
                    "domain helper failed, discarding it"
                );
                helper.discard();
                Err(error)
            }
        }
    }
}

impl Drop for PythonDomainProvider {
    fn drop(&mut self) {
        if let Some(helper) = self.helper.take() {
            helper.shutdown();
        }
    }
}

fn parse_reply(line: &str) -> Result<DomainInfo, ProviderError> {
    serde_json::from_str::<ProviderReply>(line.trim())
        .map_err(|error| ProviderError::value(None, format!("malformed helper reply: {error}")))?
        .into_result()
}

struct Helper {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Helper {
    fn spawn(program: &str, args: &[String]) -> Result<Self, ProviderError> {
        debug!(target: PYTHON_TARGET, program, "spawning domain helper");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|error| {
                warn!(target: PYTHON_TARGET, program, %error, "failed to spawn domain helper");
                ProviderError::from_io(&error, libc::EIO)
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            drop(child.kill());
            drop(child.wait());
            return Err(ProviderError::system(libc::EIO));
        };

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn exchange(&mut self, handle: ObjectHandle) -> Result<String, ProviderError> {
        writeln!(self.stdin, "{handle}")
            .and_then(|()| self.stdin.flush())
            .map_err(|error| ProviderError::from_io(&error, libc::EIO))?;

        let mut line = String::new();
        let bytes_read = self
            .stdout
            .read_line(&mut line)
            .map_err(|error| ProviderError::from_io(&error, libc::EIO))?;
        if bytes_read == 0 {
            return Err(ProviderError::system(libc::EIO));
        }
        Ok(line)
    }

    fn discard(mut self) {
        drop(self.child.kill());
        drop(self.child.wait());
    }

    fn shutdown(self) {
        let Self {
            mut child, stdin, ..
        } = self;
        // Closing stdin ends the helper's read loop.
        drop(stdin);
        match child.wait() {
            Ok(status) => debug!(target: PYTHON_TARGET, ?status, "domain helper exited"),
            Err(error) => warn!(target: PYTHON_TARGET, %error, "failed to reap domain helper"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER_FOREVER: &str =
        r#"while read lin; do echo '{"ok":{"worm_ancestors":[],"worm_state":{"committed":1,"ctime":5,"retention_date":9}}}'; done"#;

    #[test]
    fn reuses_one_helper_for_many_lookups() {
        let mut provider = PythonDomainProvider::from_command("/bin/sh", &["-c", ANSWER_FOREVER]);
        for lin in 1..=3 {
            let info = provider
                .domain_info(ObjectHandle::new(lin))
                .expect("lookup should succeed");
            let state = info.worm_state().and_then(Result::ok);
            assert_eq!(state.map(|state| state.ctime), Some(5));
        }
        assert!(provider.has_helper());
    }

    #[test]
    fn missing_interpreter_is_a_system_error() {
        let mut provider = PythonDomainProvider::new("/nonexistent/python-for-worm-filter");
        let error = provider
            .domain_info(ObjectHandle::new(1))
            .expect_err("spawn should fail");
        assert_eq!(error.sub_code(), i64::from(libc::ENOENT));
        assert!(!provider.has_helper());
    }

    #[test]
    fn dead_helper_is_replaced_on_next_lookup() {
        let script = r#"read lin; echo '{"value_error":{"errno":22,"message":"bad lin"}}'"#;
        let mut provider = PythonDomainProvider::from_command("/bin/sh", &["-c", script]);

        let first = provider.domain_info(ObjectHandle::new(1));
        assert_eq!(first, Err(ProviderError::value(Some(22), "bad lin")));

        let second = provider
            .domain_info(ObjectHandle::new(2))
            .expect_err("helper has exited");
        assert!(matches!(second, ProviderError::System { .. }));
        assert!(!provider.has_helper());

        let third = provider.domain_info(ObjectHandle::new(3));
        assert_eq!(third, Err(ProviderError::value(Some(22), "bad lin")));
    }

    #[test]
    fn directory_reply_with_short_entries_decodes() {
        let script = r#"while read lin; do echo '{"ok":{"worm_ancestors":[{"id":7}],"domains":[{"flags":2,"id":7}]}}'; done"#;
        let mut provider = PythonDomainProvider::from_command("/bin/sh", &["-c", script]);
        let info = provider
            .domain_info(ObjectHandle::new(1))
            .expect("reply should decode");
        assert!(info.is_directory_domain());
    }

    #[test]
    fn garbled_reply_is_a_value_error_without_errno() {
        let mut provider =
            PythonDomainProvider::from_command("/bin/sh", &["-c", "while read lin; do echo nope; done"]);
        let error = provider
            .domain_info(ObjectHandle::new(1))
            .expect_err("reply is not JSON");
        assert!(matches!(error, ProviderError::Value { errno: None, .. }));
        assert!(provider.has_helper(), "framing is intact, helper is kept");
    }
}
