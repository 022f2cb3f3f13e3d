//! ---
//! ens_section: "05-external-interfaces"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Remote process supervisor client."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};

use crate::error::SupervisorError;
use crate::xmlrpc::Value;

/// What the supervisor believes to be its own operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisorState {
    /// Shutting down.
    Shutdown,
    /// Restarting.
    Restarting,
    /// Working normally.
    Running,
    /// Experienced a serious error.
    Fatal,
}

impl SupervisorState {
    /// Numeric code used on the wire.
    pub fn code(&self) -> i64 {
        match self {
            SupervisorState::Shutdown => -1,
            SupervisorState::Restarting => 0,
            SupervisorState::Running => 1,
            SupervisorState::Fatal => 2,
        }
    }

    /// Map a wire code to a state. Unknown codes are rejected.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(SupervisorState::Shutdown),
            0 => Some(SupervisorState::Restarting),
            1 => Some(SupervisorState::Running),
            2 => Some(SupervisorState::Fatal),
            _ => None,
        }
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self, SupervisorError> {
        let code = value
            .member("statecode")
            .and_then(Value::as_i64)
            .ok_or_else(|| SupervisorError::protocol("getState response without statecode"))?;
        Self::from_code(code)
            .ok_or_else(|| SupervisorError::protocol(format!("unknown supervisor state code {code}")))
    }
}

/// State of a process managed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    /// Stopped on request, or never started.
    Stopped,
    /// Starting due to a start request.
    Starting,
    /// Running.
    Running,
    /// Entered STARTING but exited too quickly to reach RUNNING.
    Backoff,
    /// Stopping due to a stop request.
    Stopping,
    /// Exited from RUNNING, expectedly or not.
    Exited,
    /// Could not be started successfully.
    Fatal,
    /// Unknown state, including any code the client does not recognise.
    Unknown,
}

impl ProcessState {
    /// Numeric code used on the wire.
    pub fn code(&self) -> i64 {
        match self {
            ProcessState::Stopped => 0,
            ProcessState::Starting => 10,
            ProcessState::Running => 20,
            ProcessState::Backoff => 30,
            ProcessState::Stopping => 40,
            ProcessState::Exited => 100,
            ProcessState::Fatal => 200,
            ProcessState::Unknown => 1000,
        }
    }

    /// Map a wire code to a state; unrecognised codes map to [`ProcessState::Unknown`].
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ProcessState::Stopped,
            10 => ProcessState::Starting,
            20 => ProcessState::Running,
            30 => ProcessState::Backoff,
            40 => ProcessState::Stopping,
            100 => ProcessState::Exited,
            200 => ProcessState::Fatal,
            _ => ProcessState::Unknown,
        }
    }
}

/// Data about one supervised process, as returned by `getProcessInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// Process name.
    pub name: String,
    /// Name of the process group.
    pub group: String,
    /// Free-text description (pid and uptime when running, stop time when stopped).
    pub description: String,
    /// UNIX timestamp of the last start.
    pub start: i64,
    /// UNIX timestamp of the last stop, 0 if never stopped.
    pub stop: i64,
    /// UNIX timestamp of the supervisor's current time.
    pub now: i64,
    /// Decoded state.
    pub state: ProcessState,
    /// State name as reported by the supervisor.
    pub state_name: String,
    /// Path of the stdout log file.
    pub stdout_logfile: String,
    /// Path of the stderr log file.
    pub stderr_logfile: String,
    /// Spawn error description, empty when none.
    pub spawn_error: String,
    /// Exit status, 0 while running.
    pub exit_status: i64,
    /// OS process id, 0 when not running.
    pub pid: i64,
}

impl ProcessInfo {
    /// Decode a process-info struct.
    pub fn from_value(value: &Value) -> Result<Self, SupervisorError> {
        let members = value
            .as_struct()
            .ok_or_else(|| SupervisorError::protocol("process info is not a struct"))?;
        let text = |name: &str| -> String {
            members
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        let int = |name: &str| -> i64 { members.get(name).and_then(Value::as_i64).unwrap_or(0) };

        let name = members
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SupervisorError::protocol("process info without name"))?
            .to_owned();
        let state_code = members
            .get("state")
            .and_then(Value::as_i64)
            .ok_or_else(|| SupervisorError::protocol(format!("process '{name}' without state")))?;

        Ok(Self {
            group: text("group"),
            description: text("description"),
            start: int("start"),
            stop: int("stop"),
            now: int("now"),
            state: ProcessState::from_code(state_code),
            state_name: text("statename"),
            stdout_logfile: text("stdout_logfile"),
            stderr_logfile: text("stderr_logfile"),
            spawn_error: text("spawnerr"),
            exit_status: int("exitstatus"),
            pid: int("pid"),
            name,
        })
    }

    /// True when the process is in the RUNNING state.
    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }

    /// Time of the last start, `None` if the process never started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.start)
    }

    /// Time of the last stop, `None` if the process never stopped.
    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.stop)
    }

    /// Uptime derived from the supervisor clock while the process is running.
    pub fn uptime(&self) -> Option<Duration> {
        if !self.is_running() || self.start == 0 || self.now < self.start {
            return None;
        }
        Some(Duration::from_secs((self.now - self.start) as u64))
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn process_value(state: i64) -> Value {
        let mut members = IndexMap::new();
        members.insert("name".to_owned(), Value::from("vnc"));
        members.insert("group".to_owned(), Value::from("desktop"));
        members.insert("description".to_owned(), Value::from("pid 42, uptime 0:00:07"));
        members.insert("start".to_owned(), Value::Int(1_700_000_000));
        members.insert("stop".to_owned(), Value::Int(0));
        members.insert("now".to_owned(), Value::Int(1_700_000_007));
        members.insert("state".to_owned(), Value::Int(state));
        members.insert("statename".to_owned(), Value::from("RUNNING"));
        members.insert("spawnerr".to_owned(), Value::from(""));
        members.insert("exitstatus".to_owned(), Value::Int(0));
        members.insert("pid".to_owned(), Value::Int(42));
        Value::Struct(members)
    }

    #[test]
    fn process_state_codes_round_trip() {
        for state in [
            ProcessState::Stopped,
            ProcessState::Starting,
            ProcessState::Running,
            ProcessState::Backoff,
            ProcessState::Stopping,
            ProcessState::Exited,
            ProcessState::Fatal,
            ProcessState::Unknown,
        ] {
            assert_eq!(ProcessState::from_code(state.code()), state);
        }
        assert_eq!(ProcessState::from_code(55), ProcessState::Unknown);
        assert_eq!(ProcessState::Backoff.to_string(), "BACKOFF");
        assert_eq!("RUNNING".parse::<ProcessState>().unwrap(), ProcessState::Running);
    }

    #[test]
    fn supervisor_state_rejects_unknown_codes() {
        assert_eq!(SupervisorState::from_code(1), Some(SupervisorState::Running));
        assert_eq!(SupervisorState::from_code(-1), Some(SupervisorState::Shutdown));
        assert_eq!(SupervisorState::from_code(9), None);
        assert_eq!(SupervisorState::Restarting.as_ref(), "RESTARTING");
    }

    #[test]
    fn decodes_process_info() {
        let info = ProcessInfo::from_value(&process_value(20)).unwrap();
        assert_eq!(info.name, "vnc");
        assert_eq!(info.group, "desktop");
        assert!(info.is_running());
        assert_eq!(info.pid, 42);
        assert_eq!(info.uptime(), Some(Duration::from_secs(7)));
        assert!(info.started_at().is_some());
        assert!(info.stopped_at().is_none());
        assert_eq!(info.stdout_logfile, "");
    }

    #[test]
    fn stopped_process_has_no_uptime() {
        let info = ProcessInfo::from_value(&process_value(0)).unwrap();
        assert_eq!(info.state, ProcessState::Stopped);
        assert_eq!(info.uptime(), None);
    }

    #[test]
    fn process_info_requires_name_and_state() {
        assert!(ProcessInfo::from_value(&Value::from("nope")).is_err());
        let mut members = IndexMap::new();
        members.insert("name".to_owned(), Value::from("vnc"));
        assert!(ProcessInfo::from_value(&Value::Struct(members)).is_err());
    }
}
