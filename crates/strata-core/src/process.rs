//! Process liveness probing for stale lock detection.
//!
//! A recycled PID belonging to an unrelated process reads as alive. That is a
//! known limitation of PID-stamped locks.

/// Answers whether a process id currently exists
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probe backed by the OS process table
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcProbe;

impl ProcessProbe for ProcProbe {
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }

        #[cfg(target_os = "linux")]
        {
            std::path::Path::new(&format!("/proc/{}", pid)).exists()
        }

        #[cfg(all(unix, not(target_os = "linux")))]
        {
            std::process::Command::new("kill")
                .arg("-0")
                .arg(pid.to_string())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(true)
        }

        // Without a liveness primitive, never declare a lock stale.
        #[cfg(not(unix))]
        {
            true
        }
    }
}

/// Probe with a fixed answer, for tests
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl ProcessProbe for FixedProbe {
    fn is_alive(&self, _pid: u32) -> bool {
        self.0
    }
}
