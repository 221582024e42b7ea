//! Process lookup by executable name.

use std::io;
use std::time::Duration;

use sysinfo::System;

/// Result of a process-by-name query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessQuery {
    pub running: bool,
    pub pid: Option<i64>,
    pub pids: Vec<i64>,
}

/// Probe capability the status engine depends on.
///
/// Production code uses [`SystemProbes`]; tests inject deterministic
/// implementations so status payloads are reproducible.
pub trait StatusProbes: Send + Sync {
    fn query_process_by_name(&self, name: &str) -> io::Result<ProcessQuery>;
    fn check_port_listening(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

/// Probes backed by the live system.
#[derive(Debug, Default)]
pub struct SystemProbes;

impl StatusProbes for SystemProbes {
    fn query_process_by_name(&self, name: &str) -> io::Result<ProcessQuery> {
        Ok(query_process_by_name(name))
    }

    fn check_port_listening(&self, host: &str, port: u16, timeout: Duration) -> bool {
        crate::port::check_port_listening(host, port, timeout)
    }
}

/// Finds processes whose executable name matches `name` exactly,
/// case-insensitively. `pid` is the smallest matching pid.
pub fn query_process_by_name(name: &str) -> ProcessQuery {
    let target = name.trim();
    if target.is_empty() {
        return ProcessQuery::default();
    }

    let system = System::new_all();
    let mut pids: Vec<i64> = system
        .processes()
        .values()
        .filter(|process| {
            process
                .name()
                .to_string_lossy()
                .eq_ignore_ascii_case(target)
        })
        .map(|process| i64::from(process.pid().as_u32()))
        .collect();

    pids.sort_unstable();
    pids.dedup();

    if pids.is_empty() {
        return ProcessQuery::default();
    }

    ProcessQuery {
        running: true,
        pid: pids.first().copied(),
        pids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_not_running() {
        let query = query_process_by_name("  ");
        assert!(!query.running);
        assert!(query.pid.is_none());
        assert!(query.pids.is_empty());
    }

    #[test]
    fn nonexistent_process_is_not_running() {
        let query = query_process_by_name("gpi-definitely-not-a-process-7d1f");
        assert!(!query.running);
    }
}
