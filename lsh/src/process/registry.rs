use nix::unistd::Pid;

use super::job::Job;

/// Stable handle to a registry entry. Display positions (`jid`) shift when
/// earlier jobs are removed; handles never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Placeholder for a job that has not been inserted yet.
    pub(crate) fn unassigned() -> Self {
        JobId(0)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-ordered collection of jobs. Insertion order is what gives
/// position-based addressing (`%N`, the `jobs` listing) predictable
/// behavior across a session.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
    next_id: u64,
}

impl JobRegistry {
    pub fn new() -> Self {
        JobRegistry {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Insert a job and hand back its stable handle.
    pub fn push(&mut self, mut job: Job) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        job.id = id;
        self.jobs.push(job);
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    /// Display position of a job among the currently live entries.
    pub fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id)
    }

    pub fn find_by_pgid(&self, pgid: Pid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.pgid == Some(pgid))
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let idx = self.position(id)?;
        Some(self.jobs.remove(idx))
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Job> {
        self.jobs.drain(..)
    }

    pub(crate) fn as_slice(&self) -> &[Job] {
        &self.jobs
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Job] {
        &mut self.jobs
    }

    /// True when nothing in the registry ever forked; a blocking wait would
    /// then have no children to report on and must not be attempted.
    pub fn all_builtin(&self) -> bool {
        self.jobs.iter().all(|j| !j.forked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(cmd: &str) -> Job {
        Job::new(cmd)
    }

    #[test]
    fn test_position_shifts_after_removal() {
        let mut registry = JobRegistry::new();
        let a = registry.push(job("a"));
        let b = registry.push(job("b"));
        let c = registry.push(job("c"));

        assert_eq!(registry.position(a), Some(0));
        assert_eq!(registry.position(b), Some(1));
        assert_eq!(registry.position(c), Some(2));

        registry.remove(a).unwrap();

        // positions are a view over live entries, not stored ids
        assert_eq!(registry.position(a), None);
        assert_eq!(registry.position(b), Some(0));
        assert_eq!(registry.position(c), Some(1));
    }

    #[test]
    fn test_handles_stay_valid_after_removal() {
        let mut registry = JobRegistry::new();
        let a = registry.push(job("a"));
        let b = registry.push(job("b"));

        registry.remove(a);
        assert!(registry.get(a).is_none());
        assert_eq!(registry.get(b).unwrap().cmd, "b");
    }

    #[test]
    fn test_find_by_pgid() {
        let mut registry = JobRegistry::new();
        let mut j = job("sleep 10");
        j.pgid = Some(Pid::from_raw(4242));
        registry.push(j);
        registry.push(job("jobs"));

        assert!(registry.find_by_pgid(Pid::from_raw(4242)).is_some());
        assert!(registry.find_by_pgid(Pid::from_raw(999_999)).is_none());
    }

    #[test]
    fn test_all_builtin() {
        let mut registry = JobRegistry::new();
        assert!(registry.all_builtin());

        let id = registry.push(job("jobs"));
        assert!(registry.all_builtin());

        registry.get_mut(id).unwrap().forked = true;
        assert!(!registry.all_builtin());
    }
}
