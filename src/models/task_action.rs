use derive_more::Display;
use uuid::Uuid;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Mount,
    Unmount,
    RescanAll,
    ScanOne,
    ScanExternal,
    AddMod,
    DeleteMod,
    MakeShortcut,
}

impl TaskKind {
    /// (present participle, verb, past tense) used by status messages.
    fn wording(self) -> (&'static str, &'static str, &'static str) {
        match self {
            TaskKind::Mount => ("Mounting", "mount", "Mounted"),
            TaskKind::Unmount => ("Unmounting", "unmount", "Unmounted"),
            TaskKind::RescanAll => ("Refreshing", "refresh", "Refreshed"),
            TaskKind::ScanOne | TaskKind::ScanExternal => ("Scanning", "scan", "Scanned"),
            TaskKind::AddMod => ("Adding", "add", "Added"),
            TaskKind::DeleteMod => ("Deleting", "delete", "Deleted"),
            TaskKind::MakeShortcut => ("Creating shortcut", "create shortcut", "Created shortcut"),
        }
    }

    pub fn processing(self) -> &'static str {
        self.wording().0
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Succeeded,
    Failed,
    Missing,
}

impl Outcome {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            Outcome::Succeeded => 0,
            Outcome::Failed => 1,
            Outcome::Missing => 2,
        }
    }
}

/// One unit of work and its outcome.
///
/// Kind and target are fixed at creation. Counters only grow and `aborted`
/// only goes from false to true; both are written by the owning worker and
/// read by the caller once the completion event arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskAction {
    id: Uuid,
    kind: TaskKind,
    target: String,
    results: [u64; Outcome::COUNT],
    aborted: bool,
    /// Set when the task could not start at all (missing root, unopenable ledger).
    error: Option<String>,
}

impl TaskAction {
    pub fn new(kind: TaskKind, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target: target.into(),
            results: [0; Outcome::COUNT],
            aborted: false,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn get(&self, outcome: Outcome) -> u64 {
        self.results[outcome.index()]
    }

    pub fn add(&mut self, outcome: Outcome, amount: u64) {
        self.results[outcome.index()] += amount;
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.add(outcome, 1);
    }

    pub fn files_processed(&self) -> bool {
        self.results.iter().any(|&n| n > 0)
    }

    pub fn errors(&self) -> bool {
        self.get(Outcome::Failed) > 0
            || self.get(Outcome::Missing) > 0
            || self.aborted
            || self.error.is_some()
    }

    /// AddMod keeps partial copies: anything succeeded means the mod exists.
    pub fn success(&self) -> bool {
        (self.get(Outcome::Succeeded) > 0
            || matches!(self.kind, TaskKind::Unmount | TaskKind::DeleteMod))
            && (!self.errors() || self.kind == TaskKind::AddMod)
            && self.error.is_none()
    }

    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn fail_to_start(&mut self, reason: impl Into<String>) {
        self.error = Some(reason.into());
    }

    pub fn start_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// One-line status text for the finished action.
    pub fn summary(&self) -> String {
        let (processing, verb, past) = self.kind.wording();

        let head = if let Some(reason) = &self.error {
            format!("Failed to {verb} {}: {reason}", self.target)
        } else if self.aborted {
            format!("{processing} {}: aborted", self.target)
        } else if !self.files_processed() {
            format!("No files to {verb}")
        } else if self.success() {
            format!("{past} {}", self.target)
        } else {
            format!("Failed to {verb} {}", self.target)
        };

        if !self.errors() || !self.files_processed() {
            return format!("{head}.");
        }

        let past = past.to_lowercase();
        let mut details = vec![format!("{} files {past}", self.get(Outcome::Succeeded))];
        if self.get(Outcome::Failed) > 0 {
            details.push(format!("{} files failed", self.get(Outcome::Failed)));
        }
        if self.get(Outcome::Missing) > 0 {
            details.push(format!("{} files missing", self.get(Outcome::Missing)));
        }
        format!("{head}. [{}]", details.join(", "))
    }
}
