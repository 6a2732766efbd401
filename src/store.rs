//! The list state store.
//!
//! `TaskListStore` owns the ordered task list and the transient edit state.
//! Every mutation updates memory first and then queues a full snapshot with
//! the `Persister`; the in-memory list is the source of truth for the session
//! and is never rolled back when a write fails.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::PersistenceError;
use crate::persist::Persister;
use crate::storage::{KeyValueStore, TASKS_KEY};
use crate::task::{IdGenerator, Task};

/// Whether a task title is currently being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Idle,
    Editing { id: u64, draft: String },
}

impl EditMode {
    /// Id of the task being edited, if any.
    pub fn editing_id(&self) -> Option<u64> {
        match self {
            EditMode::Idle => None,
            EditMode::Editing { id, .. } => Some(*id),
        }
    }

    pub fn draft(&self) -> Option<&str> {
        match self {
            EditMode::Idle => None,
            EditMode::Editing { draft, .. } => Some(draft),
        }
    }
}

/// Knobs for opening a store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key: String,
    pub ordered_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            key: TASKS_KEY.to_string(),
            ordered_writes: false,
        }
    }
}

/// In-memory task list mirrored to a durable key-value slot.
pub struct TaskListStore<S: KeyValueStore + 'static> {
    tasks: Vec<Task>,
    edit: EditMode,
    ids: IdGenerator,
    persister: Persister<S>,
}

impl<S: KeyValueStore + 'static> TaskListStore<S> {
    /// Read and decode the list stored under `key`.
    ///
    /// A key that was never written is an empty list.
    pub fn read_tasks(kv: &S, key: &str) -> Result<Vec<Task>, PersistenceError> {
        let blob = kv.get(key).map_err(|source| PersistenceError::Read {
            key: key.to_string(),
            source,
        })?;
        match blob {
            None => Ok(Vec::new()),
            Some(blob) => {
                serde_json::from_str(&blob).map_err(|source| PersistenceError::Malformed {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    /// Load the persisted list, falling back to an empty list on any failure.
    pub fn load(kv: Arc<S>, options: StoreOptions) -> Self {
        let tasks = match Self::read_tasks(&kv, &options.key) {
            Ok(tasks) => dedupe_ids(tasks),
            Err(e) => {
                warn!("Error loading tasks, starting fresh: {e}");
                Vec::new()
            }
        };
        debug!("Loaded {} task(s) from '{}'", tasks.len(), options.key);

        TaskListStore {
            ids: IdGenerator::after(&tasks),
            tasks,
            edit: EditMode::Idle,
            persister: Persister::new(kv, options.key, options.ordered_writes),
        }
    }

    /// Current list, in display order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks not yet completed.
    pub fn remaining(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn edit_mode(&self) -> &EditMode {
        &self.edit
    }

    pub fn persister(&self) -> &Persister<S> {
        &self.persister
    }

    /// Append a task titled with the trimmed `text`.
    ///
    /// Blank input is ignored and returns `None`.
    pub fn add(&mut self, text: &str) -> Option<u64> {
        let title = text.trim();
        if title.is_empty() {
            debug!("add: ignoring blank title");
            return None;
        }
        let id = match self.ids.next_id() {
            Some(id) => id,
            None => {
                let id = lowest_free_id(&self.tasks);
                warn!("add: id space above the largest id is used up, reusing gap {id}");
                id
            }
        };
        self.tasks.push(Task::new(id, title));
        debug!("add: task {id}");
        self.save();
        Some(id)
    }

    /// Remove the task with `id`. Unknown ids leave the list as it was.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        debug!("delete: task {id} (removed: {removed})");
        self.save();
        removed
    }

    /// Flip `completed` on the task with `id`.
    pub fn toggle_completion(&mut self, id: u64) -> bool {
        let toggled = match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        };
        debug!("toggle: task {id} (found: {toggled})");
        self.save();
        toggled
    }

    /// Enter edit mode for `id`, seeding the draft with its current title.
    ///
    /// Calling this while already editing retargets the edit.
    pub fn start_edit(&mut self, id: u64) -> bool {
        let Some(draft) = self.get(id).map(|t| t.title.clone()) else {
            debug!("start_edit: no task {id}");
            return false;
        };
        self.edit = EditMode::Editing { id, draft };
        true
    }

    /// Replace the draft text. Ignored while idle.
    pub fn set_draft(&mut self, text: &str) {
        if let EditMode::Editing { draft, .. } = &mut self.edit {
            *draft = text.to_string();
        }
    }

    /// Commit the draft as the edited task's new title and return to idle.
    ///
    /// The draft is taken as-is: no trimming, and blank titles are accepted.
    pub fn save_edit(&mut self) -> bool {
        let EditMode::Editing { id, draft } = std::mem::take(&mut self.edit) else {
            return false;
        };
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.title = draft;
        }
        debug!("save_edit: task {id}");
        self.save();
        true
    }

    /// Drop the draft without touching the list.
    pub fn cancel_edit(&mut self) {
        self.edit = EditMode::Idle;
    }

    /// Wait for all queued snapshots to land.
    pub fn flush(&mut self) {
        self.persister.flush();
    }

    fn save(&mut self) {
        self.persister.persist(&self.tasks);
    }
}

/// Smallest positive id not held by any task.
fn lowest_free_id(tasks: &[Task]) -> u64 {
    let taken: HashSet<u64> = tasks.iter().map(|t| t.id).collect();
    (1..=u64::MAX).find(|id| !taken.contains(id)).unwrap_or(0)
}

fn dedupe_ids(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let before = tasks.len();
    let tasks: Vec<Task> = tasks.into_iter().filter(|t| seen.insert(t.id)).collect();
    if tasks.len() != before {
        warn!("Dropped {} task(s) with duplicate ids", before - tasks.len());
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use proptest::prelude::*;

    // Ordered writes so the snapshot after `flush` is always the latest one.
    fn ordered() -> StoreOptions {
        StoreOptions { ordered_writes: true, ..StoreOptions::default() }
    }

    fn fresh() -> (Arc<MemoryStore>, TaskListStore<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        let store = TaskListStore::load(Arc::clone(&kv), ordered());
        (kv, store)
    }

    fn persisted(kv: &MemoryStore) -> Vec<Task> {
        TaskListStore::read_tasks(kv, TASKS_KEY).unwrap()
    }

    #[test]
    fn load_absent_key_is_empty() {
        let (kv, store) = fresh();
        assert!(store.is_empty());
        assert_eq!(kv.get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn load_reads_existing_list_in_order() {
        let blob = concat!(
            r#"[{"id":5,"title":"b","completed":true},"#,
            r#"{"id":2,"title":"a","completed":false}]"#
        );
        let kv = Arc::new(MemoryStore::with_entry(TASKS_KEY, blob));
        let store = TaskListStore::load(kv, StoreOptions::default());
        let ids: Vec<u64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![5, 2]);
        assert!(store.get(5).unwrap().completed);
        assert_eq!(store.remaining(), 1);
    }

    #[test]
    fn load_corrupted_blob_falls_back_to_empty() {
        for blob in ["not json", "{\"id\":1}", "[{\"id\":\"x\"}]", ""] {
            let kv = Arc::new(MemoryStore::with_entry(TASKS_KEY, blob));
            let store = TaskListStore::load(kv, StoreOptions::default());
            assert!(store.is_empty(), "blob {blob:?} should load as empty");
        }
    }

    #[test]
    fn read_tasks_reports_malformed() {
        let kv = MemoryStore::with_entry(TASKS_KEY, "[oops");
        let err = TaskListStore::read_tasks(&kv, TASKS_KEY).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed { .. }));
    }

    #[test]
    fn load_drops_duplicate_ids() {
        let blob = concat!(
            r#"[{"id":1,"title":"a","completed":false},"#,
            r#"{"id":1,"title":"b","completed":true}]"#
        );
        let kv = Arc::new(MemoryStore::with_entry(TASKS_KEY, blob));
        let store = TaskListStore::load(kv, StoreOptions::default());
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].title, "a");
    }

    #[test]
    fn add_trims_and_appends() {
        let (kv, mut store) = fresh();
        let id = store.add("  Buy milk \n").unwrap();
        store.flush();

        assert_eq!(store.tasks(), &[Task { id, title: "Buy milk".into(), completed: false }]);
        assert_eq!(persisted(&kv), store.tasks());
    }

    #[test]
    fn add_blank_is_ignored() {
        let (kv, mut store) = fresh();
        assert_eq!(store.add(""), None);
        assert_eq!(store.add("   "), None);
        assert_eq!(store.add("\t\n"), None);
        store.flush();
        assert!(store.is_empty());
        assert_eq!(kv.get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn add_keeps_insertion_order() {
        let (_, mut store) = fresh();
        store.add("one");
        store.add("two");
        store.add("three");
        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[test]
    fn new_ids_exceed_loaded_ids() {
        let far = u64::MAX / 4;
        let blob = format!(r#"[{{"id":{far},"title":"x","completed":false}}]"#);
        let kv = Arc::new(MemoryStore::with_entry(TASKS_KEY, &blob));
        let mut store = TaskListStore::load(kv, StoreOptions::default());
        assert_eq!(store.add("y"), Some(far + 1));
    }

    #[test]
    fn ids_stay_unique_after_loading_the_largest_id() {
        let blob = serde_json::json!([
            {"id": u64::MAX, "title": "x", "completed": false},
            {"id": 1, "title": "w", "completed": false}
        ])
        .to_string();
        let kv = Arc::new(MemoryStore::with_entry(TASKS_KEY, &blob));
        let mut store = TaskListStore::load(kv, ordered());

        assert_eq!(store.add("y"), Some(2));
        assert_eq!(store.add("z"), Some(3));
        let ids: HashSet<u64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn delete_removes_and_persists() {
        let (kv, mut store) = fresh();
        let a = store.add("a").unwrap();
        let b = store.add("b").unwrap();
        assert!(store.delete(a));
        store.flush();
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].id, b);
        assert_eq!(persisted(&kv), store.tasks());
    }

    #[test]
    fn delete_unknown_id_changes_nothing() {
        let (_, mut store) = fresh();
        store.add("a");
        store.add("b");
        let before = store.tasks().to_vec();
        assert!(!store.delete(42));
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn toggle_twice_restores() {
        let (kv, mut store) = fresh();
        let id = store.add("a").unwrap();

        assert!(store.toggle_completion(id));
        assert!(store.get(id).unwrap().completed);
        store.flush();
        assert!(persisted(&kv)[0].completed);

        assert!(store.toggle_completion(id));
        assert!(!store.get(id).unwrap().completed);
        store.flush();
        assert_eq!(persisted(&kv), store.tasks());
    }

    #[test]
    fn toggle_unknown_id_is_noop() {
        let (_, mut store) = fresh();
        store.add("a");
        let before = store.tasks().to_vec();
        assert!(!store.toggle_completion(1));
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn edit_then_cancel_keeps_title() {
        let (kv, mut store) = fresh();
        let id = store.add("original").unwrap();
        store.flush();

        assert!(store.start_edit(id));
        assert_eq!(
            store.edit_mode(),
            &EditMode::Editing { id, draft: "original".into() }
        );
        store.set_draft("something else");
        store.cancel_edit();

        assert_eq!(store.edit_mode(), &EditMode::Idle);
        assert_eq!(store.get(id).unwrap().title, "original");
        store.flush();
        assert_eq!(persisted(&kv)[0].title, "original");
    }

    #[test]
    fn edit_then_save_updates_only_that_task() {
        let (kv, mut store) = fresh();
        let a = store.add("a").unwrap();
        let b = store.add("b").unwrap();

        store.start_edit(b);
        store.set_draft("bee");
        assert!(store.save_edit());
        store.flush();

        assert_eq!(store.edit_mode(), &EditMode::Idle);
        assert_eq!(store.get(a).unwrap().title, "a");
        assert_eq!(store.get(b).unwrap().title, "bee");
        assert_eq!(persisted(&kv), store.tasks());
    }

    #[test]
    fn save_edit_accepts_blank_and_untrimmed_drafts() {
        let (_, mut store) = fresh();
        let id = store.add("a").unwrap();

        store.start_edit(id);
        store.set_draft("   ");
        store.save_edit();
        assert_eq!(store.get(id).unwrap().title, "   ");

        store.start_edit(id);
        store.set_draft("");
        store.save_edit();
        assert_eq!(store.get(id).unwrap().title, "");
    }

    #[test]
    fn start_edit_retargets() {
        let (_, mut store) = fresh();
        let a = store.add("a").unwrap();
        let b = store.add("b").unwrap();

        store.start_edit(a);
        store.set_draft("changed");
        store.start_edit(b);
        assert_eq!(store.edit_mode(), &EditMode::Editing { id: b, draft: "b".into() });

        store.save_edit();
        assert_eq!(store.get(a).unwrap().title, "a");
    }

    #[test]
    fn start_edit_unknown_id_stays_idle() {
        let (_, mut store) = fresh();
        assert!(!store.start_edit(99));
        assert_eq!(store.edit_mode(), &EditMode::Idle);
        store.set_draft("ignored");
        assert_eq!(store.edit_mode(), &EditMode::Idle);
    }

    #[test]
    fn save_edit_while_idle_does_not_write() {
        let (_, mut store) = fresh();
        assert!(!store.save_edit());
        assert_eq!(store.persister().last_sequence(), 0);
    }

    #[test]
    fn save_edit_after_delete_leaves_list_alone() {
        let (kv, mut store) = fresh();
        let a = store.add("a").unwrap();
        let b = store.add("b").unwrap();
        store.start_edit(a);
        store.set_draft("gone");
        store.delete(a);

        assert!(store.save_edit());
        store.flush();
        assert_eq!(store.edit_mode(), &EditMode::Idle);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].id, b);
        assert_eq!(persisted(&kv), store.tasks());
    }

    #[test]
    fn edit_mode_is_not_persisted() {
        let (kv, mut store) = fresh();
        let id = store.add("a").unwrap();
        let writes = store.persister().last_sequence();
        store.start_edit(id);
        store.set_draft("draft");
        assert_eq!(store.persister().last_sequence(), writes);
        store.flush();
        assert!(!kv.get(TASKS_KEY).unwrap().unwrap().contains("draft"));
    }

    #[test]
    fn reload_sees_previous_session() {
        let kv = Arc::new(MemoryStore::new());
        {
            let mut store = TaskListStore::load(Arc::clone(&kv), ordered());
            let id = store.add("persist me").unwrap();
            store.toggle_completion(id);
        }
        let store = TaskListStore::load(kv, StoreOptions::default());
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].title, "persist me");
        assert!(store.tasks()[0].completed);
    }

    #[test]
    fn file_store_survives_restart() {
        use crate::storage::FileStore;

        let dir = tempfile::tempdir().unwrap();
        {
            let kv = Arc::new(FileStore::open(dir.path()).unwrap());
            let mut store = TaskListStore::load(kv, ordered());
            store.add("first");
            let second = store.add("second").unwrap();
            store.toggle_completion(second);
        }
        let kv = Arc::new(FileStore::open(dir.path()).unwrap());
        let store = TaskListStore::load(kv, StoreOptions::default());
        let summary: Vec<(&str, bool)> = store
            .tasks()
            .iter()
            .map(|t| (t.title.as_str(), t.completed))
            .collect();
        assert_eq!(summary, vec![("first", false), ("second", true)]);
    }

    #[test]
    fn unreadable_file_store_falls_back_to_empty() {
        use crate::storage::FileStore;

        let dir = tempfile::tempdir().unwrap();
        let kv = FileStore::open(dir.path()).unwrap();
        std::fs::create_dir(kv.path_for(TASKS_KEY)).unwrap();

        let err = TaskListStore::read_tasks(&kv, TASKS_KEY).unwrap_err();
        assert!(err.is_read());
        let store = TaskListStore::load(Arc::new(kv), StoreOptions::default());
        assert!(store.is_empty());
    }

    #[test]
    fn write_failure_keeps_memory() {
        struct ReadOnly;
        impl KeyValueStore for ReadOnly {
            fn get(&self, _key: &str) -> std::io::Result<Option<String>> {
                Ok(None)
            }
            fn set(&self, _key: &str, _value: &str) -> std::io::Result<()> {
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
            }
        }

        let mut store = TaskListStore::load(Arc::new(ReadOnly), StoreOptions::default());
        let id = store.add("kept").unwrap();
        store.toggle_completion(id);
        store.flush();

        assert_eq!(store.persister().failed_writes(), 2);
        assert_eq!(store.tasks(), &[Task { id, title: "kept".into(), completed: true }]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String),
        Delete(usize),
        Toggle(usize),
        Edit(usize, String),
        Cancel(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[ a-z]{0,6}".prop_map(Op::Add),
            (0usize..8).prop_map(Op::Delete),
            (0usize..8).prop_map(Op::Toggle),
            ((0usize..8), "[ a-z]{0,6}").prop_map(|(i, s)| Op::Edit(i, s)),
            (0usize..8).prop_map(Op::Cancel),
        ]
    }

    fn pick(store: &TaskListStore<MemoryStore>, i: usize) -> u64 {
        store.tasks().get(i).map(|t| t.id).unwrap_or(u64::MAX)
    }

    proptest! {
        #[test]
        fn ids_unique_and_snapshot_matches(ops in proptest::collection::vec(op(), 0..40)) {
            let (kv, mut store) = fresh();
            for op in ops {
                match op {
                    Op::Add(s) => {
                        store.add(&s);
                    }
                    Op::Delete(i) => {
                        let id = pick(&store, i);
                        store.delete(id);
                    }
                    Op::Toggle(i) => {
                        let id = pick(&store, i);
                        store.toggle_completion(id);
                    }
                    Op::Edit(i, s) => {
                        let id = pick(&store, i);
                        store.start_edit(id);
                        store.set_draft(&s);
                        store.save_edit();
                    }
                    Op::Cancel(i) => {
                        let id = pick(&store, i);
                        store.start_edit(id);
                        store.set_draft("discarded");
                        store.cancel_edit();
                    }
                }
            }

            let ids: HashSet<u64> = store.tasks().iter().map(|t| t.id).collect();
            prop_assert_eq!(ids.len(), store.len());

            store.flush();
            if store.persister().last_sequence() > 0 {
                prop_assert_eq!(persisted(&kv), store.tasks().to_vec());
            }
        }
    }
}
