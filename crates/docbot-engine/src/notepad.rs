use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use docbot_types::model::NoteEntry;
use parking_lot::{Mutex, RwLock};

use crate::bus::EventBus;
use crate::tracker::{TrackerEvent, TrackerEventKind};

/// Hierarchical, thread-safe notepad shared by every agent in a scope's
/// tree. Agents write findings under dot-notation topics (`symbols.login`,
/// `patterns.auth`); parent agents read everything under a prefix to
/// synthesise it into higher-level documentation.
///
/// Single mutex, read returns a copy (spec §4.1/§5): per-topic entry order
/// is strictly append in writer-arrival order, and `write` releases the
/// lock before publishing its events, so a subscriber reacting to an event
/// can safely call back into `read` without deadlocking.
pub struct Notepad {
    entries: RwLock<HashMap<String, Vec<NoteEntry>>>,
    questions: RwLock<Vec<String>>,
    bus: Mutex<Option<Arc<EventBus>>>,
    seq: AtomicU64,
}

impl Default for Notepad {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            questions: RwLock::new(Vec::new()),
            bus: Mutex::new(None),
            seq: AtomicU64::new(0),
        }
    }
}

impl Notepad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire this notepad up to a run's event bus. Every subsequent write
    /// publishes `notepad_created` (first write to a topic) and
    /// `notepad_write` (every write), per spec §4.1.
    pub fn attach_bus(&self, bus: Arc<EventBus>) {
        *self.bus.lock() = Some(bus);
    }

    fn publish(&self, node_id: &str, kind: TrackerEventKind) {
        if let Some(bus) = self.bus.lock().as_ref() {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            bus.publish(TrackerEvent {
                seq,
                node_id: node_id.to_string(),
                timestamp: Utc::now(),
                kind,
            });
        }
    }

    /// Append `content` under `topic`, authored by `author`. Returns the
    /// formatted, author-tagged dump of the topic's full history (the echo
    /// string a tool call hands back to the calling agent).
    ///
    /// Events are emitted after the entries lock is released — emission
    /// never happens while holding the notepad's lock (spec §5 deadlock
    /// rule: leaf-first locking, never nested).
    pub fn write(&self, topic: &str, content: &str, author: &str) -> String {
        let is_first_write = {
            let mut entries = self.entries.write();
            let is_first = !entries.contains_key(topic);
            entries
                .entry(topic.to_string())
                .or_default()
                .push(NoteEntry {
                    topic: topic.to_string(),
                    author: author.to_string(),
                    content: content.to_string(),
                    timestamp: Utc::now(),
                });
            is_first
        };

        if is_first_write {
            self.publish(author, TrackerEventKind::NotepadCreated { topic: topic.to_string() });
        }
        self.publish(
            author,
            TrackerEventKind::NotepadWrite { topic: topic.to_string(), author: author.to_string() },
        );

        self.dump_topic(topic)
    }

    pub fn write_question(&self, question: &str, author: &str) {
        self.questions.write().push(format!("[{author}] {question}"));
    }

    pub fn read(&self, topic: &str) -> Vec<NoteEntry> {
        self.entries.read().get(topic).cloned().unwrap_or_default()
    }

    /// Formatted, author-tagged dump of one topic — what `write` echoes
    /// back and what `read_file`-adjacent tools can request directly.
    pub fn dump_topic(&self, topic: &str) -> String {
        let entries = self.entries.read();
        match entries.get(topic) {
            None | Some([]) => format!("(topic '{topic}' is empty)"),
            Some(notes) => {
                let mut out = format!("## {topic}\n");
                for note in notes {
                    out.push_str(&format!("- [{}]: {}\n", note.author, note.content));
                }
                out.trim_end().to_string()
            }
        }
    }

    pub fn read_prefix(&self, prefix: &str) -> HashMap<String, Vec<NoteEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn list_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.entries.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn read_all(&self) -> HashMap<String, Vec<NoteEntry>> {
        self.entries.read().clone()
    }

    /// Serialize the whole notepad, e.g. for persistence alongside a run's
    /// history.
    pub fn serialize(&self) -> HashMap<String, Vec<NoteEntry>> {
        self.read_all()
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.read().clone()
    }

    /// Serialize the notepad for LLM context, truncating once the budget
    /// is exhausted rather than failing or silently omitting topics.
    pub fn to_context_string(&self, max_chars: usize) -> String {
        let entries = self.entries.read();
        if entries.is_empty() {
            return "(notepad empty)".to_string();
        }

        let mut topics: Vec<&String> = entries.keys().collect();
        topics.sort();

        let mut out = String::new();
        for topic in topics {
            let header = format!("\n## {topic}\n");
            if out.len() + header.len() > max_chars {
                out.push_str("\n... (notepad truncated)");
                break;
            }
            out.push_str(&header);

            for note in &entries[topic] {
                let line = format!("- [{}]: {}\n", note.author, note.content);
                if out.len() + line.len() > max_chars {
                    out.push_str("... (truncated)");
                    return out;
                }
                out.push_str(&line);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_by_topic() {
        let pad = Notepad::new();
        pad.write("symbols.login", "handles credential checks", "FileAgent:auth.py");
        pad.write("symbols.login", "also rate-limits", "FileAgent:ratelimit.py");

        let entries = pad.read("symbols.login");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].author, "FileAgent:auth.py");
    }

    #[test]
    fn write_returns_formatted_topic_dump() {
        let pad = Notepad::new();
        let echo = pad.write("symbols.login", "handles credential checks", "FileAgent:auth.py");
        assert!(echo.contains("## symbols.login"));
        assert!(echo.contains("[FileAgent:auth.py]: handles credential checks"));
    }

    #[test]
    fn read_prefix_groups_related_topics() {
        let pad = Notepad::new();
        pad.write("symbols.login", "a", "x");
        pad.write("symbols.logout", "b", "y");
        pad.write("patterns.auth", "c", "z");

        let grouped = pad.read_prefix("symbols.");
        assert_eq!(grouped.len(), 2);
        assert!(!grouped.contains_key("patterns.auth"));
    }

    #[test]
    fn context_string_truncates_at_budget() {
        let pad = Notepad::new();
        for i in 0..200 {
            pad.write("topic", &"x".repeat(50), &format!("author{i}"));
        }
        let ctx = pad.to_context_string(500);
        assert!(ctx.len() <= 560);
        assert!(ctx.contains("truncated"));
    }

    #[test]
    fn empty_notepad_reports_empty() {
        let pad = Notepad::new();
        assert_eq!(pad.to_context_string(8000), "(notepad empty)");
    }

    #[test]
    fn records_questions_separately_from_notes() {
        let pad = Notepad::new();
        pad.write_question("is this dead code?", "FileAgent:util.py");
        assert_eq!(pad.questions(), vec!["[FileAgent:util.py] is this dead code?".to_string()]);
    }

    #[test]
    fn list_topics_is_sorted() {
        let pad = Notepad::new();
        pad.write("b.topic", "x", "a");
        pad.write("a.topic", "y", "a");
        assert_eq!(pad.list_topics(), vec!["a.topic".to_string(), "b.topic".to_string()]);
    }

    #[test]
    fn emits_created_once_then_write_every_time() {
        let pad = Notepad::new();
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.take_receiver().unwrap();
        pad.attach_bus(bus);

        pad.write("symbols.login", "first", "a");
        pad.write("symbols.login", "second", "a");

        let first = rx.try_recv().unwrap();
        assert!(matches!(first.kind, TrackerEventKind::NotepadCreated { .. }));
        let second = rx.try_recv().unwrap();
        assert!(matches!(second.kind, TrackerEventKind::NotepadWrite { .. }));
        let third = rx.try_recv().unwrap();
        assert!(matches!(third.kind, TrackerEventKind::NotepadWrite { .. }));
        assert!(rx.try_recv().is_err());
    }
}
