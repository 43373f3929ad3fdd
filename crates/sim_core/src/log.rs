use crate::{GameContent, GameState, LogEntry, LogEntryId, LogTone};

/// Pushes a narration entry at the front of the log, dropping the oldest
/// entries beyond the configured capacity.
pub(crate) fn narrate(
    state: &mut GameState,
    content: &GameContent,
    message: impl Into<String>,
    tone: LogTone,
) {
    let id = LogEntryId(format!("log_{:06}", state.counters.next_log_entry_id));
    state.counters.next_log_entry_id += 1;
    state.event_log.push_front(LogEntry {
        id,
        cycle: state.meta.cycle,
        message: message.into(),
        tone,
    });
    state
        .event_log
        .truncate(content.constants.event_log_capacity);
}
