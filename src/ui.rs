use std::fmt::Write as _;

use lap_core::{format_hms, format_mmss, format_signed, LapTimerSnapshot, Phase};

use crate::storage::HistoryEntry;

pub const HELP_TEXT: &str = "LAP TIMER HELP\n\n\
     Enter  Start/Pause\n\
     l      Complete lap\n\
     r      Reset\n\
     b      Clear banked time\n\
     a      Toggle auto-lap\n\
     z      Background/Foreground\n\
     h      Help\n\
     q      Quit\n\n\
     :time MM:SS   Set total time\n\
     :distance N   Set total distance\n\
     :lap N        Set lap distance";

fn phase_label(phase: &Phase) -> &'static str {
    match phase {
        Phase::Idle => "READY",
        Phase::Running { ticking: true, .. } => "RUN",
        Phase::Running { ticking: false, .. } => "PAUSE",
        Phase::Completed { .. } => "DONE",
    }
}

/// "MM:SS", switching to "HH:MM:SS" from one hour up.
fn format_duration(secs: u32) -> String {
    if secs >= 3600 {
        format_hms(secs)
    } else {
        format_mmss(secs)
    }
}

/// One-line status for the terminal.
pub fn status_line(s: &LapTimerSnapshot) -> String {
    let mut line = format!(
        "[{}] {}  lap {}/{}",
        phase_label(&s.phase),
        format_duration(s.remaining_total_seconds),
        s.current_lap_index + 1,
        s.total_laps
    );
    if s.is_counting_up {
        write!(line, "  over +{}s", s.count_up_seconds).ok();
    } else if s.is_in_extra_time {
        write!(line, "  extra {}s", s.current_lap_remaining_seconds).ok();
    } else {
        write!(line, "  left {}s", s.current_lap_remaining_seconds).ok();
    }
    write!(line, "  bank {}", format_signed(s.banked_time_seconds)).ok();
    if s.is_auto_lap_enabled {
        line.push_str("  auto");
    }
    line
}

/// Per-lap banking table shown when a session ends.
pub fn summary(s: &LapTimerSnapshot) -> String {
    let mut out = String::from("Session summary\n");
    for (i, saved) in s.per_lap_banked_seconds.iter().enumerate() {
        writeln!(out, "  lap {:>2}  {}", i + 1, format_signed(*saved)).ok();
    }
    write!(out, "  total   {}", format_signed(s.banked_time_seconds)).ok();
    if s.is_in_extra_time {
        out.push_str("  (finished in extra time)");
    }
    out
}

pub fn history_table(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No sessions recorded".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        writeln!(
            out,
            "{}  total {}  lap {} @ {}s  laps {}",
            entry.recorded_at.format("%Y-%m-%d %H:%M"),
            format_duration(entry.total_time_seconds),
            entry.lap_distance,
            entry.lap_duration_seconds,
            entry.completed_laps
        )
        .ok();
    }
    out.pop();
    out
}
