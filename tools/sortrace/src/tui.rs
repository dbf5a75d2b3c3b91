use crate::errors::SortraceError;
use crate::hotkeys::controls_legend;
use crate::logging::structured_fallback_line;
use crate::playback::{PlaybackObserver, StreamReport};
use crate::race::RunState;
use crate::runtime::Terminal;
use crate::snapshot::{Snapshot, Value};
use crate::sort::Algorithm;
use ratatui::backend::TestBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};
use std::sync::{Arc, Mutex, PoisonError};

/// Lanes never draw more than this many bars.
pub const MAX_BARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaceView {
    pub quicksort: Vec<Value>,
    pub mergesort: Vec<Value>,
    pub state: RunState,
    pub controls: Option<String>,
}

impl RaceView {
    pub fn new(input: &[Value]) -> Self {
        Self {
            quicksort: input.to_vec(),
            mergesort: input.to_vec(),
            ..Self::default()
        }
    }

    pub fn lane(&self, algorithm: Algorithm) -> &[Value] {
        match algorithm {
            Algorithm::Quicksort => &self.quicksort,
            Algorithm::Mergesort => &self.mergesort,
        }
    }

    fn lane_mut(&mut self, algorithm: Algorithm) -> &mut Vec<Value> {
        match algorithm {
            Algorithm::Quicksort => &mut self.quicksort,
            Algorithm::Mergesort => &mut self.mergesort,
        }
    }
}

pub fn status_line(state: &RunState) -> String {
    if state.busy {
        return "Sorting...".to_string();
    }
    let timers = Algorithm::ALL
        .iter()
        .filter(|algorithm| state.elapsed_ms(**algorithm) > 0)
        .map(|algorithm| format!("{} time: {} ms", algorithm.title(), state.elapsed_ms(*algorithm)))
        .collect::<Vec<_>>();
    if timers.is_empty() {
        "Ready".to_string()
    } else {
        timers.join("  ")
    }
}

pub fn render_race(view: &RaceView, width: u16, height: u16) -> Result<String, SortraceError> {
    let backend = TestBackend::new(width, height);
    let mut terminal =
        ratatui::Terminal::new(backend).map_err(|e| SortraceError::Render(e.to_string()))?;
    terminal
        .draw(|frame| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(5)])
                .split(frame.area());

            let mut status = status_line(&view.state);
            if let Some(controls) = &view.controls {
                status = format!("{status} | {controls}");
            }
            frame.render_widget(
                Paragraph::new(status).block(Block::default().borders(Borders::ALL).title("Race")),
                rows[0],
            );

            let lanes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(rows[1]);
            for (algorithm, area) in Algorithm::ALL.iter().zip(lanes.iter()) {
                let bars = view
                    .lane(*algorithm)
                    .iter()
                    .take(MAX_BARS)
                    .map(|value| {
                        Bar::default()
                            .value(u64::try_from(*value).unwrap_or(0))
                            .text_value(String::new())
                    })
                    .collect::<Vec<_>>();
                let chart = BarChart::default()
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(algorithm.title()),
                    )
                    .bar_width(1)
                    .bar_gap(0)
                    .bar_style(Style::default().fg(Color::Cyan))
                    .data(BarGroup::default().bars(&bars));
                frame.render_widget(chart, *area);
            }
        })
        .map_err(|e| SortraceError::Render(e.to_string()))?;

    let mut out = String::new();
    let buffer = terminal.backend().buffer();
    for y in 0..height {
        for x in 0..width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}

/// Playback observer that shows each snapshot on a terminal.
///
/// On a tty every event redraws the whole frame; otherwise one structured
/// line is written per event.
pub struct TerminalPresenter {
    terminal: Arc<dyn Terminal>,
    view: Mutex<RaceView>,
    state: Arc<Mutex<RunState>>,
    width: u16,
    height: u16,
}

impl TerminalPresenter {
    pub fn new(
        terminal: Arc<dyn Terminal>,
        input: &[Value],
        state: Arc<Mutex<RunState>>,
    ) -> Self {
        Self {
            terminal,
            view: Mutex::new(RaceView::new(input)),
            state,
            width: 120,
            height: 30,
        }
    }

    pub fn with_controls(self, legend: String) -> Self {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .controls = Some(legend);
        self
    }

    pub fn view(&self) -> RaceView {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Draw the current view; used before a run starts and after it ends.
    pub fn redraw(&self) -> Result<(), SortraceError> {
        if !self.terminal.stdin_is_tty() {
            return Ok(());
        }
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        view.state = *self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let frame = render_race(&view, self.width, self.height)?;
        drop(view);
        self.terminal.draw(&frame)
    }

    fn present(&self, fallback: impl FnOnce() -> String) {
        let result = if self.terminal.stdin_is_tty() {
            self.redraw()
        } else {
            self.terminal.write_line(&fallback())
        };
        if let Err(error) = result {
            crate::logging::append_run_log(
                "warn",
                "presenter.write_failed",
                serde_json::json!({ "error": error.to_string() }),
            );
        }
    }
}

impl PlaybackObserver<Value> for TerminalPresenter {
    fn on_snapshot(&self, algorithm: Algorithm, index: usize, snapshot: &Snapshot<Value>) {
        {
            let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
            *view.lane_mut(algorithm) = snapshot.to_vec();
        }
        self.present(|| {
            structured_fallback_line(
                algorithm.as_str(),
                "step",
                &format!("{index} {:?}", snapshot.as_slice()),
            )
        });
    }

    fn on_stream_finished(&self, report: &StreamReport) {
        self.present(|| {
            structured_fallback_line(
                report.algorithm.as_str(),
                "finished",
                &format!("elapsed_ms={} steps={}", report.elapsed_ms, report.emitted),
            )
        });
    }
}

/// Legend shown under the race in interactive mode.
pub fn interactive_legend(distribution: &str, size: &str) -> String {
    format!("{distribution}/{size}  {}", controls_legend())
}

#[cfg(test)]
mod tests {
    use super::{render_race, status_line, RaceView, TerminalPresenter};
    use crate::playback::{PlaybackObserver, StreamReport};
    use crate::race::RunState;
    use crate::runtime::FakeTerminal;
    use crate::snapshot::Snapshot;
    use crate::sort::Algorithm;
    use std::sync::{Arc, Mutex};

    #[test]
    fn frame_has_both_lanes_and_status() {
        let mut view = RaceView::new(&[3, 1, 2]);
        view.state = RunState {
            busy: false,
            quicksort_elapsed_ms: 12,
            mergesort_elapsed_ms: 0,
        };
        let frame = render_race(&view, 80, 20).expect("render");

        assert!(frame.contains("Quick Sort"));
        assert!(frame.contains("Merge Sort"));
        assert!(frame.contains("Quick Sort time: 12 ms"));
        assert!(!frame.contains("Merge Sort time"));
    }

    #[test]
    fn timers_are_hidden_while_busy() {
        let state = RunState {
            busy: true,
            quicksort_elapsed_ms: 5,
            mergesort_elapsed_ms: 9,
        };
        assert_eq!(status_line(&state), "Sorting...");
        assert_eq!(status_line(&RunState::default()), "Ready");
    }

    #[test]
    fn render_survives_tiny_areas_and_negative_values() {
        let view = RaceView::new(&[-4, 0, 7]);
        let frame = render_race(&view, 10, 8).expect("render");
        assert_eq!(frame.lines().count(), 8);
    }

    #[test]
    fn non_tty_presenter_writes_one_line_per_event() {
        let terminal = FakeTerminal::new(false);
        let presenter = TerminalPresenter::new(
            Arc::new(terminal.clone()),
            &[2, 1],
            Arc::new(Mutex::new(RunState::default())),
        );

        presenter.on_snapshot(Algorithm::Mergesort, 0, &Snapshot::from(vec![1, 2]));
        presenter.on_stream_finished(&StreamReport {
            algorithm: Algorithm::Mergesort,
            emitted: 1,
            skipped: 0,
            elapsed_ms: 20,
        });

        assert_eq!(
            terminal.written_lines(),
            vec![
                "stream=mergesort state=step message=0 [1, 2] ".to_string(),
                "stream=mergesort state=finished message=elapsed_ms=20 steps=1 ".to_string(),
            ]
        );
        assert_eq!(presenter.view().mergesort, vec![1, 2]);
        assert_eq!(presenter.view().quicksort, vec![2, 1]);
        assert!(terminal.drawn_frames().is_empty());
    }

    #[test]
    fn tty_presenter_redraws_frames() {
        let terminal = FakeTerminal::new(true);
        let presenter = TerminalPresenter::new(
            Arc::new(terminal.clone()),
            &[2, 1],
            Arc::new(Mutex::new(RunState::default())),
        )
        .with_controls("Keys: q quit".to_string());

        presenter.on_snapshot(Algorithm::Quicksort, 0, &Snapshot::from(vec![1, 2]));

        let frames = terminal.drawn_frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("Keys: q quit"));
        assert!(terminal.written_lines().is_empty());
    }
}
