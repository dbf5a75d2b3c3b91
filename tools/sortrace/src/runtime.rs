use crate::errors::SortraceError;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
    fn sleep_until(&self, deadline: SystemTime) -> Result<(), SortraceError>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, SortraceError>;
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), SortraceError>;
}

pub trait Terminal: Send + Sync {
    fn stdin_is_tty(&self) -> bool;
    fn write_line(&self, line: &str) -> Result<(), SortraceError>;
    fn draw(&self, frame: &str) -> Result<(), SortraceError>;
}

/// Keys typed at the interactive controls, already mapped to characters.
pub trait KeySource {
    /// Block until the next key. `None` means input is closed.
    fn next_key(&mut self) -> Result<Option<char>, SortraceError>;
    /// Take every key already queued without blocking.
    fn pending_keys(&mut self) -> Result<Vec<char>, SortraceError>;
}

pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), SortraceError> {
        let now = SystemTime::now();
        if let Ok(duration) = deadline.duration_since(now) {
            std::thread::sleep(duration);
        }
        Ok(())
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, SortraceError> {
        std::fs::read_to_string(path)
            .map_err(|e| SortraceError::Io(format!("{}: {e}", path.display())))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), SortraceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SortraceError::Io(e.to_string()))?;
        }
        std::fs::write(path, contents)
            .map_err(|e| SortraceError::Io(format!("{}: {e}", path.display())))
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn stdin_is_tty(&self) -> bool {
        std::io::IsTerminal::is_terminal(&std::io::stdin())
    }

    fn write_line(&self, line: &str) -> Result<(), SortraceError> {
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| SortraceError::Io(e.to_string()))
    }

    fn draw(&self, frame: &str) -> Result<(), SortraceError> {
        use crossterm::cursor::MoveTo;
        use crossterm::terminal::{Clear, ClearType};

        let mut out = std::io::stdout().lock();
        crossterm::queue!(out, Clear(ClearType::All), MoveTo(0, 0))
            .map_err(|e| SortraceError::Io(e.to_string()))?;
        // Raw mode does not translate `\n`, so rows are joined with an explicit carriage return.
        for line in frame.lines() {
            write!(out, "{line}\r\n").map_err(|e| SortraceError::Io(e.to_string()))?;
        }
        out.flush().map_err(|e| SortraceError::Io(e.to_string()))
    }
}

/// Reads keys from the terminal through crossterm; expects raw mode.
pub struct CrosstermKeys;

impl CrosstermKeys {
    fn key_char(event: crossterm::event::Event) -> Option<char> {
        use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};

        let Event::Key(key) = event else {
            return None;
        };
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some('q'),
            KeyCode::Char(ch) => Some(ch),
            KeyCode::Esc => Some('q'),
            _ => None,
        }
    }
}

impl KeySource for CrosstermKeys {
    fn next_key(&mut self) -> Result<Option<char>, SortraceError> {
        loop {
            let event = crossterm::event::read().map_err(|e| SortraceError::Io(e.to_string()))?;
            if let Some(ch) = Self::key_char(event) {
                return Ok(Some(ch));
            }
        }
    }

    fn pending_keys(&mut self) -> Result<Vec<char>, SortraceError> {
        let mut keys = Vec::new();
        while crossterm::event::poll(Duration::ZERO).map_err(|e| SortraceError::Io(e.to_string()))? {
            let event = crossterm::event::read().map_err(|e| SortraceError::Io(e.to_string()))?;
            keys.extend(Self::key_char(event));
        }
        Ok(keys)
    }
}

pub struct ProductionRuntime {
    pub clock: Arc<dyn Clock>,
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ProductionClock),
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Virtual clock shared by every playback stream.
///
/// `sleep_until` returns immediately and moves time forward to the deadline.
/// Time never moves backwards, so two streams sleeping concurrently both
/// observe a monotone `now`.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<SystemTime>>,
    sleeps: Arc<Mutex<Vec<SystemTime>>>,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sleeps(&self) -> Vec<SystemTime> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep_until(&self, deadline: SystemTime) -> Result<(), SortraceError> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(deadline);
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if deadline > *now {
            *now = deadline;
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), contents.into());
        fs
    }

    pub fn file(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, SortraceError> {
        self.file(path)
            .ok_or_else(|| SortraceError::Io(format!("missing file {}", path.display())))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), SortraceError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    pub is_tty: bool,
    writes: Arc<Mutex<Vec<String>>>,
    draws: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn new(is_tty: bool) -> Self {
        Self {
            is_tty,
            ..Self::default()
        }
    }

    pub fn written_lines(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn drawn_frames(&self) -> Vec<String> {
        self.draws
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Terminal for FakeTerminal {
    fn stdin_is_tty(&self) -> bool {
        self.is_tty
    }

    fn write_line(&self, line: &str) -> Result<(), SortraceError> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }

    fn draw(&self, frame: &str) -> Result<(), SortraceError> {
        self.draws
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.to_string());
        Ok(())
    }
}

/// Scripted keys grouped into bursts.
///
/// A burst is what is queued at the moment `next_key` is called: the first
/// key is returned, and the rest stays queued until read or taken by
/// `pending_keys`, as keys typed during a blocking race would be.
#[derive(Debug, Default, Clone)]
pub struct FakeKeys {
    bursts: VecDeque<VecDeque<char>>,
}

impl FakeKeys {
    pub fn new(bursts: Vec<Vec<char>>) -> Self {
        Self {
            bursts: bursts.into_iter().map(VecDeque::from).collect(),
        }
    }
}

impl KeySource for FakeKeys {
    fn next_key(&mut self) -> Result<Option<char>, SortraceError> {
        while let Some(burst) = self.bursts.front_mut() {
            if let Some(ch) = burst.pop_front() {
                return Ok(Some(ch));
            }
            self.bursts.pop_front();
        }
        Ok(None)
    }

    fn pending_keys(&mut self) -> Result<Vec<char>, SortraceError> {
        Ok(self
            .bursts
            .front_mut()
            .map(|burst| burst.drain(..).collect())
            .unwrap_or_default())
    }
}
