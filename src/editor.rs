use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    queue,
    terminal::{self, ClearType},
    tty::IsTty,
};

use crate::history::History;

// ── Raw-mode sentinel ─────────────────────────────────────────────────────────

/// `true` while the line editor holds the terminal in raw mode.
///
/// The `ctrlc` handler in `main.rs` reads this flag: while raw mode is active,
/// Ctrl-C arrives as a key event and the handler must stay quiet; outside raw
/// mode (a foreground child is running) it prints the newline the terminal
/// would otherwise swallow.
pub static EDITOR_ACTIVE: AtomicBool = AtomicBool::new(false);

// ── Raw-mode guard ────────────────────────────────────────────────────────────

/// RAII guard: enables terminal raw mode on construction and restores it on
/// drop — even on panic — so the terminal is never left in a broken state.
/// Children spawned after `read_line` returns therefore inherit cooked mode.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        EDITOR_ACTIVE.store(true, Ordering::Relaxed);
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        EDITOR_ACTIVE.store(false, Ordering::Relaxed);
    }
}

// ── Line editor ───────────────────────────────────────────────────────────────

/// How one `read_line` call ended.
#[derive(Debug, PartialEq)]
pub enum ReadOutcome {
    /// The user submitted a non-empty line.
    Line(String),
    /// Enter on an empty buffer, or `!!` with no history to recall.
    Empty,
    /// Ctrl-C: the line in progress is discarded.
    Interrupted,
    /// Ctrl-D on an empty buffer, or stdin was closed.
    Eof,
}

/// What `handle_key` tells the read loop to do next.
enum KeyAction {
    Continue,
    Done(ReadOutcome),
}

/// A line editor with cursor movement and in-memory history recall.
pub struct LineEditor {
    /// Current line content, stored as `char`s for Unicode-safe cursor indexing.
    buffer: Vec<char>,
    /// Cursor position within `buffer` (0 = before the first char).
    cursor: usize,
    /// Recall ring; owned by the editor for the life of the shell.
    history: History,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    pub fn new() -> Self {
        LineEditor {
            buffer: Vec::new(),
            cursor: 0,
            history: History::new(),
        }
    }

    /// Read one edited line, displaying `prompt` to the left.
    ///
    /// Raw mode is held for the duration of the call and restored on every
    /// exit path. When stdin is not a TTY (input piped in, as in the
    /// integration tests) the method falls back to a plain `read_line()`.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
        // Gate on stdin: interactive editing requires a keyboard on the
        // *input* side. `printf 'cmd\n' | minnow` may have stdout on a
        // terminal but stdin on a pipe — entering raw mode there would hand
        // event::read() a non-keyboard stream.
        if !io::stdin().is_tty() {
            return self.read_line_fallback(prompt);
        }

        self.buffer.clear();
        self.cursor = 0;
        let _guard = RawModeGuard::enter()?;

        loop {
            self.redraw(prompt)?;

            let ev = match event::read() {
                Ok(ev) => ev,
                // crossterm handles EINTR internally, but be defensive.
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            let Event::Key(key) = ev else {
                continue; // ignore mouse, resize, paste, etc.
            };

            if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
                continue;
            }

            match self.handle_key(key)? {
                KeyAction::Done(outcome) => return Ok(outcome),
                KeyAction::Continue => {}
            }
        }
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Non-TTY path: print the prompt and delegate to `BufRead::read_line`.
    fn read_line_fallback(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line)? {
            0 => Ok(ReadOutcome::Eof),
            _ => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(self.resolve_line(line))
            }
        }
    }

    fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> io::Result<KeyAction> {
        use KeyCode::*;
        use KeyModifiers as Mod;

        match (key.code, key.modifiers) {
            // ── Commit ────────────────────────────────────────────────────────
            (Enter, _) => {
                // Raw mode suppresses the terminal's automatic newline.
                print!("\r\n");
                io::stdout().flush()?;
                let line: String = self.buffer.iter().collect();
                return Ok(KeyAction::Done(self.resolve_line(line)));
            }

            // ── Ctrl-C: discard the line in progress ──────────────────────────
            // ISIG is off in raw mode, so Ctrl-C arrives here as a key event
            // rather than SIGINT.
            (Char('c'), Mod::CONTROL) => {
                print!("\r\n");
                io::stdout().flush()?;
                return Ok(KeyAction::Done(ReadOutcome::Interrupted));
            }

            // ── Ctrl-D: EOF only on an empty buffer ───────────────────────────
            (Char('d'), Mod::CONTROL) => {
                if self.buffer.is_empty() {
                    print!("\r\n");
                    io::stdout().flush()?;
                    return Ok(KeyAction::Done(ReadOutcome::Eof));
                }
            }

            // ── Deletion ──────────────────────────────────────────────────────
            (Backspace, _) => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.buffer.remove(self.cursor);
                }
            }
            (Delete, _) => {
                if self.cursor < self.buffer.len() {
                    self.buffer.remove(self.cursor);
                }
            }

            // ── Cursor motion ─────────────────────────────────────────────────
            (Left, _) => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                }
            }
            (Right, _) => {
                if self.cursor < self.buffer.len() {
                    self.cursor += 1;
                }
            }

            // ── History recall ────────────────────────────────────────────────
            (Up, _) => self.recall_prev(),
            (Down, _) => self.recall_next(),

            // Insert-toggle is recognized and deliberately ignored.
            (Insert, _) => {}

            // ── Printable characters ──────────────────────────────────────────
            (Char(c), Mod::NONE) | (Char(c), Mod::SHIFT) => {
                self.buffer.insert(self.cursor, c);
                self.cursor += 1;
            }

            // ── Everything else: ignore ───────────────────────────────────────
            _ => {}
        }

        Ok(KeyAction::Continue)
    }

    /// Finish a committed line: expand `!!`, record it, classify the outcome.
    fn resolve_line(&mut self, line: String) -> ReadOutcome {
        if line == "!!" {
            let Some(entry) = self.history.peek_last() else {
                eprint!("[!] No entries in history\r\n");
                return ReadOutcome::Empty;
            };
            let entry = entry.to_string();
            // Echo the substituted command so the user sees what will run.
            print!("{entry}\r\n");
            let _ = io::stdout().flush();
            self.history.add(&entry);
            return ReadOutcome::Line(entry);
        }

        self.history.add(&line);
        if line.is_empty() {
            ReadOutcome::Empty
        } else {
            ReadOutcome::Line(line)
        }
    }

    fn recall_prev(&mut self) {
        if let Some(entry) = self.history.prev() {
            self.buffer = entry.chars().collect();
            self.cursor = self.buffer.len();
        }
    }

    fn recall_next(&mut self) {
        match self.history.next() {
            Some(entry) => {
                self.buffer = entry.chars().collect();
                self.cursor = self.buffer.len();
            }
            // Walked past the newest entry: clear the line.
            None => {
                self.buffer.clear();
                self.cursor = 0;
            }
        }
    }

    /// Erase the current line, redraw prompt + buffer, reposition the cursor.
    ///
    /// Cursor placement is relative — all the way left past the buffer, then
    /// right by the cursor position — so the prompt's width (including its
    /// SGR color sequences) never enters the math.
    fn redraw(&self, prompt: &str) -> io::Result<()> {
        let mut out = io::stdout();
        queue!(
            out,
            terminal::Clear(ClearType::CurrentLine),
            cursor::MoveToColumn(0),
        )?;
        let line: String = self.buffer.iter().collect();
        write!(out, "{prompt}{line}")?;
        if !self.buffer.is_empty() {
            queue!(out, cursor::MoveLeft(self.buffer.len() as u16))?;
        }
        if self.cursor > 0 {
            queue!(out, cursor::MoveRight(self.cursor as u16))?;
        }
        out.flush()
    }
}

// ── Unit tests ────────────────────────────────────────────────────────────────
