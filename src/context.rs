/// Process-wide shell state, threaded by reference through the REPL.
pub struct ShellContext {
    /// The main loop keeps iterating while this is set; cleared by the
    /// `exit` builtin and by fatal loop errors.
    pub running: bool,
    /// Number of background children not yet reaped.
    pub jobs: usize,
    /// Status the shell process exits with.
    pub exit_code: i32,
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellContext {
    pub fn new() -> Self {
        ShellContext {
            running: true,
            jobs: 0,
            exit_code: 0,
        }
    }
}
