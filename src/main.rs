mod builtins;
mod context;
mod editor;
mod executor;
mod history;
mod parser;
mod prompt;

use std::io::{self, Write};
use std::sync::atomic::Ordering;

use context::ShellContext;
use editor::ReadOutcome;
use parser::ParseError;

fn main() {
    // While a foreground child runs the terminal is in cooked mode and SIGINT
    // reaches the shell too; print the newline the interrupted line is owed.
    // While the editor holds raw mode, Ctrl-C arrives as a key event instead
    // and the handler must stay quiet.
    ctrlc::set_handler(|| {
        if !editor::EDITOR_ACTIVE.load(Ordering::Relaxed) {
            println!();
            let _ = io::stdout().flush();
        }
    })
    .expect("Failed to set Ctrl-C handler");

    let mut ctx = ShellContext::new();
    let mut editor = editor::LineEditor::new();

    while ctx.running {
        reap_background(&mut ctx);
        if !ctx.running {
            break;
        }

        let prompt = match prompt::render() {
            Ok(p) => p,
            Err(_) => {
                eprintln!("[!] Failed to generate prompt");
                ctx.exit_code = 1;
                break;
            }
        };

        let line = match editor.read_line(&prompt) {
            Ok(ReadOutcome::Line(line)) => line,
            Ok(ReadOutcome::Empty) | Ok(ReadOutcome::Interrupted) => continue,
            Ok(ReadOutcome::Eof) => break,
            Err(e) => {
                eprintln!("[!] Failed to process input: {e}");
                ctx.exit_code = 1;
                break;
            }
        };

        let pipeline = match parser::parse(&line) {
            Ok(pipeline) => pipeline,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                println!("[!] Error: {e}");
                continue;
            }
        };

        match executor::execute(&pipeline, &mut ctx) {
            Ok(outcome) => {
                if let Some(pid) = outcome.bg_pid {
                    ctx.jobs += 1;
                    println!("[{pid}] job started - total jobs: {}", ctx.jobs);
                }
            }
            Err(e) => println!("[!] Error: {e}"),
        }
    }

    std::process::exit(ctx.exit_code);
}

/// Poll once for a finished background child so the prompt is never delayed.
///
/// An unrecoverable `waitpid` failure breaks the main loop with a nonzero
/// exit code.
fn reap_background(ctx: &mut ShellContext) {
    if ctx.jobs == 0 {
        return;
    }

    let mut status: libc::c_int = 0;
    let pid = loop {
        let rc = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if rc >= 0 {
            break rc;
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        eprintln!("[!] waitpid() failed: {err}");
        ctx.exit_code = 1;
        ctx.running = false;
        return;
    };

    if pid > 0 {
        ctx.jobs -= 1;
        println!("[{pid}] job finished - total jobs: {}", ctx.jobs);
    }
}
