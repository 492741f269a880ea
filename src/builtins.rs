use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;

use thiserror::Error;

use crate::context::ShellContext;
use crate::parser::Command;

/// The list of all builtin command names.
const BUILTINS: &[&str] = &["cd", "exec", "set", "get", "exit", "help"];

const HELP_MSG: &str = "minnow shell
Shell commands below are defined internally:

 - cd <directory> : Change the current working directory
    (if directory is omitted, user's home directory is chosen)
 - exec [cmd] : Replace shell with the given command
 - set [var] [value] : Set environment variable
 - get [var] : Get environment variable
 - exit <status> : Exit from shell
    (if status is omitted, 0 is used)
 - help : Show this text";

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("Too many arguments")]
    TooManyArgs,
    #[error("Not enough arguments")]
    NotEnoughArgs,
    #[error("Numeric argument required")]
    NumericArgRequired,
    #[error("Path length exceeds max limit")]
    PathTooLong,
    #[error("Failed to determine home directory")]
    NoHome,
    #[error("{0}")]
    Sys(#[from] io::Error),
}

/// Returns true if the command name is a shell builtin.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Run a builtin in-process. Builtins never fork and never honor the
/// background flag or redirections; a failed builtin leaves the shell
/// state untouched.
pub fn run(cmd: &Command, ctx: &mut ShellContext) -> Result<(), BuiltinError> {
    let args = &cmd.argv[1..];
    match cmd.argv[0].as_str() {
        "cd" => builtin_cd(args),
        "exec" => builtin_exec(args),
        "set" => builtin_set(args),
        "get" => builtin_get(args),
        "exit" => builtin_exit(args, ctx),
        "help" => builtin_help(args),
        // `run` is only called for names in BUILTINS.
        other => unreachable!("not a builtin: {other}"),
    }
}

fn builtin_cd(args: &[String]) -> Result<(), BuiltinError> {
    if args.len() > 1 {
        return Err(BuiltinError::TooManyArgs);
    }

    let target = match args.first() {
        None => {
            let home = std::env::var("HOME").map_err(|_| BuiltinError::NoHome)?;
            home.into()
        }
        Some(dir) if dir.starts_with('/') => Path::new(dir).to_path_buf(),
        Some(dir) => {
            let cwd = std::env::current_dir().map_err(BuiltinError::Sys)?;
            // + 2 for the joining slash and the terminator the OS appends.
            if cwd.as_os_str().len() + dir.len() + 2 > libc::PATH_MAX as usize {
                return Err(BuiltinError::PathTooLong);
            }
            cwd.join(dir)
        }
    };

    std::env::set_current_dir(&target).map_err(BuiltinError::Sys)
}

fn builtin_exec(args: &[String]) -> Result<(), BuiltinError> {
    if args.is_empty() {
        return Err(BuiltinError::NotEnoughArgs);
    }

    // Replaces the shell's process image; only returns on failure.
    let err = std::process::Command::new(&args[0]).args(&args[1..]).exec();
    Err(BuiltinError::Sys(err))
}

fn builtin_set(args: &[String]) -> Result<(), BuiltinError> {
    match args.len() {
        0 | 1 => Err(BuiltinError::NotEnoughArgs),
        2 => {
            // SAFETY: env vars are only mutated on the main thread; the ctrlc
            // handler thread never reads or writes the environment.
            unsafe { std::env::set_var(&args[0], &args[1]) };
            Ok(())
        }
        _ => Err(BuiltinError::TooManyArgs),
    }
}

fn builtin_get(args: &[String]) -> Result<(), BuiltinError> {
    match args.len() {
        0 => Err(BuiltinError::NotEnoughArgs),
        1 => {
            // An unset variable prints nothing and is not an error.
            if let Some(val) = std::env::var_os(&args[0]) {
                println!("{}", val.to_string_lossy());
            }
            Ok(())
        }
        _ => Err(BuiltinError::TooManyArgs),
    }
}

fn builtin_exit(args: &[String], ctx: &mut ShellContext) -> Result<(), BuiltinError> {
    if args.len() > 1 {
        return Err(BuiltinError::TooManyArgs);
    }

    let code = match args.first() {
        None => 0,
        Some(arg) => arg
            .parse::<i32>()
            .map_err(|_| BuiltinError::NumericArgRequired)?,
    };

    ctx.exit_code = code;
    ctx.running = false;
    Ok(())
}

fn builtin_help(args: &[String]) -> Result<(), BuiltinError> {
    if !args.is_empty() {
        return Err(BuiltinError::TooManyArgs);
    }
    println!("{HELP_MSG}");
    Ok(())
}

// ── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(argv: &[&str]) -> Command {
        Command {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            input_file: None,
            output_file: None,
            in_bg: false,
        }
    }

    #[test]
    fn builtin_names_are_recognized() {
        for name in ["cd", "exec", "set", "get", "exit", "help"] {
            assert!(is_builtin(name), "{name} should be a builtin");
        }
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("echo"));
    }

    #[test]
    fn exit_sets_context_and_stops_the_loop() {
        let mut ctx = ShellContext::new();
        run(&cmd(&["exit", "3"]), &mut ctx).unwrap();
        assert!(!ctx.running);
        assert_eq!(ctx.exit_code, 3);
    }

    #[test]
    fn exit_without_argument_uses_zero() {
        let mut ctx = ShellContext::new();
        ctx.exit_code = 7; // stale value from an earlier failure
        run(&cmd(&["exit"]), &mut ctx).unwrap();
        assert!(!ctx.running);
        assert_eq!(ctx.exit_code, 0);
    }

    #[test]
    fn exit_rejects_non_numeric_argument() {
        let mut ctx = ShellContext::new();
        let err = run(&cmd(&["exit", "soon"]), &mut ctx).unwrap_err();
        assert!(matches!(err, BuiltinError::NumericArgRequired));
        // A failed builtin leaves the shell state untouched.
        assert!(ctx.running);
        assert_eq!(ctx.exit_code, 0);
    }

    #[test]
    fn argument_count_violations_are_reported() {
        let mut ctx = ShellContext::new();
        assert!(matches!(
            run(&cmd(&["cd", "a", "b"]), &mut ctx),
            Err(BuiltinError::TooManyArgs)
        ));
        assert!(matches!(
            run(&cmd(&["exec"]), &mut ctx),
            Err(BuiltinError::NotEnoughArgs)
        ));
        assert!(matches!(
            run(&cmd(&["set", "VAR"]), &mut ctx),
            Err(BuiltinError::NotEnoughArgs)
        ));
        assert!(matches!(
            run(&cmd(&["set", "VAR", "x", "y"]), &mut ctx),
            Err(BuiltinError::TooManyArgs)
        ));
        assert!(matches!(
            run(&cmd(&["get"]), &mut ctx),
            Err(BuiltinError::NotEnoughArgs)
        ));
        assert!(matches!(
            run(&cmd(&["get", "A", "B"]), &mut ctx),
            Err(BuiltinError::TooManyArgs)
        ));
        assert!(matches!(
            run(&cmd(&["exit", "1", "2"]), &mut ctx),
            Err(BuiltinError::TooManyArgs)
        ));
        assert!(matches!(
            run(&cmd(&["help", "me"]), &mut ctx),
            Err(BuiltinError::TooManyArgs)
        ));
    }

    #[test]
    fn error_strings_match_the_user_vocabulary() {
        assert_eq!(BuiltinError::TooManyArgs.to_string(), "Too many arguments");
        assert_eq!(
            BuiltinError::NotEnoughArgs.to_string(),
            "Not enough arguments"
        );
        assert_eq!(
            BuiltinError::NumericArgRequired.to_string(),
            "Numeric argument required"
        );
        assert_eq!(
            BuiltinError::PathTooLong.to_string(),
            "Path length exceeds max limit"
        );
        assert_eq!(
            BuiltinError::NoHome.to_string(),
            "Failed to determine home directory"
        );
    }
}
