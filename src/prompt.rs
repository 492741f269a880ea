use std::io;

use crossterm::style::Stylize;

/// Compose the `user@host cwd` prompt, colored with SGR sequences.
///
/// Root gets the classic red `#`; everyone else a bold `%`.
pub fn render() -> io::Result<String> {
    let root = unsafe { libc::geteuid() } == 0;
    let user = if root {
        "root".to_string()
    } else {
        current_user()
    };
    let host = hostname()?;
    let cwd = std::env::current_dir()?;
    let sym = if root {
        "#".red().bold().to_string()
    } else {
        "%".bold().to_string()
    };

    Ok(format!(
        "{}@{} {}{} ",
        user.as_str().blue().bold(),
        host.as_str().yellow().bold(),
        cwd.display().to_string().green().bold(),
        sym,
    ))
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

fn hostname() -> io::Result<String> {
    // 256 comfortably exceeds HOST_NAME_MAX everywhere we run.
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}
