//! Terminal prompts
//!
//! Reading stdin blocks, so the async variants run on the blocking pool and
//! leave the runtime free to notice an interrupt meanwhile.

use std::io::{self, BufRead, Write};

/// Print `message` and read one trimmed line from stdin
pub fn prompt_line(message: &str) -> io::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.trim().to_string())
}

/// [`prompt_line`] off the async threads
pub async fn ask(message: &str) -> io::Result<String> {
    let message = message.to_string();
    tokio::task::spawn_blocking(move || prompt_line(&message))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

/// Read a password without echo, off the async threads
pub async fn ask_password(message: String) -> io::Result<String> {
    tokio::task::spawn_blocking(move || rpassword::prompt_password(message))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}
