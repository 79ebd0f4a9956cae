//! Commands received from a client and the responses sent back.

/// Keyword that ends a session, compared ASCII-case-insensitively.
pub const EXIT_KEYWORD: &str = "bye";

/// Line terminator emitted on every response line.
pub const CRLF: &str = "\r\n";

/// A decoded command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// The exit keyword in any letter casing.
    Exit,
    /// Anything else, kept verbatim.
    Text(String),
}

impl Command {
    /// Classify a decoded line.
    pub fn parse(line: String) -> Self {
        if line.is_empty() {
            Command::Empty
        } else if line.eq_ignore_ascii_case(EXIT_KEYWORD) {
            Command::Exit
        } else {
            Command::Text(line)
        }
    }
}

/// Text to send back, plus whether the connection closes once it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub close: bool,
}

impl Response {
    /// A response that keeps the connection open.
    pub fn line(text: impl AsRef<str>) -> Self {
        Self {
            text: format!("{}{CRLF}", text.as_ref()),
            close: false,
        }
    }

    /// The two-line greeting sent once per connection.
    pub fn greeting(host: &str, now: &str) -> Self {
        Self {
            text: format!("Welcome. {host} Connected!{CRLF}Current Time is {now}{CRLF}"),
            close: false,
        }
    }

    /// Reply to a blank line.
    pub fn prompt() -> Self {
        Self::line("Please enter a command.")
    }

    /// Reply to the exit keyword. The connection closes after it is flushed.
    pub fn farewell() -> Self {
        Self {
            close: true,
            ..Self::line("Have a good day!")
        }
    }

    /// Reply quoting the received text verbatim.
    pub fn echo(text: &str) -> Self {
        Self::line(format!("You entered '{text}'."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(Command::parse(String::new()), Command::Empty);
    }

    #[test]
    fn test_parse_exit_any_case() {
        for word in ["bye", "Bye", "BYE", "byE", "bYe"] {
            assert_eq!(Command::parse(word.to_string()), Command::Exit, "{word}");
        }
    }

    #[test]
    fn test_parse_text_is_verbatim() {
        assert_eq!(
            Command::parse("bye now".to_string()),
            Command::Text("bye now".to_string())
        );
        assert_eq!(
            Command::parse(" bye".to_string()),
            Command::Text(" bye".to_string())
        );
        assert_eq!(
            Command::parse("hello".to_string()),
            Command::Text("hello".to_string())
        );
    }

    #[test]
    fn test_response_templates() {
        assert_eq!(Response::echo("hello").text, "You entered 'hello'.\r\n");
        assert!(!Response::echo("hello").close);

        assert_eq!(Response::prompt().text, "Please enter a command.\r\n");
        assert!(!Response::prompt().close);

        let bye = Response::farewell();
        assert_eq!(bye.text, "Have a good day!\r\n");
        assert!(bye.close);
    }

    #[test]
    fn test_greeting_has_two_lines() {
        let greeting = Response::greeting("box", "Mon Oct 19 10:00:00 2026");
        let lines: Vec<&str> = greeting.text.split_terminator(CRLF).collect();
        assert_eq!(
            lines,
            vec!["Welcome. box Connected!", "Current Time is Mon Oct 19 10:00:00 2026"]
        );
        assert!(!greeting.close);
    }
}
