//! Line-oriented assistant session on stdin.
//!
//! One `Assistant` serves the whole session, so cooldowns, the analysis
//! memo and the running conversation carry over between lines.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::diagram::DiagramOutcome;
use crate::assistant::Assistant;

const CLIENT: &str = "console";

const HELP: &str = "\
commands:
  ask <question>    question about the portfolio
  last              show the previous question and answer
  analyze           portfolio summary, risks and modernisation candidates
  diagram <id>      Mermaid diagram of an application's integrations
  describe <id>     short description of an application
  help
  quit";

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Ask(String),
    Last,
    Analyze,
    Diagram(i64),
    Describe(i64),
    Help,
    Quit,
    Empty,
    Invalid(String),
}

fn parse_line(input: &str) -> Line {
    let input = input.trim();
    let (word, rest) = input
        .split_once(char::is_whitespace)
        .map_or((input, ""), |(w, r)| (w, r.trim()));
    let id = |what: &str| match rest.parse::<i64>() {
        Ok(id) => Ok(id),
        Err(_) => Err(Line::Invalid(format!("{what} needs an application id"))),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Line::Empty,
        "ask" => Line::Ask(rest.to_string()),
        "last" => Line::Last,
        "analyze" | "analyse" => Line::Analyze,
        "diagram" => id("diagram").map_or_else(|e| e, Line::Diagram),
        "describe" => id("describe").map_or_else(|e| e, Line::Describe),
        "help" | "?" => Line::Help,
        "quit" | "exit" => Line::Quit,
        other => Line::Invalid(format!("unknown command {other:?}, try help")),
    }
}

pub async fn run(assistant: Assistant) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session: Option<String> = None;
    println!("{HELP}");

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Line::Empty => {}
            Line::Quit => break,
            Line::Help => println!("{HELP}"),
            Line::Invalid(message) => println!("{message}"),
            Line::Last => match session.as_deref().and_then(|id| assistant.conversations().last(id)) {
                Some(c) => println!("Q: {}\nA: {}", c.question, c.answer),
                None => println!("No question asked yet."),
            },
            Line::Ask(question) => {
                match assistant.ask_question(CLIENT, session.as_deref(), &question).await {
                    Ok(reply) => {
                        println!("{}", reply.conversation.answer);
                        for app in &reply.cited {
                            println!("  -> #{} {} ({})", app.id, app.name, app.domain);
                        }
                        session = Some(reply.conversation.session_id);
                    }
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            Line::Analyze => match assistant.analyze_portfolio(CLIENT).await {
                Ok(analysis) if analysis.cached => println!("(cached)\n{}", analysis.text),
                Ok(analysis) => println!("{}", analysis.text),
                Err(e) => println!("{}", e.user_message()),
            },
            Line::Diagram(id) => match assistant.generate_diagram(CLIENT, id).await {
                Ok(DiagramOutcome::Verified { code }) => println!("{code}"),
                Ok(DiagramOutcome::Unverified { code, message }) => println!("{code}\n{message}"),
                Err(e) => println!("{}", e.user_message()),
            },
            Line::Describe(id) => match assistant.describe_application(CLIENT, id).await {
                Ok(text) => println!("{text}"),
                Err(e) => println!("{}", e.user_message()),
            },
        }
    }
    tracing::debug!("Console session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse_line("ask  Which apps run on mainframes? "),
            Line::Ask("Which apps run on mainframes?".to_string())
        );
        assert_eq!(parse_line("Diagram 12"), Line::Diagram(12));
        assert_eq!(parse_line("describe 3"), Line::Describe(3));
        assert_eq!(parse_line("analyse"), Line::Analyze);
        assert_eq!(parse_line("   "), Line::Empty);
        assert_eq!(parse_line("exit"), Line::Quit);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(parse_line("diagram abc"), Line::Invalid(_)));
        assert!(matches!(parse_line("describe"), Line::Invalid(_)));
        assert!(matches!(parse_line("delete 4"), Line::Invalid(_)));
        // Blank questions are left to the assistant to reject.
        assert_eq!(parse_line("ask"), Line::Ask(String::new()));
    }
}
