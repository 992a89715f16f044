//! Interactive chat REPL.

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use papergraph_query::{Answer, ChatTurn, QueryTranslator};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive chat loop until `exit` or end of input.
pub async fn run_chat(translator: &QueryTranslator, formatter: &Formatter) -> Result<()> {
    println!(
        "{}",
        formatter.info(
            "Papergraph chat - ask about the papers in the graph, 'help' for commands, 'exit' to quit"
        )
    );
    println!();

    let mut editor = DefaultEditor::new().map_err(|e| {
        CliError::Io(std::io::Error::other(format!(
            "Failed to initialize editor: {}",
            e
        )))
    })?;

    let history_path = AppConfig::history_path()?;
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = editor.load_history(&history_path);

    let mut session = ChatSession::default();

    loop {
        match editor.readline("❓ ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line).ok();

                match parse_line(line) {
                    ReplCommand::Exit => {
                        println!("{}", formatter.info("Bye!"));
                        break;
                    }
                    ReplCommand::Help => print_help(formatter),
                    ReplCommand::Reset => {
                        session.reset();
                        println!("{}", formatter.info("Conversation context cleared"));
                    }
                    ReplCommand::Rows => match session.last_answer() {
                        Some(Answer::Answered { rows, .. }) => println!("{}", formatter.rows(rows)),
                        _ => println!("{}", formatter.warning("No answered question yet")),
                    },
                    ReplCommand::Ask(question) => {
                        let answer = translator.ask(question, session.turns()).await;
                        match formatter.answer(&answer) {
                            Ok(text) => println!("{}\n", text),
                            Err(e) => eprintln!("{}", formatter.error(&e.to_string())),
                        }
                        session.record(question, answer);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", formatter.info("Use 'exit' to quit"));
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", formatter.error(&format!("Error: {}", err)));
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();
    Ok(())
}

/// REPL command type.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Exit,
    Help,
    Reset,
    Rows,
    Ask(&'a str),
}

fn parse_line(line: &str) -> ReplCommand<'_> {
    match line.to_lowercase().as_str() {
        "exit" | "quit" | "q" => ReplCommand::Exit,
        "help" | "?" => ReplCommand::Help,
        "reset" | "clear" => ReplCommand::Reset,
        "rows" => ReplCommand::Rows,
        _ => ReplCommand::Ask(line),
    }
}

fn print_help(formatter: &Formatter) {
    println!("{}", formatter.info("Type a question in plain language, for example:"));
    println!("  latest news");
    println!("  papers about GPT");
    println!("  how are knowledge graphs and RAG related");
    println!();
    println!("Commands:");
    println!("  rows           show the raw rows of the last answer");
    println!("  reset          forget earlier questions");
    println!("  help           show this help");
    println!("  exit           quit");
}

/// Question/query turns of the current conversation.
#[derive(Debug, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    last: Option<Answer>,
}

impl ChatSession {
    /// Turns so far, oldest first.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Remember an answer; only answered questions become context.
    pub fn record(&mut self, question: &str, answer: Answer) {
        if let Some(query) = answer.query() {
            self.turns.push(ChatTurn {
                question: question.to_string(),
                query: query.to_string(),
            });
            self.last = Some(answer);
        }
    }

    /// Last answered question.
    pub fn last_answer(&self) -> Option<&Answer> {
        self.last.as_ref()
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.last = None;
    }
}
