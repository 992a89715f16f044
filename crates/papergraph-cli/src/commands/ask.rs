//! Ask and chat command implementations.

use crate::cli::{AskArgs, GraphArgs};
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::repl;
use papergraph_query::QueryTranslator;

/// Build a translator over the configured gateway and graph.
pub async fn build_translator(config: &AppConfig, args: &GraphArgs) -> Result<QueryTranslator> {
    let gateway = super::build_gateway(config)?;
    let graph = super::open_graph(config, args).await?;
    Ok(QueryTranslator::new(gateway, graph, config.chat.clone()))
}

/// Execute the ask command.
pub async fn execute_ask(args: AskArgs, config: &AppConfig, formatter: &Formatter) -> Result<()> {
    let question = args.question();
    if question.trim().is_empty() {
        return Err(CliError::InvalidInput("question must not be empty".to_string()));
    }

    let translator = build_translator(config, &args.graph).await?;
    let answer = translator.ask(&question, &[]).await;
    println!("{}", formatter.answer(&answer)?);
    Ok(())
}

/// Execute the chat command.
pub async fn execute_chat(
    args: GraphArgs,
    config: &AppConfig,
    formatter: &Formatter,
) -> Result<()> {
    let translator = build_translator(config, &args).await?;
    println!("{}", formatter.providers(&config.llm())?);
    repl::run_chat(&translator, formatter).await
}
