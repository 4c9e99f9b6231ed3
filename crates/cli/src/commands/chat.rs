//! `fincrew chat`: Single-message or interactive chat with one agent.

use fincrew_agent::retrieval::DocumentRetriever;
use fincrew_agent::{
    FragmentStream, SingleAssistant, SingleAssistantRag, SingleAssistantShadow, rag_assistant, shadow_assistant,
    single_assistant,
};
use fincrew_core::error::Error;
use fincrew_core::retriever::Retriever;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub enum Mode {
    Single,
    Rag(PathBuf),
    Shadow,
}

enum ChatWorkflow {
    Single(SingleAssistant),
    Rag(SingleAssistantRag),
    Shadow(SingleAssistantShadow),
}

impl ChatWorkflow {
    fn label(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::Rag(_) => "rag",
            Self::Shadow(_) => "shadow",
        }
    }

    /// Run one message, printing the reply.
    async fn respond(&mut self, message: &str, stream: bool) -> Result<(), Error> {
        if !stream {
            let text = match self {
                Self::Single(w) => w.chat(message).await?,
                Self::Rag(w) => w.chat(message).await?,
                Self::Shadow(w) => w.chat(message).await?,
            };
            println!("{text}");
            return Ok(());
        }

        match self {
            Self::Single(w) => print_stream(w.chat_stream(message).await?).await,
            Self::Rag(w) => print_stream(w.chat_stream(message).await?).await,
            Self::Shadow(w) => print_stream(w.chat_stream(message).await?).await,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Single(w) => w.reset(),
            Self::Rag(w) => w.reset(),
            Self::Shadow(w) => w.reset(),
        }
    }
}

async fn print_stream(mut stream: FragmentStream<'_>) -> Result<(), Error> {
    let mut stdout = std::io::stdout();
    while let Some(fragment) = stream.next().await {
        print!("{}", fragment?);
        let _ = stdout.flush();
    }
    println!();
    Ok(())
}

pub async fn run(agent: String, message: Option<String>, mode: Mode, stream: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = super::runtime()?;
    let factory = &runtime.factory;
    let settings = &runtime.settings;

    let mut workflow = match mode {
        Mode::Single => ChatWorkflow::Single(single_assistant(factory, &agent, settings)?),
        Mode::Shadow => ChatWorkflow::Shadow(shadow_assistant(factory, &agent, settings)?),
        Mode::Rag(docs) => {
            let retriever = DocumentRetriever::open(&docs, settings.rag_chunk_size)
                .map(|r| Arc::new(r) as Arc<dyn Retriever>);
            ChatWorkflow::Rag(rag_assistant(factory, &agent, retriever, settings)?)
        }
    };

    if let Some(msg) = message {
        workflow.respond(&msg, stream).await?;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  fincrew chat — Interactive Mode");
    println!();
    println!("  Provider:  {}", runtime.config.active_provider);
    println!("  Model:     {}", runtime.config.resolve_model());
    println!("  Agent:     {agent}");
    println!("  Workflow:  {}", workflow.label());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type '/reset' to start over, 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                workflow.reset();
                println!("  (conversation cleared)\n");
                continue;
            }
            _ => {}
        }

        println!();
        if let Err(e) = workflow.respond(line, stream).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
