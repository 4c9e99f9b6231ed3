//! `fincrew group`: Round-bounded group chat.

use fincrew_agent::{format_multi_agent_response, multi_assistant};

pub async fn run(agents: Vec<String>, max_rounds: Option<u32>, message: String) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = super::runtime()?;
    let settings = match max_rounds {
        Some(rounds) => runtime.settings.clone().with_max_rounds(rounds),
        None => runtime.settings.clone(),
    };

    let mut group = multi_assistant(&runtime.factory, &agents, &settings)?;
    let result = group.chat_session(&message).await?;

    eprintln!("  [{} rounds, stopped: {}]", result.rounds, result.stop_reason);
    println!("{}", format_multi_agent_response(result.events));
    Ok(())
}
