//! `fincrew lead`: Leader with single-hop delegation.

use fincrew_agent::leader_workflow;

pub async fn run(leader: String, team: Vec<String>, message: String) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = super::runtime()?;
    let mut workflow = leader_workflow(&runtime.factory, &leader, &team, &runtime.settings)?;

    let outcome = workflow.chat_detailed(&message).await?;
    if let Some(member) = &outcome.delegated_to {
        eprintln!("  [{leader} delegated to {member}]");
    }
    println!("{}", outcome.text);
    Ok(())
}
