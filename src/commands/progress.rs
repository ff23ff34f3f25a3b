// ABOUTME: Human-readable lines for swap and deploy progress events.
// ABOUTME: Text output uses these lines; JSON mode serializes the events instead.

use slotswap::deploy::{DrainOutcome, SwapEvent};
use slotswap::orchestrator::DeployEvent;

pub fn describe_deploy(event: &DeployEvent) -> String {
    match event {
        DeployEvent::Built { artifact } => format!("Built {}", artifact.display()),
        DeployEvent::Connected { server } => format!("Connected to {}", server),
        DeployEvent::Synced { server, slot } => format!("Synced artifact to {} ({})", server, slot),
        DeployEvent::Swap(event) => describe_swap(event),
    }
}

pub fn describe_swap(event: &SwapEvent) -> String {
    match event {
        SwapEvent::Locked { active, target } => {
            format!("Active slot is {}, deploying to {}", active, target)
        }
        SwapEvent::Started { unit } => format!("Started {}", unit),
        SwapEvent::Healthy { unit, port } => format!("{} is answering on port {}", unit, port),
        SwapEvent::RolledBack { unit } => format!("Stopped unhealthy {}", unit),
        SwapEvent::TrafficSplit { pinned } => {
            format!("New sessions go to the new slot; pinned sessions stay on {}", pinned)
        }
        SwapEvent::Drained { drain } => match drain {
            DrainOutcome::Drained => "All pinned sessions left".to_string(),
            DrainOutcome::Forced => "Drain stopped by operator".to_string(),
            DrainOutcome::TimedOut {
                remaining: Some(count),
            } => format!("Drain deadline reached with {} pinned session(s)", count),
            DrainOutcome::TimedOut { remaining: None } => "Drain deadline reached".to_string(),
        },
        SwapEvent::CutOver { port } => format!("All traffic now goes to port {}", port),
        SwapEvent::Committed { active } => format!("{} is now the active slot", active),
    }
}
