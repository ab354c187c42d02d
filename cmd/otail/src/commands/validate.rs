//! Validate command implementation.

use super::{build_sampler, load_policies};
use anyhow::Result;
use otail_policy::Policy;
use tracing::info;

/// Runs the validate command.
pub fn run(config_path: &str) -> Result<()> {
    info!("Validating config: {}", config_path);

    let policies = load_policies(config_path)?;
    if policies.is_empty() {
        anyhow::bail!("No policies found in {config_path}");
    }

    let sampler = build_sampler(&policies)?;

    for policy in &policies {
        print_policy(policy, 0);
    }

    info!("{} top-level policies are valid", sampler.len());
    Ok(())
}

fn print_policy(policy: &Policy, depth: usize) {
    println!("{:indent$}{} ({})", "", policy.name, policy.type_name(), indent = depth * 2);
    for sub_policy in policy.sub_policies() {
        print_policy(sub_policy, depth + 1);
    }
}
