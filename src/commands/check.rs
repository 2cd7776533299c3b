//! Check command implementation.
//!
//! Validates the configuration and lists every target that would be polled.

use herakles_traffic_agent::config::{Config, Credentials, InterfaceFilter};

/// Validates configuration and prints the resulting targets.
pub fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 Herakles Traffic Agent - Configuration Check");
    println!("===============================================");

    println!("\n⚙️  Agent settings:");
    println!("   API base: {}", config.api_base);
    println!(
        "   Poll interval: {}s, metadata interval: {}s",
        config.agent.poll_interval_seconds, config.agent.metadata_interval_seconds
    );
    println!(
        "   Startup settle window: {}s ({}-{}ms between launches)",
        config.agent.startup_settle_seconds,
        config.agent.startup_min_interval_ms,
        config.agent.startup_max_interval_ms
    );
    println!(
        "   Shutdown timeout: {}s",
        config.agent.shutdown_timeout_seconds
    );

    println!("\n📡 Targets ({}):", config.targets.len());
    if config.targets.is_empty() {
        println!("   ⚠️  No valid targets configured");
    }

    for target in &config.targets {
        println!("   ├─ {}", target.id());
        println!("   │  ├─ Hostname: {}", target.display_hostname());

        let version = match &target.connection.credentials {
            Credentials::V2c { .. } => "v2c".to_string(),
            Credentials::V3(v3) => format!("v3 ({:?}, user {})", v3.security, v3.username),
        };
        println!("   │  ├─ SNMP: {}", version);
        println!("   │  ├─ Counters: {}", target.counters.join(", "));

        let filter = match &target.interface_filter {
            InterfaceFilter::All => "all interfaces".to_string(),
            InterfaceFilter::Include(re) => format!("include /{}/", re.as_str()),
            InterfaceFilter::Exclude(re) => format!("exclude /{}/", re.as_str()),
        };
        println!(
            "   │  ├─ Interfaces: {}{}",
            filter,
            if target.skip_down_interfaces {
                ", skipping down interfaces"
            } else {
                ""
            }
        );

        if target.graph_defs.is_empty() {
            println!("   │  └─ Custom counters: none");
        } else {
            println!("   │  └─ Custom counter graphs:");
            for graph in &target.graph_defs {
                println!(
                    "   │     ├─ {} ({}, {} metrics)",
                    graph.display_name,
                    graph.name,
                    graph.metrics.len()
                );
            }
        }
    }

    println!("\n📋 Summary:");
    println!("   ✅ Configuration is valid");
    Ok(())
}
