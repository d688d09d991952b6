//! `plantline doctor` — diagnose configuration and connectivity.

use plantline_agent::Session;
use plantline_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Plantline Doctor — Diagnostics");
    println!("==============================\n");

    let mut issues = 0;

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            Some(config)
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            issues += 1;
            None
        }
    };

    if let Some(config) = config {
        if config.has_api_key() {
            println!("  ✅ API key configured");
        } else {
            println!("  ⚠️  No API key — set PLANTLINE_API_KEY or OPENAI_API_KEY");
            issues += 1;
        }
        if config.relational.url.is_some() {
            println!("  ✅ Relational backend URL configured");
        } else {
            println!("  ⚠️  No relational backend URL — set DATABASE_URL");
            issues += 1;
        }
        if config.graph.url.is_some() {
            println!("  ✅ Graph backend URL configured");
        } else {
            println!("  ⚠️  No graph backend URL — set NEO4J_URI");
            issues += 1;
        }

        if issues == 0 {
            println!("\n  Connecting backends...");
            match Session::initialize(config).await {
                Ok(session) => {
                    println!("  ✅ Both backends reachable, schemas introspected");
                    match session.provider().health_check().await {
                        Ok(true) => println!("  ✅ Model service reachable"),
                        Ok(false) | Err(_) => {
                            println!("  ⚠️  Model service not reachable");
                            issues += 1;
                        }
                    }
                }
                Err(e) => {
                    println!("  ❌ Session initialization failed: {e}");
                    issues += 1;
                }
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
