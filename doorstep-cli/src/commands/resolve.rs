//! `doorstep resolve` - run the full resolution pipeline for a query.

use anyhow::Result;
use colored::Colorize;

use doorstep_core::{Confidence, EntranceResponse};

use super::{build_resolver, parse_near};

pub async fn execute(query: String, near: Option<String>, json: bool) -> Result<()> {
    let near = near.as_deref().map(parse_near).transpose()?;
    let resolver = build_resolver()?;

    let response = resolver.resolve(&query, near).await?;
    tracing::debug!(place_id = %response.id, method = %response.method, "resolution complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_human(&response);
    Ok(())
}

fn print_human(response: &EntranceResponse) {
    println!("{}  {}", "place".bold(), response.name);
    println!(
        "{}  ({:.5}, {:.5})",
        "center".bold(),
        response.center.lat,
        response.center.lon
    );

    let confidence = match response.entrance.confidence {
        Confidence::High => "high".green(),
        Confidence::Medium => "medium".yellow(),
        Confidence::Low => "low".red(),
    };
    println!(
        "{}  ({:.5}, {:.5})  confidence {}  via {}",
        "entrance".bold(),
        response.entrance.lat,
        response.entrance.lon,
        confidence,
        response.method,
    );
    if response.entrance.accessible {
        println!("{}  step-free access confirmed", "access".bold());
    }

    match &response.dropoff {
        Some(dropoff) => println!(
            "{}  ({:.5}, {:.5})",
            "dropoff".bold(),
            dropoff.lat,
            dropoff.lon
        ),
        None => println!("{}  no drivable road nearby", "dropoff".bold()),
    }

    if response.verified_count > 0 {
        let when = response
            .last_verified_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{}  confirmed {} time(s), last {}",
            "verified".bold(),
            response.verified_count,
            when
        );
    }

    if !response.paths.is_empty() {
        println!(
            "{}  {} walkable path(s) nearby",
            "context".bold(),
            response.paths.len()
        );
    }
}
