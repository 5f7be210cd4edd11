//! `doorstep suggest` - list ranked geocoder candidates.

use anyhow::Result;
use colored::Colorize;

use super::build_resolver;

pub async fn execute(query: String, json: bool) -> Result<()> {
    let resolver = build_resolver()?;
    let candidates = resolver.suggest(&query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        println!("no candidates for \"{query}\"");
        return Ok(());
    }

    for (rank, candidate) in candidates.iter().enumerate() {
        println!(
            "{} {}  ({:.5}, {:.5})",
            format!("{}.", rank + 1).bold(),
            candidate.display_name,
            candidate.center.lat,
            candidate.center.lon
        );
    }
    Ok(())
}
