// Terminal output for API responses

use colored::Colorize;
use serde_json::Value;

/// Shortens a UUID for tables: first 8 chars.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn status_label(status: &str) -> String {
    match status {
        "draft" => status.yellow().to_string(),
        "pending_approval" => status.cyan().to_string(),
        "approved" => status.green().bold().to_string(),
        "rejected" => status.red().bold().to_string(),
        other => other.to_string(),
    }
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or("-")
}

pub fn print_user(user: &Value) {
    println!("  Id:    {}", text(user, "id"));
    println!("  Email: {}", text(user, "email"));
    println!("  Name:  {}", text(user, "fullName"));
    println!("  Role:  {}", text(user, "role"));
}

pub fn print_asset_row(asset: &Value) {
    let method = asset["categorizationMethod"].as_str().unwrap_or("");
    println!(
        "  {}  {:<10} {:<6} {}",
        short_id(text(asset, "id")),
        text(asset, "category"),
        method,
        text(asset, "filename")
    );
}

pub fn print_asset(asset: &Value) {
    println!("  Id:       {}", text(asset, "id"));
    println!("  File:     {}", text(asset, "filename"));
    println!("  Type:     {}", text(asset, "fileType"));
    println!("  Size:     {} bytes", asset["sizeBytes"]);
    println!("  URL:      {}", text(asset, "storageUrl"));
    println!("  Category: {}", text(asset, "category"));
    if let Some(method) = asset["categorizationMethod"].as_str() {
        println!("  Method:   {}", method);
    }
}

pub fn print_campaign_row(campaign: &Value) {
    println!(
        "  {}  {:<28} {}",
        short_id(text(campaign, "id")),
        status_label(text(campaign, "status")),
        text(campaign, "name")
    );
}

pub fn print_campaign(campaign: &Value) {
    println!("  Id:       {}", text(campaign, "id"));
    println!("  Name:     {}", text(campaign, "name"));
    println!("  Status:   {}", status_label(text(campaign, "status")));
    if let Some(audience) = campaign["targetAudience"].as_str() {
        println!("  Audience: {}", audience);
    }
    if let Some(goal) = campaign["goal"].as_str() {
        println!("  Goal:     {}", goal);
    }
    let proof = if campaign["hasProof"].as_bool().unwrap_or(false) {
        "yes".green()
    } else {
        "no".dimmed()
    };
    println!("  Proof:    {}", proof);
    if let Some(reviewer) = campaign["reviewedBy"].as_str() {
        println!("  Reviewer: {} at {}", reviewer, text(campaign, "reviewedAt"));
    }
    if let Some(reason) = campaign["rejectionReason"].as_str() {
        println!("  Reason:   {}", reason.red());
    }

    if let Some(assets) = campaign["assets"].as_array() {
        println!();
        println!("  Assets ({}):", assets.len());
        for asset in assets {
            let order = asset["displayOrder"]
                .as_i64()
                .map(|o| o.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "    {:>3}. {}  {:<8} {}",
                order,
                short_id(text(asset, "id")),
                text(asset, "category"),
                text(asset, "filename")
            );
        }
    }
}

pub fn print_metrics(metrics: &Value) {
    let rate = &metrics["approvalRate"];
    let proofs = &metrics["proofGeneration"];
    println!("  Queue depth:     {}", metrics["queueDepth"]);
    println!(
        "  Approval rate:   {}% over {} days ({} approved, {} rejected)",
        rate["approvalRate"], rate["days"], rate["approved"], rate["rejected"]
    );
    match proofs["averageSeconds"].as_f64() {
        Some(avg) => println!(
            "  Proof time:      {:.2}s average over {} runs",
            avg, proofs["count"]
        ),
        None => println!("  Proof time:      {}", "no samples".dimmed()),
    }

    let uptime = metrics["uptime"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    if uptime.is_empty() {
        println!("  Uptime (24h):    {}", "no health checks".dimmed());
    }
    for component in uptime {
        println!(
            "  Uptime (24h):    {:<20} {}% of {} checks, now {}",
            component["component"].as_str().unwrap_or("?"),
            component["uptimePercentage"],
            component["totalChecks"],
            health_label(component["latestStatus"].as_str().unwrap_or("unknown"))
        );
    }
}

/// Colors a health status.
pub fn health_label(status: &str) -> String {
    match status {
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "down" => status.red().bold().to_string(),
        other => other.to_string(),
    }
}
